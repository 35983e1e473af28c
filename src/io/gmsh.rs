//! Gmsh output
use crate::{
    error::WriterError,
    output::{OutputRequest, ZoneView},
    traits::Writer,
    types::{OutputFormat, RealScalar},
};
use itertools::Itertools;
use std::io::Write;

/// Writer for Gmsh 4.1 ASCII files with one `$NodeData` section per field
///
/// Only the elements of the highest topological dimension are written.
#[derive(Debug, Clone, Copy)]
pub struct GmshWriter;

impl GmshWriter {
    /// Generate the Gmsh string for a zone
    pub fn to_gmsh_string<T: RealScalar>(
        zone: &ZoneView<'_, T>,
        request: &OutputRequest,
    ) -> Result<String, WriterError> {
        let mesh = zone.mesh();
        let solution = zone.solution();
        let gdim = mesh.gdim();
        if gdim > 3 {
            return Err(WriterError::Encoding(format!(
                "cannot write coordinates of dimension {gdim}"
            )));
        }
        let tdim = mesh.topology_dim();
        let node_count = mesh.node_count();

        let mut gmsh_s = String::from("");
        gmsh_s.push_str("$MeshFormat\n");
        gmsh_s.push_str("4.1 0 8\n");
        gmsh_s.push_str("$EndMeshFormat\n");

        gmsh_s.push_str("$Nodes\n");
        if node_count == 0 {
            gmsh_s.push_str("0 0 0 0\n");
        } else {
            gmsh_s.push_str(&format!("1 {node_count} 1 {node_count}\n"));
            gmsh_s.push_str(&format!("{tdim} 1 0 {node_count}\n"));
            for i in 0..node_count {
                gmsh_s.push_str(&format!("{}\n", i + 1));
            }
            for i in 0..node_count {
                let p = mesh.position(i);
                // Gmsh always expects three coordinates
                let coords = (0..3)
                    .map(|d| p.get(d).map_or("0".to_string(), |c| c.to_string()))
                    .join(" ");
                gmsh_s.push_str(&coords);
                gmsh_s.push('\n');
            }
        }
        gmsh_s.push_str("$EndNodes\n");

        let blocks = mesh
            .blocks()
            .iter()
            .filter(|b| b.element_type().topology_dim() == tdim)
            .collect_vec();
        let element_count = blocks.iter().map(|b| b.len()).sum::<usize>();

        gmsh_s.push_str("$Elements\n");
        if element_count == 0 {
            gmsh_s.push_str("0 0 0 0\n");
        } else {
            gmsh_s.push_str(&format!(
                "{} {element_count} 1 {element_count}\n",
                blocks.len()
            ));
            let mut tag = 1;
            for block in blocks {
                gmsh_s.push_str(&format!(
                    "{tdim} 1 {} {}\n",
                    block.element_type().gmsh_id(),
                    block.len()
                ));
                for element in block.iter() {
                    gmsh_s.push_str(&format!("{tag}"));
                    for n in element.nodes {
                        gmsh_s.push_str(&format!(" {}", n + 1));
                    }
                    gmsh_s.push('\n');
                    tag += 1;
                }
            }
        }
        gmsh_s.push_str("$EndElements\n");

        for (f, name) in solution.names().iter().enumerate() {
            gmsh_s.push_str("$NodeData\n");
            gmsh_s.push_str(&format!("1\n\"{name}\"\n"));
            gmsh_s.push_str(&format!("1\n{}\n", request.time()));
            gmsh_s.push_str(&format!("3\n{}\n1\n{node_count}\n", request.iteration()));
            for i in 0..node_count {
                gmsh_s.push_str(&format!("{} {}\n", i + 1, solution.values(i)[f]));
            }
            gmsh_s.push_str("$EndNodeData\n");
        }

        Ok(gmsh_s)
    }
}

impl<T: RealScalar> Writer<T> for GmshWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Gmsh
    }

    fn write(
        &self,
        zone: &ZoneView<'_, T>,
        request: &OutputRequest,
        out: &mut dyn Write,
    ) -> Result<(), WriterError> {
        out.write_all(Self::to_gmsh_string(zone, request)?.as_bytes())?;
        Ok(())
    }
}

/// Get a section from a gmsh string
#[cfg(test)]
fn gmsh_section<'a>(s: &'a str, section: &str) -> Option<&'a str> {
    let start = s.find(&format!("${section}\n"))? + section.len() + 2;
    let end = s[start..].find(&format!("$End{section}"))?;
    Some(&s[start..start + end])
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        merge::ZoneAggregator,
        output::FileNaming,
        shapes::{unit_cube_partitions, unit_square_partitions},
    };

    #[test]
    fn test_gmsh_square() {
        let zones = ZoneAggregator::default()
            .aggregate(&[unit_square_partitions::<f64>(1, 1)], &[])
            .unwrap()
            .zones;
        let request = OutputRequest::new(12, 0.5, ".", FileNaming::default());
        let s = GmshWriter::to_gmsh_string(&ZoneView::full(&zones[0]), &request).unwrap();

        assert!(s.starts_with("$MeshFormat\n4.1 0 8\n$EndMeshFormat\n"));
        let nodes = gmsh_section(&s, "Nodes").unwrap().lines().collect::<Vec<_>>();
        assert_eq!(nodes[0], "1 4 1 4");
        assert_eq!(nodes[1], "2 1 0 4");
        assert_eq!(nodes[6], "0 0 0");
        assert_eq!(nodes[9], "1 1 0");

        let elements = gmsh_section(&s, "Elements").unwrap().lines().collect::<Vec<_>>();
        assert_eq!(elements, vec!["1 2 1 2", "2 1 2 2", "1 1 2 4", "2 1 4 3"]);

        assert_eq!(s.matches("$NodeData").count(), 2);
        let data = gmsh_section(&s, "NodeData").unwrap().lines().collect::<Vec<_>>();
        assert_eq!(&data[..8], &["1", "\"Density\"", "1", "0.5", "3", "12", "1", "4"]);
        assert_eq!(data[9], "2 2");
    }

    #[test]
    fn test_gmsh_cube() {
        let zones = ZoneAggregator::default()
            .aggregate(&[unit_cube_partitions::<f64>(1, 1)], &[])
            .unwrap()
            .zones;
        let request = OutputRequest::new(0, 0.0, ".", FileNaming::default());
        let s = GmshWriter::to_gmsh_string(&ZoneView::full(&zones[0]), &request).unwrap();
        let elements = gmsh_section(&s, "Elements").unwrap().lines().collect::<Vec<_>>();
        // Boundary triangles are not written
        assert_eq!(elements[0], "1 6 1 6");
        assert_eq!(elements[1], "3 1 4 6");
        assert_eq!(elements.len(), 8);
    }
}
