//! Surface CSV output
use super::tecplot::COORDINATE_NAMES;
use crate::{
    error::WriterError,
    output::{OutputRequest, ZoneView},
    traits::Writer,
    types::{OutputFormat, RealScalar},
};
use itertools::Itertools;
use std::io::Write;

/// Writer for comma-separated values at the nodes of a view
///
/// One row per node: the global identifier, the coordinates and the field values.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceCsvWriter;

impl<T: RealScalar> Writer<T> for SurfaceCsvWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::SurfaceCsv
    }

    fn write(
        &self,
        zone: &ZoneView<'_, T>,
        _request: &OutputRequest,
        out: &mut dyn Write,
    ) -> Result<(), WriterError> {
        let mesh = zone.mesh();
        let solution = zone.solution();
        let gdim = mesh.gdim();
        if gdim > COORDINATE_NAMES.len() {
            return Err(WriterError::Encoding(format!(
                "cannot write coordinates of dimension {gdim}"
            )));
        }

        writeln!(
            out,
            "{}",
            std::iter::once("Global_Id")
                .chain(COORDINATE_NAMES[..gdim].iter().copied())
                .chain(solution.names().iter().map(|n| n.as_str()))
                .map(|n| format!("\"{n}\""))
                .join(",")
        )?;
        for (i, node) in mesh.nodes().iter().enumerate() {
            write!(out, "{}", node.global_id)?;
            for v in mesh.position(i).iter().chain(solution.values(i)) {
                write!(out, ",{v}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        merge::ZoneAggregator,
        output::{FileNaming, SurfaceZone},
        shapes::unit_square_partitions,
    };

    #[test]
    fn test_surface_csv() {
        let zones = ZoneAggregator::default()
            .aggregate(&[unit_square_partitions::<f64>(2, 2)], &[])
            .unwrap()
            .zones;
        let surface = SurfaceZone::extract(&zones[0]);
        let request = OutputRequest::new(0, 0.0, ".", FileNaming::default());
        let mut out = Vec::<u8>::new();
        SurfaceCsvWriter
            .write(&ZoneView::surface(&surface), &request, &mut out)
            .unwrap();
        let s = String::from_utf8(out).unwrap();
        let lines = s.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "\"Global_Id\",\"x\",\"y\",\"Density\",\"Energy\"");
        // Every node except the centre of the square
        assert_eq!(lines.len(), 1 + 8);
        assert!(!lines.iter().any(|l| l.starts_with("4,")));
        assert!(lines.contains(&"8,1,1,2,2"));
    }
}
