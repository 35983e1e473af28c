//! Tecplot ASCII output
use crate::{
    error::WriterError,
    merge::GlobalElement,
    output::{OutputRequest, ZoneView},
    traits::Writer,
    types::{ElementType, OutputFormat, RealScalar, ViewKind},
};
use itertools::Itertools;
use std::io::Write;

pub(crate) const COORDINATE_NAMES: [&str; 3] = ["x", "y", "z"];

/// Tecplot finite element zone type for elements of a topological dimension
fn zone_type(tdim: usize) -> &'static str {
    match tdim {
        1 => "FELINESEG",
        2 => "FEQUADRILATERAL",
        _ => "FEBRICK",
    }
}

/// Node indices of an element as a (possibly degenerate) zone-type element
fn tecplot_nodes(element: &GlobalElement<'_>) -> [usize; 8] {
    let n = element.nodes;
    match element.element_type {
        ElementType::Line => [n[0], n[1], 0, 0, 0, 0, 0, 0],
        ElementType::Triangle => [n[0], n[1], n[2], n[2], 0, 0, 0, 0],
        ElementType::Quadrilateral => [n[0], n[1], n[2], n[3], 0, 0, 0, 0],
        ElementType::Tetrahedron => [n[0], n[1], n[2], n[2], n[3], n[3], n[3], n[3]],
        ElementType::Hexahedron => [n[0], n[1], n[2], n[3], n[4], n[5], n[6], n[7]],
        ElementType::Wedge => [n[0], n[1], n[1], n[2], n[3], n[4], n[4], n[5]],
        ElementType::Pyramid => [n[0], n[1], n[2], n[3], n[4], n[4], n[4], n[4]],
    }
}

/// Number of nodes of each element of a zone type
fn zone_arity(tdim: usize) -> usize {
    match tdim {
        1 => 2,
        2 => 4,
        _ => 8,
    }
}

/// Writer for Tecplot ASCII files
///
/// Only the elements of the highest topological dimension in the view are written, as
/// degenerate line, quadrilateral or brick elements.
#[derive(Debug, Clone, Copy)]
pub struct TecplotWriter {
    format: OutputFormat,
}

impl TecplotWriter {
    /// Writer for volume files
    pub fn volume() -> Self {
        Self {
            format: OutputFormat::Tecplot,
        }
    }
    /// Writer for surface files
    pub fn surface() -> Self {
        Self {
            format: OutputFormat::SurfaceTecplot,
        }
    }
}

impl<T: RealScalar> Writer<T> for TecplotWriter {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn write(
        &self,
        zone: &ZoneView<'_, T>,
        request: &OutputRequest,
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

        let title = match zone.kind() {
            ViewKind::Full => "Visualization of the volumetric grid",
            ViewKind::Surface => "Visualization of the surface grid",
        };
        writeln!(out, "TITLE = \"{title}\"")?;
        writeln!(
            out,
            "VARIABLES = {}",
            COORDINATE_NAMES[..gdim]
                .iter()
                .map(|n| n.to_string())
                .chain(solution.names().iter().cloned())
                .map(|n| format!("\"{n}\""))
                .join(",")
        )?;

        let tdim = mesh.topology_dim();
        let elements = mesh
            .blocks()
            .iter()
            .filter(|b| b.element_type().topology_dim() == tdim)
            .flat_map(|b| b.iter())
            .collect_vec();

        write!(out, "ZONE T= \"Zone {}\"", zone.id())?;
        if elements.is_empty() {
            write!(out, ", I= {}, DATAPACKING= POINT", mesh.node_count())?;
        } else {
            write!(
                out,
                ", NODES= {}, ELEMENTS= {}, DATAPACKING= POINT, ZONETYPE= {}",
                mesh.node_count(),
                elements.len(),
                zone_type(tdim)
            )?;
        }
        if request.naming().unsteady {
            write!(
                out,
                ", STRANDID= {}, SOLUTIONTIME= {}",
                zone.id() + 1,
                request.time()
            )?;
        }
        writeln!(out)?;

        for i in 0..mesh.node_count() {
            let row = mesh
                .position(i)
                .iter()
                .chain(solution.values(i))
                .map(|v| v.to_string())
                .join("\t");
            writeln!(out, "{row}")?;
        }

        let arity = zone_arity(tdim);
        for e in &elements {
            let row = tecplot_nodes(e)[..arity]
                .iter()
                .map(|n| (n + 1).to_string())
                .join("\t");
            writeln!(out, "{row}")?;
        }
        Ok(())
    }
}
