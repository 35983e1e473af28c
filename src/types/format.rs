//! Output formats

/// Which merged view a format is written from
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ViewKind {
    /// All nodes and elements of each zone
    Full,
    /// Boundary nodes and elements only
    Surface,
}

/// An output format that can be requested from the dispatcher
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputFormat {
    /// Native restart file that can be read back
    NativeRestart,
    /// Tecplot ASCII volume file
    Tecplot,
    /// Gmsh 4.1 volume file with node data
    Gmsh,
    /// Tecplot ASCII file of the boundary surface
    SurfaceTecplot,
    /// Comma-separated values at boundary nodes
    SurfaceCsv,
}

impl OutputFormat {
    /// All formats
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::NativeRestart,
        OutputFormat::Tecplot,
        OutputFormat::Gmsh,
        OutputFormat::SurfaceTecplot,
        OutputFormat::SurfaceCsv,
    ];

    /// The view this format consumes
    pub fn view_kind(&self) -> ViewKind {
        match self {
            OutputFormat::NativeRestart | OutputFormat::Tecplot | OutputFormat::Gmsh => {
                ViewKind::Full
            }
            OutputFormat::SurfaceTecplot | OutputFormat::SurfaceCsv => ViewKind::Surface,
        }
    }

    /// File extension
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::NativeRestart => "ron",
            OutputFormat::Tecplot | OutputFormat::SurfaceTecplot => "plt",
            OutputFormat::Gmsh => "msh",
            OutputFormat::SurfaceCsv => "csv",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::NativeRestart => "native-restart",
            OutputFormat::Tecplot => "tecplot",
            OutputFormat::Gmsh => "gmsh",
            OutputFormat::SurfaceTecplot => "surface-tecplot",
            OutputFormat::SurfaceCsv => "surface-csv",
        };
        write!(f, "{name}")
    }
}
