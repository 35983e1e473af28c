//! Output requests and file naming
use crate::types::OutputFormat;
use std::path::{Path, PathBuf};

/// File stems and naming rules
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FileNaming {
    /// Stem of native restart files
    pub restart: String,
    /// Stem of volume files
    pub volume: String,
    /// Stem of surface files
    pub surface: String,
    /// Append the iteration to every file name
    pub unsteady: bool,
}

impl Default for FileNaming {
    fn default() -> Self {
        Self {
            restart: "restart".to_string(),
            volume: "flow".to_string(),
            surface: "surface_flow".to_string(),
            unsteady: false,
        }
    }
}

impl FileNaming {
    /// Stem used for a format
    pub fn stem(&self, format: OutputFormat) -> &str {
        match format {
            OutputFormat::NativeRestart => &self.restart,
            OutputFormat::Tecplot | OutputFormat::Gmsh => &self.volume,
            OutputFormat::SurfaceTecplot | OutputFormat::SurfaceCsv => &self.surface,
        }
    }
}

/// One output request, as seen by the writers
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRequest {
    iteration: usize,
    time: f64,
    directory: PathBuf,
    naming: FileNaming,
}

impl OutputRequest {
    /// Create new
    pub fn new(
        iteration: usize,
        time: f64,
        directory: impl Into<PathBuf>,
        naming: FileNaming,
    ) -> Self {
        Self {
            iteration,
            time,
            directory: directory.into(),
            naming,
        }
    }
    /// Solver iteration
    pub fn iteration(&self) -> usize {
        self.iteration
    }
    /// Physical time
    pub fn time(&self) -> f64 {
        self.time
    }
    /// Output directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }
    /// Naming rules
    pub fn naming(&self) -> &FileNaming {
        &self.naming
    }

    /// Path of the file that a format writes for a zone
    ///
    /// `<directory>/<stem>[_<zone>][_<iteration>].<extension>`. The zone suffix is only used
    /// when there is more than one zone, and the iteration suffix only for unsteady runs.
    pub fn file_path(&self, format: OutputFormat, zone: usize, zone_count: usize) -> PathBuf {
        let mut name = self.naming.stem(format).to_string();
        if zone_count > 1 {
            name.push_str(&format!("_{zone}"));
        }
        if self.naming.unsteady {
            name.push_str(&format!("_{:05}", self.iteration));
        }
        name.push('.');
        name.push_str(format.extension());
        self.directory.join(name)
    }
}
