//! Output configuration
//!
//! With the `serde` feature, configurations are read from RON. Missing fields take their
//! default values.
#[cfg(feature = "serde")]
use crate::error::ConfigError;
use crate::{
    history::HistoryFormat,
    merge::{SolutionMerger, ZoneAggregator, ZonePolicy},
    output::{FileNaming, OutputRequest},
    types::OutputFormat,
};
use std::path::PathBuf;

/// Comparison of halo copies with the owner's values
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct HaloCheck {
    /// Compare halo copies at all
    pub enabled: bool,
    /// Relative tolerance
    pub tolerance: f64,
}

impl Default for HaloCheck {
    fn default() -> Self {
        Self {
            enabled: false,
            tolerance: 1e-10,
        }
    }
}

/// Configuration of the output subsystem
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct OutputConfig {
    /// Directory that every file is written to
    pub directory: PathBuf,
    /// File stems and naming rules of solution files
    pub naming: FileNaming,
    /// Stem of the history file
    pub history: String,
    /// Formats written when a request does not name any
    pub formats: Vec<OutputFormat>,
    /// Format of the history file
    pub history_format: HistoryFormat,
    /// Key the history by time step and inner iteration
    pub dual_time: bool,
    /// What to do when a zone fails to merge
    pub zone_policy: ZonePolicy,
    /// Halo diagnostic
    pub halo_check: HaloCheck,
    /// Write solution files every this many iterations. 0 disables them.
    pub solution_frequency: usize,
    /// Record history every this many iterations. 0 disables it.
    pub history_frequency: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            naming: FileNaming::default(),
            history: "history".to_string(),
            formats: vec![OutputFormat::NativeRestart, OutputFormat::Tecplot],
            history_format: HistoryFormat::default(),
            dual_time: false,
            zone_policy: ZonePolicy::default(),
            halo_check: HaloCheck::default(),
            solution_frequency: 250,
            history_frequency: 1,
        }
    }
}

fn is_due(iteration: usize, frequency: usize) -> bool {
    frequency != 0 && iteration % frequency == 0
}

impl OutputConfig {
    /// Parse a configuration from a RON string
    #[cfg(feature = "serde")]
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    /// Read a configuration from a RON file
    #[cfg(feature = "serde")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        Self::from_ron_str(&std::fs::read_to_string(path)?)
    }

    /// Should solution files be written at an iteration?
    pub fn solution_due(&self, iteration: usize) -> bool {
        is_due(iteration, self.solution_frequency)
    }

    /// Should history be recorded at an iteration?
    pub fn history_due(&self, iteration: usize) -> bool {
        is_due(iteration, self.history_frequency)
    }

    /// Path of the history file
    pub fn history_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.history, self.history_format.extension()))
    }

    /// Output request for an iteration
    pub fn request(&self, iteration: usize, time: f64) -> OutputRequest {
        OutputRequest::new(iteration, time, &self.directory, self.naming.clone())
    }

    /// Solution merger configured with the halo diagnostic
    pub fn solution_merger(&self) -> SolutionMerger {
        if self.halo_check.enabled {
            SolutionMerger::with_halo_check(self.halo_check.tolerance)
        } else {
            SolutionMerger::new()
        }
    }

    /// Zone aggregator configured with the zone policy and halo diagnostic
    pub fn aggregator(&self) -> ZoneAggregator {
        ZoneAggregator::new(self.zone_policy, self.solution_merger())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_frequencies() {
        let config = OutputConfig {
            solution_frequency: 10,
            history_frequency: 0,
            ..Default::default()
        };
        assert!(config.solution_due(0));
        assert!(!config.solution_due(5));
        assert!(config.solution_due(20));
        assert!(!config.history_due(0));
        assert!(!config.history_due(1));
    }

    #[test]
    fn test_history_path() {
        let config = OutputConfig {
            directory: PathBuf::from("out"),
            history_format: HistoryFormat::Tecplot,
            ..Default::default()
        };
        assert_eq!(config.history_path(), PathBuf::from("out").join("history.dat"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_ron() {
        let config = OutputConfig::from_ron_str(
            r#"(
                directory: "results",
                naming: (unsteady: true, volume: "volume"),
                formats: [Gmsh, SurfaceCsv],
                zone_policy: SkipFailed,
                halo_check: (enabled: true),
                solution_frequency: 5,
            )"#,
        )
        .unwrap();
        assert_eq!(config.directory, PathBuf::from("results"));
        assert!(config.naming.unsteady);
        assert_eq!(config.naming.volume, "volume");
        assert_eq!(config.naming.surface, "surface_flow");
        assert_eq!(config.formats, [OutputFormat::Gmsh, OutputFormat::SurfaceCsv]);
        assert_eq!(config.zone_policy, ZonePolicy::SkipFailed);
        assert_eq!(config.halo_check.tolerance, 1e-10);
        assert_eq!(config.history_frequency, 1);
        assert_eq!(config.aggregator().policy(), ZonePolicy::SkipFailed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_unknown_field() {
        assert!(matches!(
            OutputConfig::from_ron_str("(directroy: \"x\")"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.ron");
        std::fs::write(&path, "(history_format: Screen)").unwrap();
        let config = OutputConfig::from_file(&path).unwrap();
        assert_eq!(config.history_format, HistoryFormat::Screen);
        assert!(matches!(
            OutputConfig::from_file(dir.path().join("missing.ron")),
            Err(ConfigError::Io(_))
        ));
    }
}
