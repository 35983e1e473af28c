//! Output dispatcher
use super::{OutputRequest, SurfaceZone, ZoneView};
use crate::{
    error::WriterError,
    io::{commit_all, stage},
    merge::{Aggregation, ZoneFailure},
    traits::Writer,
    types::{OutputFormat, RealScalar, ViewKind},
};
use itertools::Itertools;
use std::path::PathBuf;
use tracing::{debug, warn};

/// State of the dispatcher
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DispatcherState {
    /// Waiting for a request
    Idle,
    /// A writer is running
    Dispatching(OutputFormat),
    /// All writers returned and the merged buffers were dropped
    Released,
}

/// Files produced by a writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenOutput {
    /// One file per zone, in zone order
    pub paths: Vec<PathBuf>,
    /// Total size of the files
    pub bytes: u64,
}

/// Outcome of one format
#[derive(Debug)]
pub enum FormatStatus {
    /// Every file of the format was written
    Written(WrittenOutput),
    /// The format failed. Files of other formats are not affected.
    Failed(WriterError),
}

impl FormatStatus {
    /// Did the format succeed?
    pub fn is_written(&self) -> bool {
        matches!(self, FormatStatus::Written(_))
    }
}

/// Outcome of a request, one status per requested format
#[derive(Debug)]
pub struct DispatchReport {
    iteration: usize,
    statuses: Vec<(OutputFormat, FormatStatus)>,
    skipped_zones: Vec<ZoneFailure>,
}

impl DispatchReport {
    /// Create a report without any formats
    pub fn empty(iteration: usize) -> Self {
        Self {
            iteration,
            statuses: vec![],
            skipped_zones: vec![],
        }
    }
    /// Iteration of the request
    pub fn iteration(&self) -> usize {
        self.iteration
    }
    /// Status of every format, in dispatch order
    pub fn statuses(&self) -> &[(OutputFormat, FormatStatus)] {
        &self.statuses
    }
    /// Status of one format
    pub fn status(&self, format: OutputFormat) -> Option<&FormatStatus> {
        self.statuses
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, s)| s)
    }
    /// Formats that were written
    pub fn succeeded(&self) -> impl Iterator<Item = OutputFormat> + '_ {
        self.statuses
            .iter()
            .filter(|(_, s)| s.is_written())
            .map(|(f, _)| *f)
    }
    /// Formats that failed, with the reason
    pub fn failed(&self) -> impl Iterator<Item = (OutputFormat, &WriterError)> + '_ {
        self.statuses.iter().filter_map(|(f, s)| match s {
            FormatStatus::Failed(e) => Some((*f, e)),
            FormatStatus::Written(_) => None,
        })
    }
    /// Zones that were not merged and so not written
    pub fn skipped_zones(&self) -> &[ZoneFailure] {
        &self.skipped_zones
    }
    /// Did every format succeed for every zone?
    pub fn is_complete(&self) -> bool {
        self.skipped_zones.is_empty() && self.statuses.iter().all(|(_, s)| s.is_written())
    }
}

/// Selects and runs the writers of an output request
pub struct OutputDispatcher<T: RealScalar> {
    writers: Vec<Box<dyn Writer<T>>>,
    state: DispatcherState,
}

impl<T: RealScalar> Default for OutputDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealScalar> OutputDispatcher<T> {
    /// Create a dispatcher without writers
    pub fn new() -> Self {
        Self {
            writers: vec![],
            state: DispatcherState::Idle,
        }
    }

    /// Create a dispatcher with a writer for every format that this build supports
    pub fn with_default_writers() -> Self {
        let mut d = Self::new();
        #[cfg(feature = "serde")]
        d.register(Box::new(crate::io::RestartWriter));
        d.register(Box::new(crate::io::TecplotWriter::volume()));
        d.register(Box::new(crate::io::GmshWriter));
        d.register(Box::new(crate::io::TecplotWriter::surface()));
        d.register(Box::new(crate::io::SurfaceCsvWriter));
        d
    }

    /// Register a writer, replacing any writer of the same format
    pub fn register(&mut self, writer: Box<dyn Writer<T>>) {
        let format = writer.format();
        self.writers.retain(|w| w.format() != format);
        self.writers.push(writer);
    }

    /// Is a writer registered for a format?
    pub fn has_writer(&self, format: OutputFormat) -> bool {
        self.writers.iter().any(|w| w.format() == format)
    }

    /// Current state
    pub fn state(&self) -> DispatcherState {
        self.state
    }

    fn transition(&mut self, state: DispatcherState) {
        debug!(from = ?self.state, to = ?state, "dispatcher transition");
        self.state = state;
    }

    /// Run the writer of every requested format
    ///
    /// Formats are deduplicated, keeping the first occurrence. A failing writer only fails its
    /// own format. The aggregation is dropped before this returns.
    pub fn dispatch(
        &mut self,
        aggregation: Aggregation<T>,
        formats: &[OutputFormat],
        request: &OutputRequest,
    ) -> DispatchReport {
        let Aggregation { zones, failed } = aggregation;
        let formats = formats.iter().copied().unique().collect_vec();
        let surfaces = if formats.iter().any(|f| f.view_kind() == ViewKind::Surface) {
            zones.iter().map(SurfaceZone::extract).collect_vec()
        } else {
            vec![]
        };
        let zone_count = zones.len() + failed.len();

        let mut statuses = Vec::with_capacity(formats.len());
        for format in formats {
            self.transition(DispatcherState::Dispatching(format));
            let views = match format.view_kind() {
                ViewKind::Full => zones.iter().map(ZoneView::full).collect_vec(),
                ViewKind::Surface => surfaces.iter().map(ZoneView::surface).collect_vec(),
            };
            let status = match self.writers.iter().find(|w| w.format() == format) {
                Some(writer) => {
                    match Self::run_writer(writer.as_ref(), &views, request, zone_count) {
                        Ok(written) => FormatStatus::Written(written),
                        Err(e) => FormatStatus::Failed(e),
                    }
                }
                None => FormatStatus::Failed(WriterError::Unavailable {
                    format,
                    reason: "no writer registered".to_string(),
                }),
            };
            match &status {
                FormatStatus::Written(w) => {
                    debug!(%format, files = w.paths.len(), bytes = w.bytes, "format written")
                }
                FormatStatus::Failed(e) => warn!(%format, "format failed: {e}"),
            }
            statuses.push((format, status));
        }

        drop(surfaces);
        drop(zones);
        self.transition(DispatcherState::Released);
        self.transition(DispatcherState::Idle);

        DispatchReport {
            iteration: request.iteration(),
            statuses,
            skipped_zones: failed,
        }
    }

    /// Write one file per view
    ///
    /// Every file is staged before any of them is renamed into place, so a failure in one zone
    /// leaves none of the files of this format behind.
    fn run_writer(
        writer: &dyn Writer<T>,
        views: &[ZoneView<'_, T>],
        request: &OutputRequest,
        zone_count: usize,
    ) -> Result<WrittenOutput, WriterError> {
        let staged = views
            .iter()
            .map(|view| {
                let path = request.file_path(writer.format(), view.id(), zone_count);
                stage(&path, |out| writer.write(view, request, out))
            })
            .collect::<Result<Vec<_>, WriterError>>()?;
        let (paths, sizes): (Vec<_>, Vec<_>) = commit_all(staged)?.into_iter().unzip();
        Ok(WrittenOutput {
            paths,
            bytes: sizes.into_iter().sum(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        merge::{ZoneAggregator, ZonePolicy},
        output::FileNaming,
        shapes::unit_square_partitions,
    };
    use std::io::Write;

    struct Failing;

    impl Writer<f64> for Failing {
        fn format(&self) -> OutputFormat {
            OutputFormat::Gmsh
        }
        fn write(
            &self,
            _zone: &ZoneView<'_, f64>,
            _request: &OutputRequest,
            out: &mut dyn Write,
        ) -> Result<(), WriterError> {
            out.write_all(b"$MeshFormat\n")?;
            Err(WriterError::Encoding("writer failed".to_string()))
        }
    }

    fn aggregation(zones: usize) -> Aggregation<f64> {
        let per_zone = (0..zones)
            .map(|_| unit_square_partitions(3, 2))
            .collect::<Vec<_>>();
        ZoneAggregator::default().aggregate(&per_zone, &[]).unwrap()
    }

    #[test]
    fn test_failing_writer_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let request = OutputRequest::new(7, 0.0, dir.path(), FileNaming::default());
        let mut dispatcher = OutputDispatcher::with_default_writers();
        dispatcher.register(Box::new(Failing));

        let report = dispatcher.dispatch(
            aggregation(1),
            &[OutputFormat::Gmsh, OutputFormat::Tecplot, OutputFormat::Gmsh],
            &request,
        );
        assert_eq!(dispatcher.state(), DispatcherState::Idle);
        assert_eq!(report.statuses().len(), 2);
        assert!(!report.is_complete());
        assert_eq!(
            report.failed().map(|(f, _)| f).collect::<Vec<_>>(),
            vec![OutputFormat::Gmsh]
        );
        assert_eq!(
            report.succeeded().collect::<Vec<_>>(),
            vec![OutputFormat::Tecplot]
        );
        assert!(!dir.path().join("flow.msh").exists());
        assert!(!dir.path().join(".flow.msh.tmp").exists());

        let Some(FormatStatus::Written(w)) = report.status(OutputFormat::Tecplot) else {
            panic!("tecplot output not written");
        };
        assert_eq!(w.paths, vec![dir.path().join("flow.plt")]);
        let contents = std::fs::read_to_string(&w.paths[0]).unwrap();
        assert_eq!(contents.len() as u64, w.bytes);
        assert!(contents.ends_with('\n'));
    }

    #[test]
    fn test_unregistered_format() {
        let dir = tempfile::tempdir().unwrap();
        let request = OutputRequest::new(0, 0.0, dir.path(), FileNaming::default());
        let mut dispatcher = OutputDispatcher::<f64>::new();
        assert!(!dispatcher.has_writer(OutputFormat::SurfaceCsv));
        let report = dispatcher.dispatch(aggregation(1), &[OutputFormat::SurfaceCsv], &request);
        assert!(matches!(
            report.status(OutputFormat::SurfaceCsv),
            Some(FormatStatus::Failed(WriterError::Unavailable { .. }))
        ));
    }

    #[test]
    fn test_one_file_per_zone() {
        let dir = tempfile::tempdir().unwrap();
        let request = OutputRequest::new(0, 0.0, dir.path(), FileNaming::default());
        let mut dispatcher = OutputDispatcher::with_default_writers();
        let report = dispatcher.dispatch(
            aggregation(2),
            &[OutputFormat::SurfaceCsv, OutputFormat::Tecplot],
            &request,
        );
        assert!(report.is_complete());
        for name in [
            "surface_flow_0.csv",
            "surface_flow_1.csv",
            "flow_0.plt",
            "flow_1.plt",
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn test_skipped_zones_reported() {
        let mut per_zone = vec![
            unit_square_partitions::<f64>(2, 2),
            unit_square_partitions(2, 2),
        ];
        per_zone[1].pop();
        let aggregation = ZoneAggregator::new(ZonePolicy::SkipFailed, Default::default())
            .aggregate(&per_zone, &[])
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let request = OutputRequest::new(0, 0.0, dir.path(), FileNaming::default());
        let report = OutputDispatcher::with_default_writers().dispatch(
            aggregation,
            &[OutputFormat::SurfaceCsv],
            &request,
        );
        assert!(report.succeeded().eq([OutputFormat::SurfaceCsv]));
        assert!(!report.is_complete());
        assert_eq!(report.skipped_zones()[0].zone, 1);
        assert!(dir.path().join("surface_flow_0.csv").exists());
    }

    /// Fails for the second zone only
    struct FailingSecondZone;

    impl Writer<f64> for FailingSecondZone {
        fn format(&self) -> OutputFormat {
            OutputFormat::Gmsh
        }
        fn write(
            &self,
            zone: &ZoneView<'_, f64>,
            request: &OutputRequest,
            out: &mut dyn Write,
        ) -> Result<(), WriterError> {
            if zone.id() == 1 {
                return Err(WriterError::Encoding("zone 1 failed".to_string()));
            }
            crate::io::GmshWriter.write(zone, request, out)
        }
    }

    #[test]
    fn test_failing_zone_leaves_no_files_of_format() {
        let dir = tempfile::tempdir().unwrap();
        let request = OutputRequest::new(0, 0.0, dir.path(), FileNaming::default());
        let mut dispatcher = OutputDispatcher::with_default_writers();
        let report = dispatcher.dispatch(aggregation(2), &[OutputFormat::Gmsh], &request);
        assert!(report.is_complete());
        let previous = std::fs::read_to_string(dir.path().join("flow_0.msh")).unwrap();

        dispatcher.register(Box::new(FailingSecondZone));
        let report = dispatcher.dispatch(
            aggregation(2),
            &[OutputFormat::Gmsh, OutputFormat::SurfaceCsv],
            &request,
        );
        assert!(matches!(
            report.status(OutputFormat::Gmsh),
            Some(FormatStatus::Failed(WriterError::Encoding(_)))
        ));
        assert!(report.status(OutputFormat::SurfaceCsv).unwrap().is_written());
        // The files of the previous request are untouched and no temporary file is left
        assert_eq!(
            std::fs::read_to_string(dir.path().join("flow_0.msh")).unwrap(),
            previous
        );
        assert!(!dir.path().join(".flow_0.msh.tmp").exists());
        assert!(!dir.path().join(".flow_1.msh.tmp").exists());

        let fresh = tempfile::tempdir().unwrap();
        let request = OutputRequest::new(0, 0.0, fresh.path(), FileNaming::default());
        let report = dispatcher.dispatch(aggregation(2), &[OutputFormat::Gmsh], &request);
        assert!(!report.is_complete());
        assert_eq!(std::fs::read_dir(fresh.path()).unwrap().count(), 0);
    }
}
