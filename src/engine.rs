//! Entry points used by the solver's orchestration layer
use crate::{
    config::OutputConfig,
    error::{HistoryError, OutputError},
    history::{AppendOutcome, HistoryRecorder, HistoryState},
    merge::ZoneAggregator,
    output::{DispatchReport, OutputDispatcher},
    traits::{DerivedQuantity, Gather},
    types::{OutputFormat, RealScalar},
};
use tracing::{debug, info, info_span, warn};

/// Gathers, merges and writes the solution of a run, and records its history
pub struct OutputEngine<T: RealScalar, G: Gather<T>> {
    config: OutputConfig,
    gather: G,
    aggregator: ZoneAggregator,
    dispatcher: OutputDispatcher<T>,
    derived: Vec<Box<dyn DerivedQuantity<T>>>,
    history: HistoryRecorder,
}

impl<T: RealScalar, G: Gather<T>> OutputEngine<T, G> {
    /// Create an engine with a writer for every format that this build supports
    pub fn new(config: OutputConfig, gather: G) -> Self {
        Self {
            aggregator: config.aggregator(),
            history: if config.dual_time {
                HistoryRecorder::dual_time(config.history_format)
            } else {
                HistoryRecorder::new(config.history_format)
            },
            config,
            gather,
            dispatcher: OutputDispatcher::with_default_writers(),
            derived: vec![],
        }
    }

    /// Append derived quantities to every merged solution
    pub fn with_derived(mut self, derived: Vec<Box<dyn DerivedQuantity<T>>>) -> Self {
        self.derived = derived;
        self
    }

    /// Configuration
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// The gather
    pub fn gather(&self) -> &G {
        &self.gather
    }

    /// The gather, for handing over partitions
    pub fn gather_mut(&mut self) -> &mut G {
        &mut self.gather
    }

    /// The dispatcher, for registering writers
    pub fn dispatcher_mut(&mut self) -> &mut OutputDispatcher<T> {
        &mut self.dispatcher
    }

    /// Convergence history recorded so far
    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    /// Gather, merge and write every zone
    ///
    /// Every process must call this collectively. If `formats` is empty, the configured
    /// formats are written. Returns `None` on processes other than the aggregation point.
    /// Participation and (with [crate::merge::ZonePolicy::AbortAll]) integrity errors abort
    /// the request before any file is written. Writer failures are reported per format.
    pub fn request_output(
        &mut self,
        iteration: usize,
        time: f64,
        formats: &[OutputFormat],
    ) -> Result<Option<DispatchReport>, OutputError> {
        let span = info_span!("output", iteration);
        let _enter = span.enter();

        self.gather.begin_request();
        let mut per_zone = Vec::with_capacity(self.gather.zone_count());
        for zone in 0..self.gather.zone_count() {
            if let Some(partitions) = self.gather.gather(zone)? {
                per_zone.push(partitions);
            }
        }
        if !self.gather.is_root() {
            debug!("sent partitions to the aggregation point");
            return Ok(None);
        }

        let aggregation = self.aggregator.aggregate(&per_zone, &self.derived)?;
        // Partitions are copied into the merged buffers
        drop(per_zone);

        let formats = if formats.is_empty() {
            &self.config.formats[..]
        } else {
            formats
        };
        let request = self.config.request(iteration, time);
        let report = self.dispatcher.dispatch(aggregation, formats, &request);
        if report.is_complete() {
            info!(formats = report.statuses().len(), "output written");
        } else {
            warn!(
                failed = report.failed().count(),
                skipped_zones = report.skipped_zones().len(),
                "output incomplete"
            );
        }
        Ok(Some(report))
    }

    /// Write the configured formats if the iteration is due
    ///
    /// Returns `None` if nothing was due or on processes other than the aggregation point.
    pub fn write_solution(
        &mut self,
        iteration: usize,
        time: f64,
    ) -> Result<Option<DispatchReport>, OutputError> {
        if !self.config.solution_due(iteration) {
            return Ok(None);
        }
        self.request_output(iteration, time, &[])
    }

    /// Record the history of an iteration and flush it to the history file
    ///
    /// The names of the first record become the history header. Returns `None` if the
    /// iteration is not due. Only the aggregation point writes the history file.
    pub fn record_history<S: AsRef<str>>(
        &mut self,
        iteration: usize,
        elapsed: f64,
        named_values: &[(S, f64)],
    ) -> Result<Option<AppendOutcome>, HistoryError> {
        if !self.config.history_due(iteration) {
            return Ok(None);
        }
        self.init_history(named_values)?;
        let outcome = self.history.append(iteration, elapsed, named_values)?;
        self.flush_history(outcome)?;
        Ok(Some(outcome))
    }

    /// Record the history of an inner iteration of a time step and flush it
    ///
    /// Requires [OutputConfig::dual_time]. Frequencies apply to the inner iteration.
    pub fn record_dual_time_history<S: AsRef<str>>(
        &mut self,
        time_iter: usize,
        inner_iter: usize,
        elapsed: f64,
        named_values: &[(S, f64)],
    ) -> Result<Option<AppendOutcome>, HistoryError> {
        if !self.config.history_due(inner_iter) {
            return Ok(None);
        }
        self.init_history(named_values)?;
        let outcome = self
            .history
            .append_dual_time(time_iter, inner_iter, elapsed, named_values)?;
        self.flush_history(outcome)?;
        Ok(Some(outcome))
    }

    fn init_history<S: AsRef<str>>(
        &mut self,
        named_values: &[(S, f64)],
    ) -> Result<(), HistoryError> {
        if self.history.state() == HistoryState::Uninitialized {
            self.history
                .header(named_values.iter().map(|(n, _)| n.as_ref().to_string()))?;
        }
        Ok(())
    }

    fn flush_history(&mut self, outcome: AppendOutcome) -> Result<(), HistoryError> {
        if outcome == AppendOutcome::Appended && self.gather.is_root() {
            let dir = &self.config.directory;
            std::fs::create_dir_all(dir)
                .map_err(|e| HistoryError::Io(format!("{}: {e}", dir.display())))?;
            self.history.flush(&self.config.history_path())?;
        }
        Ok(())
    }
}
