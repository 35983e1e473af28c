//! Convergence history
//!
//! The recorder keeps an append-only sequence of per-iteration records. A record is never
//! changed once appended: re-appending an iteration with the same values is a no-op, and
//! re-appending it with different values is a [HistoryConflictError]. Unsteady dual-time runs
//! key their records by time step and inner iteration.
use crate::error::{HistoryConflictError, HistoryError};
use itertools::Itertools;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

const SCREEN_WIDTH: usize = 14;

/// Text format of a history
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HistoryFormat {
    /// Fixed-width columns for terminal output
    Screen,
    /// Comma-separated values with a quoted header
    #[default]
    Csv,
    /// Tecplot ASCII
    Tecplot,
}

impl HistoryFormat {
    /// File extension
    pub fn extension(&self) -> &'static str {
        match self {
            HistoryFormat::Screen => "txt",
            HistoryFormat::Csv => "csv",
            HistoryFormat::Tecplot => "dat",
        }
    }
}

/// State of a recorder
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HistoryState {
    /// No header yet
    Uninitialized,
    /// Header written, nothing appended
    HeaderWritten,
    /// At least one record appended
    Recording,
}

/// Outcome of a successful append
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AppendOutcome {
    /// A new record was added
    Appended,
    /// The iteration was already recorded with the same values
    Unchanged,
}

/// Values recorded at one iteration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryRecord {
    time_iter: Option<usize>,
    iteration: usize,
    elapsed: f64,
    values: Vec<f64>,
}

impl HistoryRecord {
    /// Time step, for a dual-time history
    pub fn time_iter(&self) -> Option<usize> {
        self.time_iter
    }
    /// Iteration. In a dual-time history this is the inner iteration of the time step.
    pub fn iteration(&self) -> usize {
        self.iteration
    }
    /// Elapsed time in seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
    /// Values, in the order of the header fields
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

fn kind(dual_time: bool) -> &'static str {
    if dual_time {
        "dual-time"
    } else {
        "steady"
    }
}

/// Append-only convergence history
///
/// A steady history is keyed by iteration. A dual-time history is keyed by time step and
/// inner iteration, so that every time step restarts its inner iterations at 0.
#[derive(Debug, Clone)]
pub struct HistoryRecorder {
    format: HistoryFormat,
    dual_time: bool,
    names: Vec<String>,
    state: HistoryState,
    records: Vec<HistoryRecord>,
    by_key: HashMap<(Option<usize>, usize), usize>,
    flushed: Option<usize>,
}

impl HistoryRecorder {
    /// Create a steady recorder whose header and files are produced in `format`
    pub fn new(format: HistoryFormat) -> Self {
        Self {
            format,
            dual_time: false,
            names: vec![],
            state: HistoryState::Uninitialized,
            records: vec![],
            by_key: HashMap::new(),
            flushed: None,
        }
    }

    /// Create a dual-time recorder whose header and files are produced in `format`
    pub fn dual_time(format: HistoryFormat) -> Self {
        Self {
            dual_time: true,
            ..Self::new(format)
        }
    }

    /// Format of the header and of flushed files
    pub fn format(&self) -> HistoryFormat {
        self.format
    }

    /// Is this a dual-time history?
    pub fn is_dual_time(&self) -> bool {
        self.dual_time
    }

    /// State of the recorder
    pub fn state(&self) -> HistoryState {
        self.state
    }

    /// Header fields
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Fix the fields of the history and return the formatted header
    pub fn header<S: Into<String>>(
        &mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<String, HistoryError> {
        if self.state != HistoryState::Uninitialized {
            return Err(HistoryError::HeaderAlreadyWritten);
        }
        self.names = names.into_iter().map(|n| n.into()).collect();
        self.state = HistoryState::HeaderWritten;
        debug!(fields = self.names.len(), "history header written");
        Ok(self.render_header(self.format))
    }

    /// Record the values of an iteration of a steady history
    ///
    /// The names must match the header fields, in order.
    pub fn append<S: AsRef<str>>(
        &mut self,
        iteration: usize,
        elapsed: f64,
        named_values: &[(S, f64)],
    ) -> Result<AppendOutcome, HistoryError> {
        self.append_keyed(None, iteration, elapsed, named_values)
    }

    /// Record the values of an inner iteration of a time step of a dual-time history
    ///
    /// The names must match the header fields, in order.
    pub fn append_dual_time<S: AsRef<str>>(
        &mut self,
        time_iter: usize,
        inner_iter: usize,
        elapsed: f64,
        named_values: &[(S, f64)],
    ) -> Result<AppendOutcome, HistoryError> {
        self.append_keyed(Some(time_iter), inner_iter, elapsed, named_values)
    }

    fn append_keyed<S: AsRef<str>>(
        &mut self,
        time_iter: Option<usize>,
        iteration: usize,
        elapsed: f64,
        named_values: &[(S, f64)],
    ) -> Result<AppendOutcome, HistoryError> {
        if self.state == HistoryState::Uninitialized {
            return Err(HistoryError::NotInitialized);
        }
        if time_iter.is_some() != self.dual_time {
            return Err(HistoryError::KeyMismatch {
                expected: kind(self.dual_time),
                found: kind(time_iter.is_some()),
            });
        }
        if named_values.len() != self.names.len()
            || named_values
                .iter()
                .zip(&self.names)
                .any(|((n, _), expected)| n.as_ref() != expected)
        {
            return Err(HistoryError::FieldMismatch {
                expected: self.names.clone(),
                found: named_values
                    .iter()
                    .map(|(n, _)| n.as_ref().to_string())
                    .collect(),
            });
        }
        let values = named_values.iter().map(|(_, v)| *v).collect_vec();

        if let Some(&i) = self.by_key.get(&(time_iter, iteration)) {
            let recorded = &self.records[i];
            // Bitwise comparison so that a repeated NaN is still idempotent
            if recorded.values.len() == values.len()
                && recorded
                    .values
                    .iter()
                    .zip(&values)
                    .all(|(a, b)| a.to_bits() == b.to_bits())
            {
                return Ok(AppendOutcome::Unchanged);
            }
            warn!(?time_iter, iteration, "rejected conflicting history record");
            return Err(HistoryConflictError {
                time_iter,
                iteration,
                recorded: recorded.values.clone(),
                rejected: values,
            }
            .into());
        }

        self.by_key.insert((time_iter, iteration), self.records.len());
        self.records.push(HistoryRecord {
            time_iter,
            iteration,
            elapsed,
            values,
        });
        self.state = HistoryState::Recording;
        Ok(AppendOutcome::Appended)
    }

    /// All records, in insertion order
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Most recent record
    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    /// Record of an iteration of a steady history
    pub fn get(&self, iteration: usize) -> Option<&HistoryRecord> {
        self.by_key
            .get(&(None, iteration))
            .map(|i| &self.records[*i])
    }

    /// Record of an inner iteration of a dual-time history
    pub fn get_dual_time(&self, time_iter: usize, inner_iter: usize) -> Option<&HistoryRecord> {
        self.by_key
            .get(&(Some(time_iter), inner_iter))
            .map(|i| &self.records[*i])
    }

    /// Records of one time step of a dual-time history, in insertion order
    pub fn time_step(&self, time_iter: usize) -> impl Iterator<Item = &HistoryRecord> + '_ {
        self.records
            .iter()
            .filter(move |r| r.time_iter == Some(time_iter))
    }

    /// Values of one field, in insertion order
    pub fn series(&self, name: &str) -> Option<impl Iterator<Item = f64> + '_> {
        let i = self.names.iter().position(|n| n == name)?;
        Some(self.records.iter().map(move |r| r.values[i]))
    }

    /// Header columns, including the iteration and time columns
    fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        let keys: &[&str] = if self.dual_time {
            &["Time_Iter", "Inner_Iter", "Time"]
        } else {
            &["Iteration", "Time"]
        };
        keys.iter()
            .copied()
            .chain(self.names.iter().map(|n| n.as_str()))
    }

    /// Width of each column of the screen format
    fn screen_widths(&self) -> Vec<usize> {
        self.columns().map(|c| c.len().max(SCREEN_WIDTH)).collect()
    }

    /// Render the header in a format
    pub fn render_header(&self, format: HistoryFormat) -> String {
        match format {
            HistoryFormat::Screen => {
                let line = self
                    .columns()
                    .zip(self.screen_widths())
                    .map(|(c, w)| format!("{c:>w$}"))
                    .join("|");
                let rule = "-".repeat(line.len() + 2);
                format!("{rule}\n|{line}|\n{rule}\n")
            }
            HistoryFormat::Csv => {
                format!("{}\n", self.columns().map(|c| format!("\"{c}\"")).join(","))
            }
            HistoryFormat::Tecplot => format!(
                "TITLE = \"Convergence history\"\nVARIABLES = {}\nZONE T= \"Convergence history\"\n",
                self.columns().map(|c| format!("\"{c}\"")).join(",")
            ),
        }
    }

    /// Render one record in a format
    pub fn render_record(&self, format: HistoryFormat, record: &HistoryRecord) -> String {
        let keys = record.time_iter.into_iter().chain([record.iteration]);
        match format {
            HistoryFormat::Screen => {
                let widths = self.screen_widths();
                let key_count = widths.len() - self.names.len() - 1;
                let cells = keys
                    .zip(widths.iter().copied())
                    .map(|(k, w)| format!("{k:>w$}"))
                    .chain(std::iter::once(format!(
                        "{:>w$.3}",
                        record.elapsed,
                        w = widths[key_count]
                    )))
                    .chain(
                        record
                            .values
                            .iter()
                            .zip(widths[key_count + 1..].iter().copied())
                            .map(|(v, w)| format!("{v:>w$.6e}")),
                    )
                    .join("|");
                format!("|{cells}|\n")
            }
            HistoryFormat::Csv | HistoryFormat::Tecplot => {
                let mut line = keys.map(|k| k.to_string()).join(",");
                line.push_str(&format!(",{}", record.elapsed));
                for v in &record.values {
                    line.push_str(&format!(",{v}"));
                }
                line.push('\n');
                line
            }
        }
    }

    /// Render the full history in a format
    pub fn render(&self, format: HistoryFormat) -> String {
        let mut s = self.render_header(format);
        for r in &self.records {
            s.push_str(&self.render_record(format, r));
        }
        s
    }

    /// Write the records that have not been flushed yet to a file, in the recorder's format
    ///
    /// The first flush creates the file and writes the header. Later flushes append. Returns the
    /// number of records written.
    pub fn flush(&mut self, path: &Path) -> Result<usize, HistoryError> {
        if self.state == HistoryState::Uninitialized {
            return Err(HistoryError::NotInitialized);
        }
        let start = self.flushed.unwrap_or(0);
        let mut s = String::new();
        if self.flushed.is_none() {
            s.push_str(&self.render_header(self.format));
        }
        for r in &self.records[start..] {
            s.push_str(&self.render_record(self.format, r));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.flushed.is_some())
            .truncate(self.flushed.is_none())
            .open(path)
            .map_err(|e| HistoryError::Io(format!("{}: {e}", path.display())))?;
        file.write_all(s.as_bytes())
            .map_err(|e| HistoryError::Io(format!("{}: {e}", path.display())))?;

        let written = self.records.len() - start;
        self.flushed = Some(self.records.len());
        debug!(path = %path.display(), written, "flushed history");
        Ok(written)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn recorder() -> HistoryRecorder {
        let mut h = HistoryRecorder::new(HistoryFormat::Csv);
        h.header(["rms[Rho]", "CL"]).unwrap();
        h
    }

    #[test]
    fn test_idempotent_append() {
        let mut h = recorder();
        assert_eq!(
            h.append(5, 0.5, &[("rms[Rho]", -3.0), ("CL", 0.25)]),
            Ok(AppendOutcome::Appended)
        );
        assert_eq!(h.state(), HistoryState::Recording);
        assert_eq!(
            h.append(5, 0.7, &[("rms[Rho]", -3.0), ("CL", 0.25)]),
            Ok(AppendOutcome::Unchanged)
        );
        assert_eq!(h.records().len(), 1);
        assert_eq!(h.get(5).unwrap().elapsed(), 0.5);
    }

    #[test]
    fn test_conflict_keeps_original() {
        let mut h = recorder();
        h.append(5, 0.5, &[("rms[Rho]", -3.0), ("CL", 0.25)])
            .unwrap();
        let err = h
            .append(5, 0.5, &[("rms[Rho]", -3.0), ("CL", 0.3)])
            .unwrap_err();
        assert_eq!(
            err,
            HistoryError::Conflict(HistoryConflictError {
                time_iter: None,
                iteration: 5,
                recorded: vec![-3.0, 0.25],
                rejected: vec![-3.0, 0.3],
            })
        );
        assert_eq!(h.get(5).unwrap().values(), &[-3.0, 0.25]);
        assert_eq!(h.records().len(), 1);
    }

    #[test]
    fn test_insertion_order() {
        let mut h = recorder();
        for it in [3, 1, 2] {
            h.append(it, it as f64, &[("rms[Rho]", -(it as f64)), ("CL", 0.1)])
                .unwrap();
        }
        assert_eq!(
            h.render(HistoryFormat::Csv),
            "\"Iteration\",\"Time\",\"rms[Rho]\",\"CL\"\n3,3,-3,0.1\n1,1,-1,0.1\n2,2,-2,0.1\n"
        );
        assert_eq!(
            h.series("rms[Rho]").unwrap().collect::<Vec<_>>(),
            vec![-3.0, -1.0, -2.0]
        );
        assert_eq!(h.last().unwrap().iteration(), 2);
        assert!(h.series("CD").is_none());
    }

    #[test]
    fn test_state_errors() {
        let mut h = HistoryRecorder::new(HistoryFormat::Screen);
        assert_eq!(
            h.append(0, 0.0, &[("CL", 1.0)]),
            Err(HistoryError::NotInitialized)
        );
        let header = h.header(["CL"]).unwrap();
        assert!(header.contains("|     Iteration|          Time|            CL|"));
        assert_eq!(h.state(), HistoryState::HeaderWritten);
        assert_eq!(h.header(["CD"]), Err(HistoryError::HeaderAlreadyWritten));
        assert!(matches!(
            h.append(0, 0.0, &[("CD", 1.0)]),
            Err(HistoryError::FieldMismatch { .. })
        ));
        assert!(matches!(
            h.append(0, 0.0, &[("CL", 1.0), ("CD", 1.0)]),
            Err(HistoryError::FieldMismatch { .. })
        ));
    }

    #[test]
    fn test_tecplot_and_screen() {
        let mut h = recorder();
        h.append(1, 0.25, &[("rms[Rho]", -1.5), ("CL", 0.5)])
            .unwrap();
        let tecplot = h.render(HistoryFormat::Tecplot);
        let lines = tecplot.lines().collect::<Vec<_>>();
        assert_eq!(lines[1], "VARIABLES = \"Iteration\",\"Time\",\"rms[Rho]\",\"CL\"");
        assert_eq!(lines[2], "ZONE T= \"Convergence history\"");
        assert_eq!(lines[3], "1,0.25,-1.5,0.5");

        let screen = h.render(HistoryFormat::Screen);
        let lines = screen.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3].len(), lines[1].len());
        assert!(lines[3].starts_with("|             1|         0.250|"));
    }

    #[test]
    fn test_incremental_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let mut h = recorder();
        h.append(1, 0.1, &[("rms[Rho]", -1.0), ("CL", 0.1)])
            .unwrap();
        assert_eq!(h.flush(&path), Ok(1));
        h.append(2, 0.2, &[("rms[Rho]", -2.0), ("CL", 0.2)])
            .unwrap();
        h.append(3, 0.3, &[("rms[Rho]", -3.0), ("CL", 0.3)])
            .unwrap();
        assert_eq!(h.flush(&path), Ok(2));
        assert_eq!(h.flush(&path), Ok(0));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, h.render(HistoryFormat::Csv));
    }

    #[test]
    fn test_wide_screen_columns() {
        let mut h = HistoryRecorder::new(HistoryFormat::Screen);
        h.header(["rms[Momentum_x]", "CL"]).unwrap();
        h.append(7, 1.0, &[("rms[Momentum_x]", -4.0), ("CL", 0.5)])
            .unwrap();
        let screen = h.render(HistoryFormat::Screen);
        let lines = screen.lines().collect::<Vec<_>>();
        assert_eq!(lines[1].len(), lines[3].len());
        let header_cells = lines[1].split('|').map(|c| c.len()).collect::<Vec<_>>();
        let record_cells = lines[3].split('|').map(|c| c.len()).collect::<Vec<_>>();
        assert_eq!(header_cells, record_cells);
        assert_eq!(header_cells[3], "rms[Momentum_x]".len());
    }

    #[test]
    fn test_flush_uses_recorder_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.dat");
        let mut h = HistoryRecorder::new(HistoryFormat::Tecplot);
        h.header(["CL"]).unwrap();
        h.append(1, 0.5, &[("CL", 0.1)]).unwrap();
        h.flush(&path).unwrap();
        h.append(2, 1.0, &[("CL", 0.2)]).unwrap();
        h.flush(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            h.render(HistoryFormat::Tecplot)
        );
    }

    #[test]
    fn test_dual_time() {
        let mut h = HistoryRecorder::dual_time(HistoryFormat::Csv);
        h.header(["rms[Rho]"]).unwrap();
        for time_iter in 0..2 {
            for inner_iter in 0..3 {
                let value = -1.0 - (10 * time_iter + inner_iter) as f64;
                assert_eq!(
                    h.append_dual_time(time_iter, inner_iter, 0.0, &[("rms[Rho]", value)]),
                    Ok(AppendOutcome::Appended)
                );
            }
        }
        assert_eq!(
            h.append_dual_time(1, 2, 0.0, &[("rms[Rho]", -13.0)]),
            Ok(AppendOutcome::Unchanged)
        );
        assert_eq!(
            h.append_dual_time(1, 0, 0.0, &[("rms[Rho]", 3.0)]),
            Err(HistoryError::Conflict(HistoryConflictError {
                time_iter: Some(1),
                iteration: 0,
                recorded: vec![-11.0],
                rejected: vec![3.0],
            }))
        );
        assert_eq!(h.records().len(), 6);
        assert_eq!(h.get_dual_time(1, 0).unwrap().values(), [-11.0]);
        assert_eq!(
            h.time_step(1).map(|r| r.iteration()).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            h.append(0, 0.0, &[("rms[Rho]", 0.0)]),
            Err(HistoryError::KeyMismatch {
                expected: "dual-time",
                found: "steady"
            })
        );

        let csv = h.render(HistoryFormat::Csv);
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "\"Time_Iter\",\"Inner_Iter\",\"Time\",\"rms[Rho]\"");
        assert_eq!(lines[1], "0,0,0,-1");
        assert_eq!(lines[4], "1,0,0,-11");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_steady_rejects_dual_time() {
        let mut h = recorder();
        assert_eq!(
            h.append_dual_time(0, 0, 0.0, &[("rms[Rho]", 0.0), ("CL", 0.0)]),
            Err(HistoryError::KeyMismatch {
                expected: "steady",
                found: "dual-time"
            })
        );
        assert!(h.get_dual_time(0, 0).is_none());
    }
}
