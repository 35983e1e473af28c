//! Errors
use crate::types::{ElementType, OutputFormat};
use thiserror::Error;

/// Merged data would not be referentially consistent
///
/// Always fatal for the output request that raised it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    /// A halo copy whose global identifier is not owned by any partition
    #[error("node with global id {global_id} (rank {rank}, local index {local_index}) has no owning partition")]
    UnresolvedNode {
        /// Rank of the partition
        rank: usize,
        /// Local index of the node
        local_index: usize,
        /// Global identifier
        global_id: usize,
    },
    /// Two partitions both claim ownership of a node
    #[error("global id {global_id} is owned by both rank {first_rank} and rank {second_rank}")]
    DuplicateGlobalId {
        /// Global identifier
        global_id: usize,
        /// Rank of the first owner
        first_rank: usize,
        /// Rank of the second owner
        second_rank: usize,
    },
    /// An element refers to a local node that does not exist
    #[error("{element_type} {element} on rank {rank} refers to local node {local_index}, but the partition has {node_count} nodes")]
    DanglingReference {
        /// Rank of the partition
        rank: usize,
        /// Element type
        element_type: ElementType,
        /// Index of the element in its block
        element: usize,
        /// Local index of the node
        local_index: usize,
        /// Number of local nodes
        node_count: usize,
    },
    /// Connectivity array length is not a multiple of the element arity
    #[error("{element_type} connectivity on rank {rank} has {len} entries, which is not a multiple of {arity}")]
    ArityMismatch {
        /// Rank of the partition
        rank: usize,
        /// Element type
        element_type: ElementType,
        /// Length of the array
        len: usize,
        /// Number of nodes per element
        arity: usize,
    },
    /// Per-element flags do not match the number of elements
    #[error("{element_type} block on rank {rank} has {elements} elements but {flags} flags")]
    ElementFlags {
        /// Rank of the partition
        rank: usize,
        /// Element type
        element_type: ElementType,
        /// Number of elements
        elements: usize,
        /// Number of flags
        flags: usize,
    },
    /// Coordinate arrays inconsistent with the geometric dimension
    #[error("rank {rank} reports {len} coordinates for {nodes} nodes in dimension {gdim}")]
    CoordinateDimension {
        /// Rank of the partition
        rank: usize,
        /// Geometric dimension
        gdim: usize,
        /// Number of local nodes
        nodes: usize,
        /// Length of the array
        len: usize,
    },
    /// Per-node arrays of different lengths
    #[error("rank {rank} reports {nodes} nodes but {len} {what}")]
    NodeArrays {
        /// Rank of the partition
        rank: usize,
        /// Number of local nodes
        nodes: usize,
        /// Length of the array
        len: usize,
        /// Which array
        what: &'static str,
    },
    /// Partitions disagree on geometric dimension
    #[error("rank {rank} has geometric dimension {found}, expected {expected}")]
    GeometryDimension {
        /// Rank of the partition
        rank: usize,
        /// Expected value
        expected: usize,
        /// Reported value
        found: usize,
    },
    /// Field value array does not match the field layout
    #[error("rank {rank} reports {len} field values for {nodes} nodes and {width} fields")]
    FieldWidth {
        /// Rank of the partition
        rank: usize,
        /// Number of local nodes
        nodes: usize,
        /// Number of fields
        width: usize,
        /// Length of the array
        len: usize,
    },
    /// Partitions disagree on which fields they carry
    #[error("rank {rank} reports fields {found:?}, expected {expected:?}")]
    FieldLayoutMismatch {
        /// Rank of the partition
        rank: usize,
        /// Expected value
        expected: Vec<String>,
        /// Reported value
        found: Vec<String>,
    },
    /// Derived quantity evaluated on a layout without enough conserved variables
    #[error("field layout has {conserved} conserved variables, but {fields} fields")]
    ConservedCount {
        /// Number of conserved variables
        conserved: usize,
        /// Number of fields
        fields: usize,
    },
    /// Two partitions report the same rank
    #[error("rank {rank} appears in more than one partition")]
    DuplicateRank {
        /// Rank of the partition
        rank: usize,
    },
    /// A merge step was given a different partition set than the one that was numbered
    #[error("partition set does not match the node numbering ({expected} partitions numbered, {found} given)")]
    PartitionSetChanged {
        /// Number of partitions that were numbered
        expected: usize,
        /// Number of partitions given
        found: usize,
    },
}

/// A partition did not take part in a gather correctly
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParticipationError {
    /// Not every expected partition reported before the timeout
    #[error("zone {zone}: ranks {missing:?} did not report within {timeout_ms} ms")]
    Timeout {
        /// Zone identifier
        zone: usize,
        /// Ranks that did not report
        missing: Vec<usize>,
        /// Timeout in milliseconds
        timeout_ms: u128,
    },
    /// All senders were dropped before every partition reported
    #[error("zone {zone}: ranks {missing:?} disconnected before reporting")]
    Disconnected {
        /// Zone identifier
        zone: usize,
        /// Ranks that did not report
        missing: Vec<usize>,
    },
    /// The same rank reported twice
    #[error("zone {zone}: rank {rank} reported more than once")]
    DuplicateRank {
        /// Zone identifier
        zone: usize,
        /// Rank of the partition
        rank: usize,
    },
    /// A rank outside the expected range reported
    #[error("zone {zone}: rank {rank} reported, but only {expected} partitions are expected")]
    UnexpectedRank {
        /// Zone identifier
        zone: usize,
        /// Rank of the partition
        rank: usize,
        /// Expected value
        expected: usize,
    },
    /// A zone that the gather does not know about
    #[error("zone {zone} is not known to this gather (it has {zones} zones)")]
    UnknownZone {
        /// Zone identifier
        zone: usize,
        /// Number of zones
        zones: usize,
    },
    /// A zone with no partitions at all
    #[error("zone {zone} has no partitions")]
    Empty {
        /// Zone identifier
        zone: usize,
    },
    /// A partition arrived but could not be decoded
    #[error("zone {zone}: partition of rank {rank} could not be decoded: {reason}")]
    Malformed {
        /// Zone identifier
        zone: usize,
        /// Rank of the sender
        rank: usize,
        /// Decoder message
        reason: String,
    },
}

fn time_step_suffix(time_iter: &Option<usize>) -> String {
    time_iter.map_or_else(String::new, |t| format!(" of time step {t}"))
}

/// A value for an already recorded iteration was appended with different values
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "iteration {iteration}{} is already recorded with different values",
    time_step_suffix(.time_iter)
)]
pub struct HistoryConflictError {
    /// The time step of a dual-time history
    pub time_iter: Option<usize>,
    /// The iteration that was re-appended
    pub iteration: usize,
    /// The values already recorded
    pub recorded: Vec<f64>,
    /// The values that were rejected
    pub rejected: Vec<f64>,
}

/// History recorder errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// Iteration re-appended with different values
    #[error(transparent)]
    Conflict(#[from] HistoryConflictError),
    /// Append before a header was written
    #[error("history header has not been written")]
    NotInitialized,
    /// Header written twice
    #[error("history header was already written")]
    HeaderAlreadyWritten,
    /// Named values do not match the header
    #[error("history values {found:?} do not match the header fields {expected:?}")]
    FieldMismatch {
        /// Expected value
        expected: Vec<String>,
        /// Reported value
        found: Vec<String>,
    },
    /// A steady iteration appended to a dual-time history, or the other way round
    #[error("a {expected} history cannot record a {found} iteration")]
    KeyMismatch {
        /// Kind of the history
        expected: &'static str,
        /// Kind of the appended iteration
        found: &'static str,
    },
    /// Flushing to a file failed
    #[error("could not flush history: {0}")]
    Io(String),
}

/// A writer could not produce its output
#[derive(Error, Debug)]
pub enum WriterError {
    /// IO failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// No writer is available for this format
    #[error("no writer available for {format}: {reason}")]
    Unavailable {
        /// Output format
        format: OutputFormat,
        /// Why the writer is unavailable
        reason: String,
    },
    /// Encoding failed
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Fatal errors of an output request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutputError {
    /// A zone could not be merged
    #[error("zone {zone} failed to merge: {source}")]
    Integrity {
        /// Zone identifier
        zone: usize,
        /// Cause
        #[source]
        source: IntegrityError,
    },
    /// A gather did not complete
    #[error(transparent)]
    Participation(#[from] ParticipationError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading the configuration failed
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// Parsing the configuration failed
    #[cfg(feature = "serde")]
    #[error("could not parse configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
}
