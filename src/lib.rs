//! Merging and output of partitioned mesh solutions
//!
//! The partitions of a distributed solver are gathered onto one aggregation point, where
//! halo nodes are removed, a global numbering is computed and the merged mesh and solution
//! of each zone are handed to the writers of every requested format.
#![cfg_attr(feature = "strict", deny(warnings), deny(unused_crate_dependencies))]
#![warn(missing_docs)]

pub mod closure;
pub mod config;
pub mod engine;
pub mod error;
pub mod gather;
pub mod history;
pub mod io;
pub mod merge;
pub mod output;
pub mod partition;
pub mod shapes;
pub mod traits;
pub mod types;

pub use config::OutputConfig;
pub use engine::OutputEngine;
pub use partition::{Partition, PartitionBuilder};
