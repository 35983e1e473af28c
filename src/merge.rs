//! Merging of partitioned data onto a single aggregation point
mod context;
mod geometry;
mod solution;
mod zone;

pub use context::MergeContext;
pub use geometry::{ElementBlock, GeometryMerger, GlobalElement, GlobalNode, MergedMesh};
pub use solution::{MergedSolution, SolutionMerger};
pub use zone::{Aggregation, Zone, ZoneAggregator, ZoneFailure, ZonePolicy};
