//! Multi-zone aggregation
use super::{GeometryMerger, MergedMesh, MergedSolution, SolutionMerger};
use crate::{
    error::{IntegrityError, OutputError},
    partition::Partition,
    traits::DerivedQuantity,
    types::RealScalar,
};
use tracing::{debug, warn};

/// What to do when one zone fails to merge
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZonePolicy {
    /// The first failing zone aborts the whole aggregation
    #[default]
    AbortAll,
    /// Failing zones are reported and skipped, sibling zones are still merged
    SkipFailed,
}

/// A merged zone
#[derive(Debug, Clone, PartialEq)]
pub struct Zone<T: RealScalar> {
    id: usize,
    mesh: MergedMesh<T>,
    solution: MergedSolution<T>,
}

impl<T: RealScalar> Zone<T> {
    /// Create new
    pub fn new(id: usize, mesh: MergedMesh<T>, solution: MergedSolution<T>) -> Self {
        Self { id, mesh, solution }
    }
    /// Zone identifier
    pub fn id(&self) -> usize {
        self.id
    }
    /// Merged mesh
    pub fn mesh(&self) -> &MergedMesh<T> {
        &self.mesh
    }
    /// Merged solution
    pub fn solution(&self) -> &MergedSolution<T> {
        &self.solution
    }
}

/// A zone that was skipped
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneFailure {
    /// Zone identifier
    pub zone: usize,
    /// Why the zone could not be merged
    pub error: IntegrityError,
}

/// Result of an aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation<T: RealScalar> {
    /// Merged zones in configuration order
    pub zones: Vec<Zone<T>>,
    /// Zones that were skipped
    pub failed: Vec<ZoneFailure>,
}

/// Merges each zone of a run independently
#[derive(Debug, Clone, Default)]
pub struct ZoneAggregator {
    policy: ZonePolicy,
    solution_merger: SolutionMerger,
}

impl ZoneAggregator {
    /// Create new
    pub fn new(policy: ZonePolicy, solution_merger: SolutionMerger) -> Self {
        Self {
            policy,
            solution_merger,
        }
    }

    /// Failure policy
    pub fn policy(&self) -> ZonePolicy {
        self.policy
    }

    /// Merge the geometry and solution of one zone
    pub fn merge_zone<T: RealScalar>(
        &self,
        zone: usize,
        partitions: &[Partition<T>],
        derived: &[Box<dyn DerivedQuantity<T>>],
    ) -> Result<Zone<T>, IntegrityError> {
        let ctx = GeometryMerger::number_nodes(partitions)?;
        let mesh = GeometryMerger::merge(&ctx, partitions)?;
        let solution = self
            .solution_merger
            .merge_solution(&ctx, partitions, derived)?;
        debug!(
            zone,
            nodes = mesh.node_count(),
            elements = mesh.total_element_count(),
            "merged zone"
        );
        Ok(Zone::new(zone, mesh, solution))
    }

    /// Merge every zone
    ///
    /// The zone identifier is the position in `per_zone`. Numbering is zone-local.
    pub fn aggregate<T: RealScalar>(
        &self,
        per_zone: &[Vec<Partition<T>>],
        derived: &[Box<dyn DerivedQuantity<T>>],
    ) -> Result<Aggregation<T>, OutputError> {
        let mut aggregation = Aggregation {
            zones: Vec::with_capacity(per_zone.len()),
            failed: vec![],
        };
        for (zone, partitions) in per_zone.iter().enumerate() {
            match self.merge_zone(zone, partitions, derived) {
                Ok(z) => aggregation.zones.push(z),
                Err(source) => match self.policy {
                    ZonePolicy::AbortAll => {
                        return Err(OutputError::Integrity { zone, source });
                    }
                    ZonePolicy::SkipFailed => {
                        warn!(zone, "skipping zone: {source}");
                        aggregation.failed.push(ZoneFailure {
                            zone,
                            error: source,
                        });
                    }
                },
            }
        }
        Ok(aggregation)
    }
}
