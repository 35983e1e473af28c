//! Request-scoped merge state
use crate::{error::IntegrityError, partition::Partition, types::RealScalar};
use std::collections::HashMap;

/// Global numbering of one zone for one output request
///
/// Created by [GeometryMerger::number_nodes](super::GeometryMerger::number_nodes) and passed to
/// every later merge step of the same request. Nothing in it outlives the request.
#[derive(Debug)]
pub struct MergeContext {
    /// Positions of the partitions in the input slice, sorted by rank
    pub(crate) order: Vec<usize>,
    /// Rank of the partition at each input position
    pub(crate) ranks: Vec<usize>,
    /// For each input position, the global index of every local node
    pub(crate) local_to_global: Vec<Vec<usize>>,
    /// Global index of each global identifier
    pub(crate) id_to_index: HashMap<usize, usize>,
    /// Owning (position, local index) of each global index
    pub(crate) owners: Vec<(usize, usize)>,
    pub(crate) gdim: usize,
    pub(crate) total_local_nodes: usize,
}

impl MergeContext {
    /// Number of global nodes
    pub fn node_count(&self) -> usize {
        self.owners.len()
    }
    /// Number of local nodes over all partitions, including halo copies
    pub fn total_local_nodes(&self) -> usize {
        self.total_local_nodes
    }
    /// Geometric dimension
    pub fn gdim(&self) -> usize {
        self.gdim
    }
    /// Ranks in merge order
    pub fn ranks(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().map(|p| self.ranks[*p])
    }
    /// Global index of a global identifier
    pub fn global_index(&self, global_id: usize) -> Option<usize> {
        self.id_to_index.get(&global_id).copied()
    }
    /// Global index of a local node of the partition at `position` in the input slice
    pub fn local_to_global(&self, position: usize, local_index: usize) -> Option<usize> {
        self.local_to_global
            .get(position)
            .and_then(|t| t.get(local_index))
            .copied()
    }

    /// Check that a partition slice is the one this context was built from
    pub(crate) fn check<T: RealScalar>(
        &self,
        partitions: &[Partition<T>],
    ) -> Result<(), IntegrityError> {
        if partitions.len() != self.ranks.len()
            || partitions
                .iter()
                .enumerate()
                .any(|(i, p)| {
                    p.rank != self.ranks[i] || p.node_count() != self.local_to_global[i].len()
                })
        {
            return Err(IntegrityError::PartitionSetChanged {
                expected: self.ranks.len(),
                found: partitions.len(),
            });
        }
        Ok(())
    }
}
