//! Splitting structured meshes into partitions
use crate::{
    partition::{FieldLayout, Partition, PartitionBuilder},
    types::{ElementType, Ownership, RealScalar},
};
use itertools::Itertools;
use std::collections::HashMap;

/// A structured mesh before it is split
pub(crate) struct StructuredMesh<T: RealScalar> {
    pub(crate) gdim: usize,
    /// Number of cell rows along the last axis
    pub(crate) rows: usize,
    /// Coordinates of each node, indexed by global id
    pub(crate) coordinates: Vec<T>,
    /// Row of each node along the last axis
    pub(crate) node_rows: Vec<usize>,
    /// Is each node on the boundary of the domain?
    pub(crate) boundary: Vec<bool>,
    /// Cell row, type, global node ids and boundary flag of each element
    pub(crate) elements: Vec<(usize, ElementType, Vec<usize>, bool)>,
}

impl<T: RealScalar> StructuredMesh<T> {
    fn rank_of_row(&self, row: usize, ranks: usize) -> usize {
        row * ranks / self.rows
    }

    /// Split into one partition per rank
    pub(crate) fn partition(
        &self,
        ranks: usize,
        layout: &FieldLayout,
        values: impl Fn(&[T]) -> Vec<T>,
    ) -> Vec<Partition<T>> {
        let node_owner = self
            .node_rows
            .iter()
            .map(|r| self.rank_of_row((*r).min(self.rows - 1), ranks))
            .collect_vec();

        // Local nodes of each rank are the nodes of its elements, sorted by global id
        let local_nodes = (0..ranks)
            .map(|rank| {
                self.elements
                    .iter()
                    .filter(|(row, ..)| self.rank_of_row(*row, ranks) == rank)
                    .flat_map(|(_, _, nodes, _)| nodes.iter().copied())
                    .sorted()
                    .dedup()
                    .collect_vec()
            })
            .collect_vec();
        let local_index = local_nodes
            .iter()
            .map(|nodes| {
                nodes
                    .iter()
                    .enumerate()
                    .map(|(i, n)| (*n, i))
                    .collect::<HashMap<_, _>>()
            })
            .collect_vec();

        (0..ranks)
            .map(|rank| {
                let mut b = PartitionBuilder::new(rank, self.gdim, layout.clone());
                for id in &local_nodes[rank] {
                    let coords = &self.coordinates[id * self.gdim..(id + 1) * self.gdim];
                    let owner = node_owner[*id];
                    let ownership = if owner == rank {
                        Ownership::Owned
                    } else {
                        Ownership::Ghost(owner, local_index[owner][id])
                    };
                    let i = b.add_node(*id, coords, ownership, &values(coords));
                    if self.boundary[*id] {
                        b.mark_boundary_node(i);
                    }
                }
                for (row, element_type, nodes, boundary) in &self.elements {
                    if self.rank_of_row(*row, ranks) == rank {
                        let local = nodes
                            .iter()
                            .map(|n| local_index[rank][n])
                            .collect_vec();
                        b.add_element(*element_type, &local, Ownership::Owned, *boundary);
                    }
                }
                b.build()
            })
            .collect()
    }
}
