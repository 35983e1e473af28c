//! Geometry merge
use super::MergeContext;
use crate::{
    error::IntegrityError,
    partition::Partition,
    types::{ElementType, Ownership, RealScalar},
};
use itertools::{izip, Itertools};
use std::collections::HashMap;
use tracing::debug;

/// A unique node of the merged domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalNode {
    /// Identifier shared by all partitions that hold this node
    pub global_id: usize,
    /// Rank of the owning partition
    pub owner_rank: usize,
    /// Local index of the node on the owning partition
    pub owner_local_index: usize,
    /// Is the node on the boundary?
    pub boundary: bool,
}

/// An element of the merged mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalElement<'a> {
    /// Element type
    pub element_type: ElementType,
    /// Global indices of the nodes of the element
    pub nodes: &'a [usize],
    /// Is the element on the boundary?
    pub boundary: bool,
}

/// All merged elements of one type, stored contiguously
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBlock {
    element_type: ElementType,
    connectivity: Vec<usize>,
    boundary: Vec<bool>,
    owners: Vec<(usize, usize)>,
}

impl ElementBlock {
    /// Create an empty block
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            connectivity: vec![],
            boundary: vec![],
            owners: vec![],
        }
    }

    pub(crate) fn push(&mut self, nodes: &[usize], boundary: bool, owner: (usize, usize)) {
        debug_assert_eq!(nodes.len(), self.element_type.node_count());
        self.connectivity.extend_from_slice(nodes);
        self.boundary.push(boundary);
        self.owners.push(owner);
    }

    /// Element type
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }
    /// Number of elements
    pub fn len(&self) -> usize {
        self.boundary.len()
    }
    /// Is the block empty?
    pub fn is_empty(&self) -> bool {
        self.boundary.is_empty()
    }
    /// Global node indices of all elements
    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }
    /// Rank and local element index that each element was merged from
    pub fn owners(&self) -> &[(usize, usize)] {
        &self.owners
    }
    /// Element at an index
    pub fn element(&self, index: usize) -> GlobalElement<'_> {
        let n = self.element_type.node_count();
        GlobalElement {
            element_type: self.element_type,
            nodes: &self.connectivity[index * n..(index + 1) * n],
            boundary: self.boundary[index],
        }
    }
    /// Iterate through the elements
    pub fn iter(&self) -> impl Iterator<Item = GlobalElement<'_>> + '_ {
        izip!(
            self.connectivity
                .chunks_exact(self.element_type.node_count()),
            &self.boundary
        )
        .map(|(nodes, boundary)| GlobalElement {
            element_type: self.element_type,
            nodes,
            boundary: *boundary,
        })
    }
}

/// The merged, globally numbered mesh of one zone
#[derive(Debug, Clone, PartialEq)]
pub struct MergedMesh<T: RealScalar> {
    gdim: usize,
    nodes: Vec<GlobalNode>,
    coordinates: Vec<T>,
    blocks: Vec<ElementBlock>,
    total_local_nodes: usize,
}

impl<T: RealScalar> MergedMesh<T> {
    /// Create new
    ///
    /// Blocks are stored in the order of [ElementType::ALL]; empty blocks are dropped.
    pub fn new(
        gdim: usize,
        nodes: Vec<GlobalNode>,
        coordinates: Vec<T>,
        mut blocks: Vec<ElementBlock>,
        total_local_nodes: usize,
    ) -> Self {
        debug_assert_eq!(coordinates.len(), gdim * nodes.len());
        blocks.retain(|b| !b.is_empty());
        blocks.sort_by_key(|b| b.element_type);
        Self {
            gdim,
            nodes,
            coordinates,
            blocks,
            total_local_nodes,
        }
    }
    /// Geometric dimension
    pub fn gdim(&self) -> usize {
        self.gdim
    }
    /// Number of domain nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    /// Number of local nodes that were merged, including halo copies
    pub fn total_local_nodes(&self) -> usize {
        self.total_local_nodes
    }
    /// Nodes
    pub fn nodes(&self) -> &[GlobalNode] {
        &self.nodes
    }
    /// Node with a global index
    pub fn node(&self, index: usize) -> &GlobalNode {
        &self.nodes[index]
    }
    /// Position of the node with a global index
    pub fn position(&self, index: usize) -> &[T] {
        &self.coordinates[index * self.gdim..(index + 1) * self.gdim]
    }
    /// Coordinates of all nodes
    pub fn coordinates(&self) -> &[T] {
        &self.coordinates
    }
    /// Element blocks
    pub fn blocks(&self) -> &[ElementBlock] {
        &self.blocks
    }
    /// Element block of a given type
    pub fn block(&self, element_type: ElementType) -> Option<&ElementBlock> {
        self.blocks.iter().find(|b| b.element_type == element_type)
    }
    /// Number of elements of a given type
    pub fn element_count(&self, element_type: ElementType) -> usize {
        self.block(element_type).map_or(0, |b| b.len())
    }
    /// Total number of elements
    pub fn total_element_count(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }
    /// Highest topological dimension of any element, or 0 for a mesh without elements
    pub fn topology_dim(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| b.element_type.topology_dim())
            .max()
            .unwrap_or(0)
    }
    /// Iterate through all elements, block by block
    pub fn elements(&self) -> impl Iterator<Item = GlobalElement<'_>> + '_ {
        self.blocks.iter().flat_map(|b| b.iter())
    }
}

/// Merges node coordinates and element connectivity of a set of partitions
pub struct GeometryMerger;

impl GeometryMerger {
    /// Compute the global numbering of a set of partitions
    ///
    /// Owned nodes are numbered in order of (rank, local index). Halo copies are resolved to
    /// the index of their owner through their global identifier. The numbering does not
    /// depend on the order of `partitions`.
    pub fn number_nodes<T: RealScalar>(
        partitions: &[Partition<T>],
    ) -> Result<MergeContext, IntegrityError> {
        let order = (0..partitions.len())
            .sorted_by_key(|i| partitions[*i].rank)
            .collect_vec();
        for (a, b) in order.iter().tuple_windows() {
            if partitions[*a].rank == partitions[*b].rank {
                return Err(IntegrityError::DuplicateRank {
                    rank: partitions[*a].rank,
                });
            }
        }

        let gdim = order.first().map_or(0, |i| partitions[*i].gdim);
        for p in partitions {
            Self::check_node_arrays(p, gdim)?;
        }

        let total_local_nodes = partitions.iter().map(|p| p.node_count()).sum::<usize>();
        let owned_count = partitions
            .iter()
            .map(|p| p.owned_node_count())
            .sum::<usize>();

        let mut id_to_index: HashMap<usize, usize> = HashMap::with_capacity(owned_count);
        let mut owners: Vec<(usize, usize)> = Vec::with_capacity(owned_count);
        let mut local_to_global = partitions
            .iter()
            .map(|p| vec![usize::MAX; p.node_count()])
            .collect_vec();

        // Owned nodes first, so that every halo copy can be resolved in a second pass
        for &pos in &order {
            let p = &partitions[pos];
            for (local, (id, ownership)) in izip!(&p.global_ids, &p.ownership).enumerate() {
                if !ownership.is_owned() {
                    continue;
                }
                let index = owners.len();
                if let Some(&existing) = id_to_index.get(id) {
                    let (first, _) = owners[existing];
                    return Err(IntegrityError::DuplicateGlobalId {
                        global_id: *id,
                        first_rank: partitions[first].rank,
                        second_rank: p.rank,
                    });
                }
                id_to_index.insert(*id, index);
                owners.push((pos, local));
                local_to_global[pos][local] = index;
            }
        }

        for &pos in &order {
            let p = &partitions[pos];
            for (local, (id, ownership)) in izip!(&p.global_ids, &p.ownership).enumerate() {
                let Ownership::Ghost(claimed_rank, claimed_local) = *ownership else {
                    continue;
                };
                let Some(&index) = id_to_index.get(id) else {
                    return Err(IntegrityError::UnresolvedNode {
                        rank: p.rank,
                        local_index: local,
                        global_id: *id,
                    });
                };
                let (owner_pos, owner_local) = owners[index];
                if partitions[owner_pos].rank != claimed_rank || owner_local != claimed_local {
                    debug!(
                        rank = p.rank,
                        local,
                        global_id = *id,
                        "halo copy names owner ({claimed_rank}, {claimed_local}) but node is owned by ({}, {owner_local})",
                        partitions[owner_pos].rank
                    );
                }
                local_to_global[pos][local] = index;
            }
        }

        debug!(
            partitions = partitions.len(),
            nodes = owners.len(),
            total_local_nodes,
            "computed global numbering"
        );

        Ok(MergeContext {
            ranks: partitions.iter().map(|p| p.rank).collect(),
            order,
            local_to_global,
            id_to_index,
            owners,
            gdim,
            total_local_nodes,
        })
    }

    fn check_node_arrays<T: RealScalar>(
        p: &Partition<T>,
        gdim: usize,
    ) -> Result<(), IntegrityError> {
        let nodes = p.node_count();
        if p.gdim != gdim {
            return Err(IntegrityError::GeometryDimension {
                rank: p.rank,
                expected: gdim,
                found: p.gdim,
            });
        }
        if p.coordinates.len() != nodes * gdim {
            return Err(IntegrityError::CoordinateDimension {
                rank: p.rank,
                gdim,
                nodes,
                len: p.coordinates.len(),
            });
        }
        for (len, what) in [
            (p.ownership.len(), "ownership entries"),
            (p.boundary.len(), "boundary flags"),
        ] {
            if len != nodes {
                return Err(IntegrityError::NodeArrays {
                    rank: p.rank,
                    nodes,
                    len,
                    what,
                });
            }
        }
        Ok(())
    }

    /// Gather the nodes and their coordinates in global order
    pub fn merge_coordinates<T: RealScalar>(
        ctx: &MergeContext,
        partitions: &[Partition<T>],
    ) -> Result<(Vec<GlobalNode>, Vec<T>), IntegrityError> {
        ctx.check(partitions)?;
        let mut nodes = Vec::with_capacity(ctx.node_count());
        let mut coordinates = Vec::with_capacity(ctx.node_count() * ctx.gdim);
        for &(pos, local) in &ctx.owners {
            let p = &partitions[pos];
            nodes.push(GlobalNode {
                global_id: p.global_ids[local],
                owner_rank: p.rank,
                owner_local_index: local,
                boundary: p.boundary[local],
            });
            coordinates.extend_from_slice(p.coords(local));
        }
        Ok((nodes, coordinates))
    }

    /// Gather the owned elements of one type, with node references in global numbering
    pub fn merge_connectivity<T: RealScalar>(
        ctx: &MergeContext,
        partitions: &[Partition<T>],
        element_type: ElementType,
    ) -> Result<ElementBlock, IntegrityError> {
        ctx.check(partitions)?;
        let arity = element_type.node_count();
        let mut block = ElementBlock::new(element_type);
        let mut global = vec![0; arity];

        for &pos in &ctx.order {
            let p = &partitions[pos];
            let table = &ctx.local_to_global[pos];
            for local_block in p.elements.iter().filter(|b| b.element_type == element_type) {
                let len = local_block.connectivity.len();
                if len % arity != 0 {
                    return Err(IntegrityError::ArityMismatch {
                        rank: p.rank,
                        element_type,
                        len,
                        arity,
                    });
                }
                let count = len / arity;
                for flags in [local_block.ownership.len(), local_block.boundary.len()] {
                    if flags != count {
                        return Err(IntegrityError::ElementFlags {
                            rank: p.rank,
                            element_type,
                            elements: count,
                            flags,
                        });
                    }
                }

                for (element, (local_nodes, ownership, boundary)) in izip!(
                    local_block.connectivity.chunks_exact(arity),
                    &local_block.ownership,
                    &local_block.boundary
                )
                .enumerate()
                {
                    if !ownership.is_owned() {
                        continue;
                    }
                    for (g, l) in izip!(global.iter_mut(), local_nodes) {
                        *g = *table.get(*l).ok_or(IntegrityError::DanglingReference {
                            rank: p.rank,
                            element_type,
                            element,
                            local_index: *l,
                            node_count: table.len(),
                        })?;
                    }
                    block.push(&global, *boundary, (p.rank, element));
                }
            }
        }
        Ok(block)
    }

    /// Merge coordinates and the connectivity of every element type
    pub fn merge<T: RealScalar>(
        ctx: &MergeContext,
        partitions: &[Partition<T>],
    ) -> Result<MergedMesh<T>, IntegrityError> {
        let (nodes, coordinates) = Self::merge_coordinates(ctx, partitions)?;
        let blocks = ElementType::ALL
            .into_iter()
            .map(|t| Self::merge_connectivity(ctx, partitions, t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MergedMesh::new(
            ctx.gdim,
            nodes,
            coordinates,
            blocks,
            ctx.total_local_nodes,
        ))
    }
}
