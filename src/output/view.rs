//! Views of merged zones handed to writers
use crate::{
    merge::{ElementBlock, MergedMesh, MergedSolution, Zone},
    types::{ElementType, RealScalar, ViewKind},
};
use itertools::Itertools;

/// A read-only view of one zone
#[derive(Debug, Clone, Copy)]
pub struct ZoneView<'a, T: RealScalar> {
    id: usize,
    kind: ViewKind,
    mesh: &'a MergedMesh<T>,
    solution: &'a MergedSolution<T>,
    volume_index: Option<&'a [usize]>,
}

impl<'a, T: RealScalar> ZoneView<'a, T> {
    /// Full view of a zone
    pub fn full(zone: &'a Zone<T>) -> Self {
        Self {
            id: zone.id(),
            kind: ViewKind::Full,
            mesh: zone.mesh(),
            solution: zone.solution(),
            volume_index: None,
        }
    }

    /// Boundary view of a zone
    pub fn surface(surface: &'a SurfaceZone<T>) -> Self {
        Self {
            id: surface.id,
            kind: ViewKind::Surface,
            mesh: &surface.mesh,
            solution: &surface.solution,
            volume_index: Some(&surface.volume_index),
        }
    }

    /// Zone identifier
    pub fn id(&self) -> usize {
        self.id
    }
    /// Which view this is
    pub fn kind(&self) -> ViewKind {
        self.kind
    }
    /// Mesh
    pub fn mesh(&self) -> &'a MergedMesh<T> {
        self.mesh
    }
    /// Solution
    pub fn solution(&self) -> &'a MergedSolution<T> {
        self.solution
    }
    /// Index in the full mesh of a node of this view
    pub fn volume_index(&self, index: usize) -> usize {
        self.volume_index.map_or(index, |v| v[index])
    }
}

/// The boundary of a zone, renumbered compactly
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceZone<T: RealScalar> {
    id: usize,
    mesh: MergedMesh<T>,
    solution: MergedSolution<T>,
    volume_index: Vec<usize>,
}

impl<T: RealScalar> SurfaceZone<T> {
    /// Extract the boundary of a zone
    ///
    /// Contains every boundary element, and every node that is flagged as a boundary node or
    /// is used by a boundary element. Nodes keep their relative order.
    pub fn extract(zone: &Zone<T>) -> Self {
        let mesh = zone.mesh();
        let solution = zone.solution();

        let mut keep = mesh.nodes().iter().map(|n| n.boundary).collect_vec();
        for element in mesh.elements().filter(|e| e.boundary) {
            for n in element.nodes {
                keep[*n] = true;
            }
        }
        let volume_index = keep.iter().positions(|k| *k).collect_vec();
        let mut new_index = vec![usize::MAX; mesh.node_count()];
        for (i, v) in volume_index.iter().enumerate() {
            new_index[*v] = i;
        }

        let gdim = mesh.gdim();
        let mut nodes = Vec::with_capacity(volume_index.len());
        let mut coordinates = Vec::with_capacity(volume_index.len() * gdim);
        let mut values = Vec::with_capacity(volume_index.len() * solution.width());
        for v in &volume_index {
            nodes.push(*mesh.node(*v));
            coordinates.extend_from_slice(mesh.position(*v));
            values.extend_from_slice(solution.values(*v));
        }

        let mut renumbered = Vec::with_capacity(8);
        let blocks = mesh
            .blocks()
            .iter()
            .map(|b| {
                let mut block = ElementBlock::new(b.element_type());
                for (element, owner) in b.iter().zip(b.owners()) {
                    if element.boundary {
                        renumbered.clear();
                        renumbered.extend(element.nodes.iter().map(|n| new_index[*n]));
                        block.push(&renumbered, true, *owner);
                    }
                }
                block
            })
            .collect_vec();

        Self {
            id: zone.id(),
            mesh: MergedMesh::new(gdim, nodes, coordinates, blocks, volume_index.len()),
            solution: MergedSolution::new(solution.names().to_vec(), solution.conserved(), values),
            volume_index,
        }
    }

    /// Zone identifier
    pub fn id(&self) -> usize {
        self.id
    }
    /// Boundary mesh
    pub fn mesh(&self) -> &MergedMesh<T> {
        &self.mesh
    }
    /// Solution at the boundary nodes
    pub fn solution(&self) -> &MergedSolution<T> {
        &self.solution
    }
    /// Index in the full mesh of each boundary node
    pub fn volume_indices(&self) -> &[usize] {
        &self.volume_index
    }
    /// Number of boundary elements of a type
    pub fn element_count(&self, element_type: ElementType) -> usize {
        self.mesh.element_count(element_type)
    }
}
