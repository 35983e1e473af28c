//! Partitions
//!
//! A partition is the slice of the domain held by one worker, including halo copies of nodes
//! owned by neighbouring workers. The merge engine treats partitions as immutable input.
use crate::types::{ElementType, Ownership, RealScalar};

/// Names of the per-node fields carried by a partition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldLayout {
    names: Vec<String>,
    conserved: usize,
}

impl FieldLayout {
    /// Create new
    ///
    /// The first `conserved` names are the conserved variables. Derived quantities are evaluated
    /// from these.
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>, conserved: usize) -> Self {
        Self {
            names: names.into_iter().map(|n| n.into()).collect(),
            conserved,
        }
    }
    /// Field names
    pub fn names(&self) -> &[String] {
        &self.names
    }
    /// Number of fields per node
    pub fn width(&self) -> usize {
        self.names.len()
    }
    /// Number of conserved variables
    pub fn conserved(&self) -> usize {
        self.conserved
    }
}

/// Local elements of one type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalElementBlock {
    pub(crate) element_type: ElementType,
    pub(crate) connectivity: Vec<usize>,
    pub(crate) ownership: Vec<Ownership>,
    pub(crate) boundary: Vec<bool>,
}

impl LocalElementBlock {
    /// Create new
    pub fn new(
        element_type: ElementType,
        connectivity: Vec<usize>,
        ownership: Vec<Ownership>,
        boundary: Vec<bool>,
    ) -> Self {
        Self {
            element_type,
            connectivity,
            ownership,
            boundary,
        }
    }
    /// Element type
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }
    /// Local node indices of all elements
    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }
    /// Ownership of each element
    pub fn ownership(&self) -> &[Ownership] {
        &self.ownership
    }
    /// Boundary flag of each element
    pub fn boundary(&self) -> &[bool] {
        &self.boundary
    }
    /// Number of elements
    pub fn len(&self) -> usize {
        self.ownership.len()
    }
    /// Is the block empty?
    pub fn is_empty(&self) -> bool {
        self.ownership.is_empty()
    }
}

/// One worker's part of the domain
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Partition<T: RealScalar> {
    pub(crate) rank: usize,
    pub(crate) gdim: usize,
    pub(crate) coordinates: Vec<T>,
    pub(crate) global_ids: Vec<usize>,
    pub(crate) ownership: Vec<Ownership>,
    pub(crate) boundary: Vec<bool>,
    pub(crate) elements: Vec<LocalElementBlock>,
    pub(crate) layout: FieldLayout,
    pub(crate) fields: Vec<T>,
}

impl<T: RealScalar> Partition<T> {
    /// Create a partition from raw arrays
    ///
    /// The arrays are not checked here. Inconsistent arrays are reported as integrity errors
    /// when the partition is merged.
    #[allow(clippy::too_many_arguments)]
    pub fn from_raw_parts(
        rank: usize,
        gdim: usize,
        coordinates: Vec<T>,
        global_ids: Vec<usize>,
        ownership: Vec<Ownership>,
        boundary: Vec<bool>,
        elements: Vec<LocalElementBlock>,
        layout: FieldLayout,
        fields: Vec<T>,
    ) -> Self {
        Self {
            rank,
            gdim,
            coordinates,
            global_ids,
            ownership,
            boundary,
            elements,
            layout,
            fields,
        }
    }
    /// Rank of the worker that holds this partition
    pub fn rank(&self) -> usize {
        self.rank
    }
    /// Geometric dimension
    pub fn gdim(&self) -> usize {
        self.gdim
    }
    /// Number of local nodes, including halo copies
    pub fn node_count(&self) -> usize {
        self.global_ids.len()
    }
    /// Number of owned nodes
    pub fn owned_node_count(&self) -> usize {
        self.ownership.iter().filter(|o| o.is_owned()).count()
    }
    /// Coordinates of a local node
    pub fn coords(&self, local_index: usize) -> &[T] {
        &self.coordinates[local_index * self.gdim..(local_index + 1) * self.gdim]
    }
    /// Global identifiers of the local nodes
    pub fn global_ids(&self) -> &[usize] {
        &self.global_ids
    }
    /// Ownership of the local nodes
    pub fn ownership(&self) -> &[Ownership] {
        &self.ownership
    }
    /// Boundary flags of the local nodes
    pub fn boundary(&self) -> &[bool] {
        &self.boundary
    }
    /// Element blocks
    pub fn elements(&self) -> &[LocalElementBlock] {
        &self.elements
    }
    /// Element block of a given type
    pub fn element_block(&self, element_type: ElementType) -> Option<&LocalElementBlock> {
        self.elements
            .iter()
            .find(|b| b.element_type == element_type)
    }
    /// Field layout
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }
    /// Field values of a local node
    pub fn values(&self, local_index: usize) -> &[T] {
        let w = self.layout.width();
        &self.fields[local_index * w..(local_index + 1) * w]
    }
    /// All field values
    pub fn fields(&self) -> &[T] {
        &self.fields
    }
}

/// Builder for a partition
#[derive(Debug)]
pub struct PartitionBuilder<T: RealScalar> {
    rank: usize,
    gdim: usize,
    coordinates: Vec<T>,
    global_ids: Vec<usize>,
    ownership: Vec<Ownership>,
    boundary: Vec<bool>,
    elements: Vec<LocalElementBlock>,
    layout: FieldLayout,
    fields: Vec<T>,
}

impl<T: RealScalar> PartitionBuilder<T> {
    /// Create a new partition builder
    pub fn new(rank: usize, gdim: usize, layout: FieldLayout) -> Self {
        Self {
            rank,
            gdim,
            coordinates: vec![],
            global_ids: vec![],
            ownership: vec![],
            boundary: vec![],
            elements: vec![],
            layout,
            fields: vec![],
        }
    }

    /// Add a node and return its local index
    pub fn add_node(
        &mut self,
        global_id: usize,
        coords: &[T],
        ownership: Ownership,
        values: &[T],
    ) -> usize {
        let index = self.global_ids.len();
        self.global_ids.push(global_id);
        self.coordinates.extend_from_slice(coords);
        self.ownership.push(ownership);
        self.boundary.push(false);
        self.fields.extend_from_slice(values);
        index
    }

    /// Flag a local node as lying on the boundary
    pub fn mark_boundary_node(&mut self, local_index: usize) {
        self.boundary[local_index] = true;
    }

    /// Add an element and return its index within the element block of its type
    pub fn add_element(
        &mut self,
        element_type: ElementType,
        nodes: &[usize],
        ownership: Ownership,
        boundary: bool,
    ) -> usize {
        let i = match self
            .elements
            .iter()
            .position(|b| b.element_type == element_type)
        {
            Some(i) => i,
            None => {
                self.elements.push(LocalElementBlock::new(
                    element_type,
                    vec![],
                    vec![],
                    vec![],
                ));
                self.elements.len() - 1
            }
        };
        let block = &mut self.elements[i];
        block.connectivity.extend_from_slice(nodes);
        block.ownership.push(ownership);
        block.boundary.push(boundary);
        block.ownership.len() - 1
    }

    /// Number of nodes added so far
    pub fn node_count(&self) -> usize {
        self.global_ids.len()
    }

    /// Create the partition
    pub fn build(self) -> Partition<T> {
        Partition::from_raw_parts(
            self.rank,
            self.gdim,
            self.coordinates,
            self.global_ids,
            self.ownership,
            self.boundary,
            self.elements,
            self.layout,
            self.fields,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builder() {
        let mut b = PartitionBuilder::<f64>::new(1, 2, FieldLayout::new(["Density"], 1));
        let n0 = b.add_node(7, &[0.0, 0.0], Ownership::Owned, &[1.0]);
        let n1 = b.add_node(3, &[1.0, 0.0], Ownership::Ghost(0, 4), &[2.0]);
        let n2 = b.add_node(9, &[0.0, 1.0], Ownership::Owned, &[3.0]);
        b.mark_boundary_node(n1);
        assert_eq!(
            b.add_element(ElementType::Triangle, &[n0, n1, n2], Ownership::Owned, false),
            0
        );
        assert_eq!(
            b.add_element(ElementType::Line, &[n0, n1], Ownership::Owned, true),
            0
        );
        let p = b.build();

        assert_eq!(p.rank(), 1);
        assert_eq!(p.node_count(), 3);
        assert_eq!(p.owned_node_count(), 2);
        assert_eq!(p.coords(1), &[1.0, 0.0]);
        assert_eq!(p.values(2), &[3.0]);
        assert_eq!(p.boundary(), &[false, true, false]);
        assert_eq!(p.elements().len(), 2);
        let lines = p.element_block(ElementType::Line).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.boundary(), &[true]);
        assert!(p.element_block(ElementType::Quadrilateral).is_none());
    }
}
