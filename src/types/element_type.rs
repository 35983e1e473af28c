//! Element types
use ndelement::{reference_cell, types::ReferenceCellType};

/// The type of a mesh element
///
/// Each variant has a fixed number of nodes. Nodes are ordered following the VTK convention.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ElementType {
    /// Line segment
    Line,
    /// Triangle
    Triangle,
    /// Quadrilateral
    Quadrilateral,
    /// Tetrahedron
    Tetrahedron,
    /// Hexahedron
    Hexahedron,
    /// Wedge (triangular prism)
    Wedge,
    /// Pyramid with a quadrilateral base
    Pyramid,
}

impl ElementType {
    /// All element types, in the order in which merged element blocks are stored
    pub const ALL: [ElementType; 7] = [
        ElementType::Line,
        ElementType::Triangle,
        ElementType::Quadrilateral,
        ElementType::Tetrahedron,
        ElementType::Hexahedron,
        ElementType::Wedge,
        ElementType::Pyramid,
    ];

    /// Number of nodes of an element of this type
    pub const fn node_count(self) -> usize {
        match self {
            ElementType::Line => 2,
            ElementType::Triangle => 3,
            ElementType::Quadrilateral => 4,
            ElementType::Tetrahedron => 4,
            ElementType::Hexahedron => 8,
            ElementType::Wedge => 6,
            ElementType::Pyramid => 5,
        }
    }

    /// VTK cell identifier
    pub const fn vtk_id(self) -> u8 {
        match self {
            ElementType::Line => 3,
            ElementType::Triangle => 5,
            ElementType::Quadrilateral => 9,
            ElementType::Tetrahedron => 10,
            ElementType::Hexahedron => 12,
            ElementType::Wedge => 13,
            ElementType::Pyramid => 14,
        }
    }

    /// Element type from a VTK cell identifier
    pub fn from_vtk_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.vtk_id() == id)
    }

    /// Gmsh element identifier
    ///
    /// Gmsh orders the nodes of first order elements the same way as VTK.
    pub const fn gmsh_id(self) -> usize {
        match self {
            ElementType::Line => 1,
            ElementType::Triangle => 2,
            ElementType::Quadrilateral => 3,
            ElementType::Tetrahedron => 4,
            ElementType::Hexahedron => 5,
            ElementType::Wedge => 6,
            ElementType::Pyramid => 7,
        }
    }

    /// The reference cell of this element type
    pub fn reference_cell(self) -> ReferenceCellType {
        match self {
            ElementType::Line => ReferenceCellType::Interval,
            ElementType::Triangle => ReferenceCellType::Triangle,
            ElementType::Quadrilateral => ReferenceCellType::Quadrilateral,
            ElementType::Tetrahedron => ReferenceCellType::Tetrahedron,
            ElementType::Hexahedron => ReferenceCellType::Hexahedron,
            ElementType::Wedge => ReferenceCellType::Prism,
            ElementType::Pyramid => ReferenceCellType::Pyramid,
        }
    }

    /// Topological dimension
    pub fn topology_dim(self) -> usize {
        reference_cell::dim(self.reference_cell())
    }

    /// Name used in log messages and file headers
    pub const fn name(self) -> &'static str {
        match self {
            ElementType::Line => "line",
            ElementType::Triangle => "triangle",
            ElementType::Quadrilateral => "quadrilateral",
            ElementType::Tetrahedron => "tetrahedron",
            ElementType::Hexahedron => "hexahedron",
            ElementType::Wedge => "wedge",
            ElementType::Pyramid => "pyramid",
        }
    }
}

impl From<ElementType> for ReferenceCellType {
    fn from(t: ElementType) -> Self {
        t.reference_cell()
    }
}

impl TryFrom<ReferenceCellType> for ElementType {
    type Error = ReferenceCellType;
    fn try_from(cell: ReferenceCellType) -> Result<Self, ReferenceCellType> {
        ElementType::ALL
            .into_iter()
            .find(|t| t.reference_cell() == cell)
            .ok_or(cell)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
