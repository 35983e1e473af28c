//! Partitioned example meshes
//!
//! Structured meshes split into horizontal strips, one strip per rank. Nodes on the border
//! between two strips are owned by the upper strip and copied as halo nodes into the lower one.

mod cube;
mod partitioned;
mod square;

pub use cube::{unit_cube_partitions, unit_cube_partitions_with};
pub use square::{unit_square_partitions, unit_square_partitions_with};
