//! Format writers
mod atomic;
mod gmsh;
#[cfg(feature = "serde")]
mod restart;
mod surface_csv;
mod tecplot;

pub(crate) use atomic::{commit_all, stage};
pub use gmsh::GmshWriter;
#[cfg(feature = "serde")]
pub use restart::{read_restart, RestartBlock, RestartData, RestartWriter};
pub use surface_csv::SurfaceCsvWriter;
pub use tecplot::TecplotWriter;
