//! Traits

mod derived;
mod gather;
mod writer;

pub use derived::DerivedQuantity;
pub use gather::Gather;
pub use writer::Writer;
