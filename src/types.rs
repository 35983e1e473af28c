//! Types

mod element_type;
mod format;
mod ownership;
pub use element_type::ElementType;
pub use format::{OutputFormat, ViewKind};
pub use ownership::Ownership;

use num::Float;
use std::fmt::{Debug, Display};

/// Scalar type used for coordinates and field values
pub trait RealScalar: Float + Debug + Display + Send + Sync + 'static {}

impl<T: Float + Debug + Display + Send + Sync + 'static> RealScalar for T {}
