//! Derived quantities
use crate::types::RealScalar;

pub trait DerivedQuantity<T: RealScalar> {
    //! A scalar computed from the conserved state at a single node
    //!
    //! Implementations must be pure: the value may only depend on the conserved slice passed in.

    /// Field name of the quantity
    fn name(&self) -> &str;

    /// Evaluate the quantity from the conserved variables of one node
    fn evaluate(&self, conserved: &[T]) -> T;
}

