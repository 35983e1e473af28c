//! Ownership

/// Ownership
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ownership {
    /// Owned by the current partition
    Owned,
    /// Halo copy on the current partition. The two values are the rank of the partition that owns this and the local index on that partition
    Ghost(usize, usize),
}

impl Ownership {
    /// Is this entity owned by the partition that reports it?
    pub fn is_owned(&self) -> bool {
        matches!(self, Ownership::Owned)
    }
}
