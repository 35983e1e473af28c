//! Gathering partitions onto the aggregation point
use crate::{error::ParticipationError, partition::Partition, types::RealScalar};

pub trait Gather<T: RealScalar> {
    //! Collective barrier that funnels the partitions of one zone onto the aggregation point

    /// Number of zones
    fn zone_count(&self) -> usize;

    /// Is this process the aggregation point?
    fn is_root(&self) -> bool;

    /// Start a new output request
    ///
    /// Called once before the zones of each request are gathered.
    fn begin_request(&mut self) {}

    /// Gather the partitions of a zone
    ///
    /// Returns `None` on every process except the aggregation point. Returns an error if not
    /// every expected partition reported. The merge must not start in that case.
    fn gather(&mut self, zone: usize) -> Result<Option<Vec<Partition<T>>>, ParticipationError>;
}
