//! Gathering partitions onto the aggregation point
mod channel;
#[cfg(feature = "mpi")]
mod mpi;
mod serial;

pub use channel::{ChannelGather, PartitionSender};
#[cfg(feature = "mpi")]
pub use mpi::MpiGather;
pub use serial::SerialGather;
