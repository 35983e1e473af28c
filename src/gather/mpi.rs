//! Gather over MPI
use crate::{
    error::ParticipationError, partition::Partition, traits::Gather, types::RealScalar,
};
use mpi::{
    point_to_point::{Destination, Source},
    traits::Communicator,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

/// Gather that sends the partitions of every process to a root process
///
/// Every process holds one partition per zone. Partitions are encoded as RON and sent to the
/// root, which receives them in rank order. The rank of each partition must equal the rank of
/// the process that holds it.
pub struct MpiGather<'a, T: RealScalar, C: Communicator> {
    comm: &'a C,
    root: i32,
    local: Vec<Option<Partition<T>>>,
}

impl<'a, T: RealScalar, C: Communicator> MpiGather<'a, T, C> {
    /// Create a gather
    ///
    /// `local[z]` is the partition of zone `z` held by this process.
    pub fn new(comm: &'a C, root: i32, local: Vec<Partition<T>>) -> Self {
        Self {
            comm,
            root,
            local: local.into_iter().map(Some).collect(),
        }
    }

    /// The communicator
    pub fn comm(&self) -> &C {
        self.comm
    }
}

impl<T: RealScalar + Serialize + DeserializeOwned, C: Communicator> Gather<T>
    for MpiGather<'_, T, C>
{
    fn zone_count(&self) -> usize {
        self.local.len()
    }

    fn is_root(&self) -> bool {
        self.comm.rank() == self.root
    }

    fn gather(&mut self, zone: usize) -> Result<Option<Vec<Partition<T>>>, ParticipationError> {
        let zones = self.local.len();
        let partition = self
            .local
            .get_mut(zone)
            .ok_or(ParticipationError::UnknownZone { zone, zones })?
            .take()
            .ok_or(ParticipationError::Empty { zone })?;
        let rank = self.comm.rank();
        let size = self.comm.size();

        if rank != self.root {
            // The root waits for every rank, so a partition that cannot be encoded is sent as
            // an empty buffer, which the root reports as malformed
            let encoded = ron::to_string(&partition);
            let bytes = encoded.as_deref().unwrap_or_default();
            self.comm
                .process_at_rank(self.root)
                .send(bytes.as_bytes());
            return encoded
                .map(|_| None)
                .map_err(|e| ParticipationError::Malformed {
                    zone,
                    rank: rank as usize,
                    reason: e.to_string(),
                });
        }

        let comm = self.comm;
        let partitions = receive_all(zone, size as usize, self.root as usize, partition, |p| {
            comm.process_at_rank(p as i32).receive_vec::<u8>().0
        })?;
        debug!(zone, partitions = partitions.len(), "gathered zone over MPI");
        Ok(Some(partitions))
    }
}

/// Decode a partition received from rank `p`
fn decode<T: RealScalar + DeserializeOwned>(
    zone: usize,
    p: usize,
    bytes: Vec<u8>,
) -> Result<Partition<T>, ParticipationError> {
    let malformed = |reason: String| ParticipationError::Malformed {
        zone,
        rank: p,
        reason,
    };
    let s = String::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
    ron::from_str::<Partition<T>>(&s).map_err(|e| malformed(e.to_string()))
}

/// Receive the partition of every rank in rank order
///
/// Every rank is received even after a failure so that no sender is left blocked. The first
/// failure is returned.
fn receive_all<T: RealScalar + DeserializeOwned>(
    zone: usize,
    size: usize,
    root: usize,
    local: Partition<T>,
    mut receive: impl FnMut(usize) -> Vec<u8>,
) -> Result<Vec<Partition<T>>, ParticipationError> {
    let mut local = Some(local);
    let mut partitions = Vec::with_capacity(size);
    let mut error = None;
    for p in 0..size {
        let received = if p == root {
            local.take().ok_or(ParticipationError::Empty { zone })
        } else {
            decode(zone, p, receive(p))
        };
        let received = received.and_then(|partition| {
            if partition.rank() == p {
                Ok(partition)
            } else {
                Err(ParticipationError::UnexpectedRank {
                    zone,
                    rank: partition.rank(),
                    expected: size,
                })
            }
        });
        match received {
            Ok(partition) => partitions.push(partition),
            Err(e) => {
                debug!(zone, rank = p, "could not receive partition: {e}");
                error.get_or_insert(e);
            }
        }
    }
    match error {
        Some(e) => Err(e),
        None => Ok(partitions),
    }
}
