//! In-process gather over channels
use crate::{
    error::ParticipationError, partition::Partition, traits::Gather, types::RealScalar,
};
use itertools::Itertools;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SendError, Sender};
use std::time::{Duration, Instant};
use tracing::debug;

/// Handle used by a worker thread to report its partition of one zone
#[derive(Debug)]
pub struct PartitionSender<T: RealScalar> {
    zone: usize,
    sender: Sender<(usize, Partition<T>)>,
}

impl<T: RealScalar> Clone for PartitionSender<T> {
    fn clone(&self) -> Self {
        Self {
            zone: self.zone,
            sender: self.sender.clone(),
        }
    }
}

impl<T: RealScalar> PartitionSender<T> {
    /// Zone this sender reports to
    pub fn zone(&self) -> usize {
        self.zone
    }

    /// Report a partition for the output request with number `sequence`
    ///
    /// Requests are numbered from 0. A partition that arrives after its request has ended is
    /// discarded. Fails if the gather has been dropped.
    pub fn send(
        &self,
        sequence: usize,
        partition: Partition<T>,
    ) -> Result<(), SendError<(usize, Partition<T>)>> {
        self.sender.send((sequence, partition))
    }
}

/// Gather that receives partitions from worker threads
///
/// Each gather of a zone blocks until every expected rank has reported once, or until the
/// timeout elapses. Partitions are tagged with the number of the request they belong to, so a
/// rank that missed one request cannot leak its late partition into the next.
#[derive(Debug)]
pub struct ChannelGather<T: RealScalar> {
    receivers: Vec<Receiver<(usize, Partition<T>)>>,
    expected: Vec<usize>,
    timeout: Duration,
    sequence: Option<usize>,
    early: Vec<Vec<(usize, Partition<T>)>>,
}

impl<T: RealScalar> ChannelGather<T> {
    /// Create a gather and one sender per zone
    ///
    /// `expected[z]` is the number of partitions of zone `z`. They must report ranks
    /// `0..expected[z]`.
    pub fn new(expected: Vec<usize>, timeout: Duration) -> (Self, Vec<PartitionSender<T>>) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..expected.len())
            .map(|zone| {
                let (sender, receiver) = mpsc::channel();
                (PartitionSender { zone, sender }, receiver)
            })
            .unzip();
        let zones = expected.len();
        (
            Self {
                receivers,
                expected,
                timeout,
                sequence: None,
                early: (0..zones).map(|_| vec![]).collect(),
            },
            senders,
        )
    }

    /// Timeout of each gather
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of the current request
    pub fn sequence(&self) -> usize {
        self.sequence.unwrap_or(0)
    }
}

/// Place a partition in its rank's slot
fn accept<T: RealScalar>(
    received: &mut [Option<Partition<T>>],
    zone: usize,
    partition: Partition<T>,
) -> Result<(), ParticipationError> {
    let rank = partition.rank();
    let expected = received.len();
    let Some(slot) = received.get_mut(rank) else {
        return Err(ParticipationError::UnexpectedRank {
            zone,
            rank,
            expected,
        });
    };
    if slot.is_some() {
        return Err(ParticipationError::DuplicateRank { zone, rank });
    }
    *slot = Some(partition);
    Ok(())
}

/// Ranks that have not reported yet
fn missing<T: RealScalar>(received: &[Option<Partition<T>>]) -> Vec<usize> {
    received.iter().positions(|p| p.is_none()).collect()
}

impl<T: RealScalar> Gather<T> for ChannelGather<T> {
    fn zone_count(&self) -> usize {
        self.receivers.len()
    }

    fn is_root(&self) -> bool {
        true
    }

    fn begin_request(&mut self) {
        self.sequence = Some(self.sequence.map_or(0, |s| s + 1));
    }

    fn gather(&mut self, zone: usize) -> Result<Option<Vec<Partition<T>>>, ParticipationError> {
        let zones = self.receivers.len();
        let (Some(receiver), Some(&expected)) = (self.receivers.get(zone), self.expected.get(zone))
        else {
            return Err(ParticipationError::UnknownZone { zone, zones });
        };
        if expected == 0 {
            return Err(ParticipationError::Empty { zone });
        }

        let sequence = self.sequence();
        let mut received = (0..expected).map(|_| None).collect_vec();
        let mut pending = std::mem::take(&mut self.early[zone]);
        pending.retain(|(s, _)| *s >= sequence);
        let (current, later): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|(s, _)| *s == sequence);
        self.early[zone] = later;
        for (_, partition) in current {
            accept(&mut received, zone, partition)?;
        }

        let deadline = Instant::now() + self.timeout;
        while received.iter().any(Option::is_none) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining) {
                Ok((s, partition)) if s == sequence => {
                    accept(&mut received, zone, partition)?;
                }
                Ok((s, partition)) if s < sequence => {
                    debug!(
                        zone,
                        rank = partition.rank(),
                        sequence = s,
                        "discarded partition of an earlier request"
                    );
                }
                Ok(early) => self.early[zone].push(early),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ParticipationError::Timeout {
                        zone,
                        missing: missing(&received),
                        timeout_ms: self.timeout.as_millis(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ParticipationError::Disconnected {
                        zone,
                        missing: missing(&received),
                    });
                }
            }
        }
        debug!(zone, partitions = expected, "gathered zone");
        Ok(Some(received.into_iter().flatten().collect()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        partition::FieldLayout,
        shapes::{unit_square_partitions, unit_square_partitions_with},
    };
    use std::thread;

    #[test]
    fn test_threads_report_in_any_order() {
        let (mut gather, senders) = ChannelGather::new(vec![3], Duration::from_secs(10));
        let handles = unit_square_partitions::<f64>(3, 3)
            .into_iter()
            .rev()
            .map(|p| {
                let sender = senders[0].clone();
                thread::spawn(move || sender.send(0, p).unwrap())
            })
            .collect::<Vec<_>>();
        let partitions = gather.gather(0).unwrap().unwrap();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(
            partitions.iter().map(|p| p.rank()).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_timeout_lists_missing_ranks() {
        let (mut gather, senders) = ChannelGather::new(vec![3], Duration::from_millis(50));
        let mut partitions = unit_square_partitions::<f64>(3, 3);
        senders[0].send(0, partitions.remove(1)).unwrap();
        assert_eq!(
            gather.gather(0),
            Err(ParticipationError::Timeout {
                zone: 0,
                missing: vec![0, 2],
                timeout_ms: 50
            })
        );
    }

    #[test]
    fn test_disconnected() {
        let (mut gather, senders) = ChannelGather::<f64>::new(vec![2], Duration::from_secs(10));
        drop(senders);
        assert_eq!(
            gather.gather(0),
            Err(ParticipationError::Disconnected {
                zone: 0,
                missing: vec![0, 1]
            })
        );
    }

    #[test]
    fn test_unexpected_and_duplicate_rank() {
        let (mut gather, senders) = ChannelGather::new(vec![2, 2], Duration::from_secs(10));
        let partitions = unit_square_partitions::<f64>(3, 3);
        senders[0].send(0, partitions[2].clone()).unwrap();
        assert_eq!(
            gather.gather(0),
            Err(ParticipationError::UnexpectedRank {
                zone: 0,
                rank: 2,
                expected: 2
            })
        );
        senders[1].send(0, partitions[1].clone()).unwrap();
        senders[1].send(0, partitions[1].clone()).unwrap();
        assert_eq!(
            gather.gather(1),
            Err(ParticipationError::DuplicateRank { zone: 1, rank: 1 })
        );
    }

    #[test]
    fn test_late_partition_does_not_leak_into_next_request() {
        let (mut gather, senders) = ChannelGather::new(vec![2], Duration::from_millis(50));
        let first = unit_square_partitions::<f64>(3, 2);
        let second = unit_square_partitions_with::<f64>(
            3,
            2,
            &FieldLayout::new(["Density", "Energy"], 2),
            |_| vec![7.0, 7.0],
        );

        // Rank 1 misses the first request and reports late
        gather.begin_request();
        senders[0].send(0, first[0].clone()).unwrap();
        assert_eq!(
            gather.gather(0),
            Err(ParticipationError::Timeout {
                zone: 0,
                missing: vec![1],
                timeout_ms: 50
            })
        );
        senders[0].send(0, first[1].clone()).unwrap();

        // The second request sees only its own partitions
        gather.begin_request();
        assert_eq!(gather.sequence(), 1);
        senders[0].send(1, second[1].clone()).unwrap();
        senders[0].send(1, second[0].clone()).unwrap();
        let partitions = gather.gather(0).unwrap().unwrap();
        assert_eq!(
            partitions.iter().map(|p| p.rank()).collect::<Vec<_>>(),
            vec![0, 1]
        );
        for p in &partitions {
            assert!(p.fields().iter().all(|v| *v == 7.0));
        }
    }

    #[test]
    fn test_partition_for_a_later_request_is_kept() {
        let (mut gather, senders) = ChannelGather::new(vec![1], Duration::from_millis(50));
        let partition = unit_square_partitions::<f64>(3, 1).remove(0);
        gather.begin_request();
        senders[0].send(1, partition).unwrap();
        assert_eq!(
            gather.gather(0),
            Err(ParticipationError::Timeout {
                zone: 0,
                missing: vec![0],
                timeout_ms: 50
            })
        );
        gather.begin_request();
        let partitions = gather.gather(0).unwrap().unwrap();
        assert_eq!(partitions.len(), 1);
    }
}
