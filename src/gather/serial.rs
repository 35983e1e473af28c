//! Single process gather
use crate::{
    error::ParticipationError, partition::Partition, traits::Gather, types::RealScalar,
};

/// Gather for partitions that are already held by the aggregation point
#[derive(Debug)]
pub struct SerialGather<T: RealScalar> {
    zones: Vec<Vec<Partition<T>>>,
}

impl<T: RealScalar> SerialGather<T> {
    /// Create a gather for a number of zones
    pub fn new(zone_count: usize) -> Self {
        Self {
            zones: (0..zone_count).map(|_| vec![]).collect(),
        }
    }

    /// Hand over a partition for the next gather of a zone
    pub fn submit(
        &mut self,
        zone: usize,
        partition: Partition<T>,
    ) -> Result<(), ParticipationError> {
        let zones = self.zones.len();
        let pending = self
            .zones
            .get_mut(zone)
            .ok_or(ParticipationError::UnknownZone { zone, zones })?;
        if pending.iter().any(|p| p.rank() == partition.rank()) {
            return Err(ParticipationError::DuplicateRank {
                zone,
                rank: partition.rank(),
            });
        }
        pending.push(partition);
        Ok(())
    }
}

impl<T: RealScalar> Gather<T> for SerialGather<T> {
    fn zone_count(&self) -> usize {
        self.zones.len()
    }

    fn is_root(&self) -> bool {
        true
    }

    fn gather(&mut self, zone: usize) -> Result<Option<Vec<Partition<T>>>, ParticipationError> {
        let zones = self.zones.len();
        let pending = self
            .zones
            .get_mut(zone)
            .ok_or(ParticipationError::UnknownZone { zone, zones })?;
        if pending.is_empty() {
            return Err(ParticipationError::Empty { zone });
        }
        Ok(Some(std::mem::take(pending)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::unit_square_partitions;

    #[test]
    fn test_serial_gather() {
        let mut gather = SerialGather::new(2);
        for p in unit_square_partitions::<f64>(2, 2) {
            gather.submit(1, p).unwrap();
        }
        assert_eq!(gather.gather(0), Err(ParticipationError::Empty { zone: 0 }));
        assert_eq!(gather.gather(1).unwrap().unwrap().len(), 2);
        // Partitions are handed over once
        assert_eq!(gather.gather(1), Err(ParticipationError::Empty { zone: 1 }));
        assert!(matches!(
            gather.gather(2),
            Err(ParticipationError::UnknownZone { zone: 2, zones: 2 })
        ));
    }

    #[test]
    fn test_duplicate_submit() {
        let mut gather = SerialGather::new(1);
        let p = unit_square_partitions::<f64>(2, 1).remove(0);
        gather.submit(0, p.clone()).unwrap();
        assert_eq!(
            gather.submit(0, p),
            Err(ParticipationError::DuplicateRank { zone: 0, rank: 0 })
        );
    }
}
