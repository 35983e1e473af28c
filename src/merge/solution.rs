//! Solution merge
use super::MergeContext;
use crate::{
    error::IntegrityError, partition::Partition, traits::DerivedQuantity, types::RealScalar,
};
use itertools::izip;
use num::NumCast;
use tracing::{debug, warn};

/// Field values of every global node of one zone
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSolution<T: RealScalar> {
    names: Vec<String>,
    conserved: usize,
    values: Vec<T>,
    halo_mismatches: usize,
}

impl<T: RealScalar> MergedSolution<T> {
    /// Create new
    pub fn new(names: Vec<String>, conserved: usize, values: Vec<T>) -> Self {
        debug_assert!(names.is_empty() || values.len() % names.len() == 0);
        Self {
            names,
            conserved,
            values,
            halo_mismatches: 0,
        }
    }
    /// Field names, gathered fields first followed by derived quantities
    pub fn names(&self) -> &[String] {
        &self.names
    }
    /// Number of values per node
    pub fn width(&self) -> usize {
        self.names.len()
    }
    /// Number of conserved variables at the start of each tuple
    pub fn conserved(&self) -> usize {
        self.conserved
    }
    /// Number of nodes
    pub fn node_count(&self) -> usize {
        if self.names.is_empty() {
            0
        } else {
            self.values.len() / self.names.len()
        }
    }
    /// Values at a global node
    pub fn values(&self, index: usize) -> &[T] {
        let w = self.width();
        &self.values[index * w..(index + 1) * w]
    }
    /// All values, node by node
    pub fn data(&self) -> &[T] {
        &self.values
    }
    /// Position of a field in each tuple
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
    /// Iterate through the values of one field
    pub fn field(&self, name: &str) -> Option<impl Iterator<Item = T> + '_> {
        let i = self.field_index(name)?;
        Some(self.values.chunks_exact(self.width()).map(move |v| v[i]))
    }
    /// Number of halo copies that disagreed with their owner
    ///
    /// Always zero unless the solution was merged with a halo check.
    pub fn halo_mismatches(&self) -> usize {
        self.halo_mismatches
    }
}

/// Merges the per-node field values of a set of partitions
#[derive(Debug, Clone, Default)]
pub struct SolutionMerger {
    halo_tolerance: Option<f64>,
}

impl SolutionMerger {
    /// Create a merger that ignores halo copies
    pub fn new() -> Self {
        Self {
            halo_tolerance: None,
        }
    }

    /// Create a merger that compares halo copies to their owners
    ///
    /// Values whose relative difference exceeds `tolerance` are logged and counted. The value
    /// of the owner is always the one that is merged.
    pub fn with_halo_check(tolerance: f64) -> Self {
        Self {
            halo_tolerance: Some(tolerance),
        }
    }

    /// Merge the field values and append the derived quantities
    ///
    /// Derived quantities are evaluated once per node, in the order given, from the conserved
    /// variables of that node.
    pub fn merge_solution<T: RealScalar>(
        &self,
        ctx: &MergeContext,
        partitions: &[Partition<T>],
        derived: &[Box<dyn DerivedQuantity<T>>],
    ) -> Result<MergedSolution<T>, IntegrityError> {
        ctx.check(partitions)?;
        let Some(&first) = ctx.order.first() else {
            return Ok(MergedSolution::new(vec![], 0, vec![]));
        };
        let layout = &partitions[first].layout;
        let width = layout.width();
        let conserved = layout.conserved();
        if conserved > width {
            return Err(IntegrityError::ConservedCount {
                conserved,
                fields: width,
            });
        }
        for p in partitions {
            if p.layout != *layout {
                return Err(IntegrityError::FieldLayoutMismatch {
                    rank: p.rank,
                    expected: layout.names().to_vec(),
                    found: p.layout.names().to_vec(),
                });
            }
            if p.fields.len() != p.node_count() * width {
                return Err(IntegrityError::FieldWidth {
                    rank: p.rank,
                    nodes: p.node_count(),
                    width,
                    len: p.fields.len(),
                });
            }
        }

        let full_width = width + derived.len();
        let mut values = Vec::with_capacity(ctx.node_count() * full_width);
        for &(pos, local) in &ctx.owners {
            let v = partitions[pos].values(local);
            values.extend_from_slice(v);
            for d in derived {
                values.push(d.evaluate(&v[..conserved]));
            }
        }

        let mut names = layout.names().to_vec();
        names.extend(derived.iter().map(|d| d.name().to_string()));
        let mut solution = MergedSolution::new(names, conserved, values);

        if let Some(tolerance) = self.halo_tolerance {
            solution.halo_mismatches = Self::check_halos(ctx, partitions, &solution, tolerance);
        }
        debug!(
            nodes = solution.node_count(),
            width = solution.width(),
            derived = derived.len(),
            "merged solution"
        );
        Ok(solution)
    }

    fn check_halos<T: RealScalar>(
        ctx: &MergeContext,
        partitions: &[Partition<T>],
        solution: &MergedSolution<T>,
        tolerance: f64,
    ) -> usize {
        let tolerance = <T as NumCast>::from(tolerance).unwrap_or_else(T::epsilon);
        let width = partitions
            .first()
            .map_or(0, |p| p.layout.width());
        let mut mismatches = 0;
        for &pos in &ctx.order {
            let p = &partitions[pos];
            for (local, (ownership, global)) in
                izip!(&p.ownership, &ctx.local_to_global[pos]).enumerate()
            {
                if ownership.is_owned() {
                    continue;
                }
                let owner = &solution.values(*global)[..width];
                let halo = p.values(local);
                let differs = izip!(owner, halo).any(|(a, b)| {
                    let scale = a.abs().max(b.abs()).max(T::one());
                    (*a - *b).abs() > tolerance * scale
                });
                if differs {
                    warn!(
                        rank = p.rank,
                        local,
                        global_id = p.global_ids[local],
                        "halo copy disagrees with its owner: {halo:?} != {owner:?}"
                    );
                    mismatches += 1;
                }
            }
        }
        mismatches
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        merge::GeometryMerger,
        partition::{FieldLayout, PartitionBuilder},
        types::{ElementType, Ownership},
    };
    use approx::assert_relative_eq;

    struct Sum;

    impl DerivedQuantity<f64> for Sum {
        fn name(&self) -> &str {
            "Sum"
        }
        fn evaluate(&self, conserved: &[f64]) -> f64 {
            conserved.iter().sum()
        }
    }

    fn layout() -> FieldLayout {
        FieldLayout::new(["Density", "Energy", "Tag"], 2)
    }

    /// Rank 1 holds a halo copy of global node 2 with a different value
    fn partitions(halo_value: f64) -> Vec<Partition<f64>> {
        let mut b0 = PartitionBuilder::new(0, 2, layout());
        b0.add_node(0, &[0.0, 0.0], Ownership::Owned, &[1.0, 10.0, 0.0]);
        b0.add_node(1, &[1.0, 0.0], Ownership::Owned, &[2.0, 20.0, 0.0]);
        b0.add_node(2, &[0.0, 1.0], Ownership::Owned, &[3.0, 30.0, 0.0]);
        b0.add_element(ElementType::Triangle, &[0, 1, 2], Ownership::Owned, false);

        let mut b1 = PartitionBuilder::new(1, 2, layout());
        b1.add_node(3, &[1.0, 1.0], Ownership::Owned, &[4.0, 40.0, 1.0]);
        b1.add_node(2, &[0.0, 1.0], Ownership::Ghost(0, 2), &[halo_value, 30.0, 0.0]);
        b1.add_node(4, &[2.0, 1.0], Ownership::Owned, &[5.0, 50.0, 1.0]);
        b1.add_element(ElementType::Triangle, &[1, 0, 2], Ownership::Owned, false);

        vec![b1.build(), b0.build()]
    }

    #[test]
    fn test_halo_value_ignored() {
        let partitions = partitions(-7.0);
        let ctx = GeometryMerger::number_nodes(&partitions).unwrap();
        let solution = SolutionMerger::new()
            .merge_solution(&ctx, &partitions, &[])
            .unwrap();

        assert_eq!(solution.node_count(), 5);
        assert_eq!(solution.width(), 3);
        assert_eq!(solution.values(2), &[3.0, 30.0, 0.0]);
        assert_eq!(
            solution.field("Density").unwrap().collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0]
        );
        assert_eq!(solution.halo_mismatches(), 0);
    }

    #[test]
    fn test_derived_quantities_appended() {
        let partitions = partitions(3.0);
        let ctx = GeometryMerger::number_nodes(&partitions).unwrap();
        let derived: Vec<Box<dyn DerivedQuantity<f64>>> = vec![Box::new(Sum)];
        let solution = SolutionMerger::new()
            .merge_solution(&ctx, &partitions, &derived)
            .unwrap();

        assert_eq!(solution.names(), &["Density", "Energy", "Tag", "Sum"]);
        assert_eq!(solution.conserved(), 2);
        // Only the conserved variables are passed to the closure
        for (i, s) in solution.field("Sum").unwrap().enumerate() {
            assert_relative_eq!(s, 11.0 * (i + 1) as f64);
        }
    }

    #[test]
    fn test_halo_check() {
        let partitions = partitions(3.5);
        let ctx = GeometryMerger::number_nodes(&partitions).unwrap();
        let solution = SolutionMerger::with_halo_check(1e-8)
            .merge_solution(&ctx, &partitions, &[])
            .unwrap();
        assert_eq!(solution.halo_mismatches(), 1);
        assert_eq!(solution.values(2)[0], 3.0);

        let partitions = self::partitions(3.0 + 1e-12);
        let ctx = GeometryMerger::number_nodes(&partitions).unwrap();
        let solution = SolutionMerger::with_halo_check(1e-8)
            .merge_solution(&ctx, &partitions, &[])
            .unwrap();
        assert_eq!(solution.halo_mismatches(), 0);
    }

    #[test]
    fn test_layout_mismatch() {
        let mut partitions = partitions(3.0);
        partitions[0].layout = FieldLayout::new(["Density", "Energy", "Other"], 2);
        let ctx = GeometryMerger::number_nodes(&partitions).unwrap();
        assert!(matches!(
            SolutionMerger::new().merge_solution(&ctx, &partitions, &[]),
            Err(IntegrityError::FieldLayoutMismatch { rank: 1, .. })
        ));
    }

    #[test]
    fn test_field_width() {
        let mut partitions = partitions(3.0);
        partitions[1].fields.pop();
        let ctx = GeometryMerger::number_nodes(&partitions).unwrap();
        assert_eq!(
            SolutionMerger::new()
                .merge_solution(&ctx, &partitions, &[])
                .unwrap_err(),
            IntegrityError::FieldWidth {
                rank: 0,
                nodes: 3,
                width: 3,
                len: 8
            }
        );
    }

    #[test]
    fn test_conserved_count() {
        let mut partitions = partitions(3.0);
        for p in partitions.iter_mut() {
            p.layout = FieldLayout::new(["Density", "Energy", "Tag"], 4);
        }
        let ctx = GeometryMerger::number_nodes(&partitions).unwrap();
        assert_eq!(
            SolutionMerger::new()
                .merge_solution(&ctx, &partitions, &[])
                .unwrap_err(),
            IntegrityError::ConservedCount {
                conserved: 4,
                fields: 3
            }
        );
    }
}
