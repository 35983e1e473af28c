//! Unit square meshes
use super::partitioned::StructuredMesh;
use crate::{
    partition::{FieldLayout, Partition},
    types::{ElementType, RealScalar},
};

/// Create a partitioned unit square mesh
///
/// The square is split into `n` by `n` cells of two triangles each, and into `ranks` strips of
/// cell rows. The boundary is meshed with line elements. Each node carries the fields `Density`
/// and `Energy`.
pub fn unit_square_partitions<T: RealScalar>(n: usize, ranks: usize) -> Vec<Partition<T>> {
    unit_square_partitions_with(
        n,
        ranks,
        &FieldLayout::new(["Density", "Energy"], 2),
        |x| vec![T::one() + x[0], T::one() + x[0] * x[1]],
    )
}

/// Create a partitioned unit square mesh with custom fields
pub fn unit_square_partitions_with<T: RealScalar>(
    n: usize,
    ranks: usize,
    layout: &FieldLayout,
    values: impl Fn(&[T]) -> Vec<T>,
) -> Vec<Partition<T>> {
    let id = |i: usize, j: usize| j * (n + 1) + i;
    let mut coordinates = Vec::with_capacity(2 * (n + 1) * (n + 1));
    let mut node_rows = Vec::with_capacity((n + 1) * (n + 1));
    let mut boundary = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..n + 1 {
        for i in 0..n + 1 {
            coordinates.push(T::from(i).unwrap() / T::from(n).unwrap());
            coordinates.push(T::from(j).unwrap() / T::from(n).unwrap());
            node_rows.push(j);
            boundary.push(i == 0 || i == n || j == 0 || j == n);
        }
    }

    let mut elements = Vec::with_capacity(2 * n * n + 4 * n);
    for j in 0..n {
        for i in 0..n {
            let (v0, v1, v2, v3) = (id(i, j), id(i + 1, j), id(i, j + 1), id(i + 1, j + 1));
            elements.push((j, ElementType::Triangle, vec![v0, v1, v3], false));
            elements.push((j, ElementType::Triangle, vec![v0, v3, v2], false));
        }
    }
    for k in 0..n {
        elements.push((0, ElementType::Line, vec![id(k, 0), id(k + 1, 0)], true));
        elements.push((n - 1, ElementType::Line, vec![id(k + 1, n), id(k, n)], true));
        elements.push((k, ElementType::Line, vec![id(0, k + 1), id(0, k)], true));
        elements.push((k, ElementType::Line, vec![id(n, k), id(n, k + 1)], true));
    }

    StructuredMesh {
        gdim: 2,
        rows: n,
        coordinates,
        node_rows,
        boundary,
        elements,
    }
    .partition(ranks, layout, values)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::merge::{GeometryMerger, SolutionMerger};

    #[test]
    fn test_unit_square() {
        let partitions = unit_square_partitions::<f64>(3, 2);
        assert_eq!(partitions.len(), 2);
        // Rank 0 has cell rows 0 and 1 and rank 1 has cell row 2
        assert_eq!(partitions[0].node_count(), 12);
        assert_eq!(partitions[0].owned_node_count(), 8);
        assert_eq!(partitions[1].node_count(), 8);
        assert_eq!(partitions[1].owned_node_count(), 8);

        let ctx = GeometryMerger::number_nodes(&partitions).unwrap();
        let mesh = GeometryMerger::merge(&ctx, &partitions).unwrap();
        assert_eq!(mesh.node_count(), 16);
        assert_eq!(mesh.total_local_nodes(), 20);
        assert_eq!(mesh.element_count(ElementType::Triangle), 18);
        assert_eq!(mesh.element_count(ElementType::Line), 12);
        assert_eq!(mesh.nodes().iter().filter(|n| n.boundary).count(), 12);

        let solution = SolutionMerger::new()
            .merge_solution(&ctx, &partitions, &[])
            .unwrap();
        for i in 0..mesh.node_count() {
            let x = mesh.position(i);
            assert_eq!(solution.values(i), &[1.0 + x[0], 1.0 + x[0] * x[1]]);
        }
    }
}
