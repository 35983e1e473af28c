//! Unit cube meshes
use super::partitioned::StructuredMesh;
use crate::{
    partition::{FieldLayout, Partition},
    types::{ElementType, RealScalar},
};
use itertools::Itertools;

/// Create a partitioned unit cube mesh
///
/// The cube is split into `n` by `n` by `n` cells of six tetrahedra each, and into `ranks`
/// slabs of cells along the z-axis. The boundary is meshed with triangles. Each node carries the
/// fields `Density` and `Energy`.
pub fn unit_cube_partitions<T: RealScalar>(n: usize, ranks: usize) -> Vec<Partition<T>> {
    unit_cube_partitions_with(
        n,
        ranks,
        &FieldLayout::new(["Density", "Energy"], 2),
        |x| vec![T::one() + x[0], T::one() + x[1] * x[2]],
    )
}

/// Create a partitioned unit cube mesh with custom fields
pub fn unit_cube_partitions_with<T: RealScalar>(
    n: usize,
    ranks: usize,
    layout: &FieldLayout,
    values: impl Fn(&[T]) -> Vec<T>,
) -> Vec<Partition<T>> {
    let id = |c: [usize; 3]| (c[2] * (n + 1) + c[1]) * (n + 1) + c[0];
    let node_count = (n + 1) * (n + 1) * (n + 1);
    let mut coordinates = Vec::with_capacity(3 * node_count);
    let mut node_rows = Vec::with_capacity(node_count);
    let mut boundary = Vec::with_capacity(node_count);
    for k in 0..n + 1 {
        for j in 0..n + 1 {
            for i in 0..n + 1 {
                for c in [i, j, k] {
                    coordinates.push(T::from(c).unwrap() / T::from(n).unwrap());
                }
                node_rows.push(k);
                boundary.push([i, j, k].iter().any(|c| *c == 0 || *c == n));
            }
        }
    }

    let mut elements = Vec::with_capacity(6 * n * n * n + 12 * n * n);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                // Each tetrahedron follows a path along the edges from the lowest to the highest
                // corner of the cell
                for axes in (0..3).permutations(3) {
                    let mut corner = [i, j, k];
                    let mut nodes = vec![id(corner)];
                    for a in axes {
                        corner[a] += 1;
                        nodes.push(id(corner));
                    }
                    elements.push((k, ElementType::Tetrahedron, nodes, false));
                }
            }
        }
    }
    for (axis, p, q) in [(0, 1, 2), (1, 0, 2), (2, 0, 1)] {
        for side in [0, n] {
            for v in 0..n {
                for u in 0..n {
                    let corner = |du: usize, dv: usize| {
                        let mut c = [0; 3];
                        c[axis] = side;
                        c[p] = u + du;
                        c[q] = v + dv;
                        id(c)
                    };
                    let row = match axis {
                        2 => side.min(n - 1),
                        _ => v,
                    };
                    let (c00, c10) = (corner(0, 0), corner(1, 0));
                    let (c01, c11) = (corner(0, 1), corner(1, 1));
                    elements.push((row, ElementType::Triangle, vec![c00, c10, c11], true));
                    elements.push((row, ElementType::Triangle, vec![c00, c11, c01], true));
                }
            }
        }
    }

    StructuredMesh {
        gdim: 3,
        rows: n,
        coordinates,
        node_rows,
        boundary,
        elements,
    }
    .partition(ranks, layout, values)
}
