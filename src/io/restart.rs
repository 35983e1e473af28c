//! Native restart files
use crate::{
    error::WriterError,
    merge::MergedSolution,
    output::{OutputRequest, ZoneView},
    partition::{FieldLayout, LocalElementBlock, Partition},
    traits::Writer,
    types::{ElementType, OutputFormat, Ownership, RealScalar},
};
use num::NumCast;
use std::io::Write;
use std::path::Path;

/// Element connectivity of a restart file
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RestartBlock {
    /// Element type
    pub element_type: ElementType,
    /// Node indices in restart order, `element_type.node_count()` per element
    pub connectivity: Vec<usize>,
    /// Boundary flag of each element
    pub boundary: Vec<bool>,
}

/// Contents of a restart file
///
/// Values are stored as `f64` for every scalar type.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RestartData {
    /// Iteration at which the file was written
    pub iteration: usize,
    /// Physical time at which the file was written
    pub time: f64,
    /// Zone identifier
    pub zone: usize,
    /// Geometric dimension
    pub gdim: usize,
    /// Field names
    pub names: Vec<String>,
    /// Number of conserved variables
    pub conserved: usize,
    /// Global identifier of each node
    pub global_ids: Vec<usize>,
    /// Boundary flag of each node
    pub boundary: Vec<bool>,
    /// Node coordinates
    pub coordinates: Vec<f64>,
    /// Field values, node by node
    pub values: Vec<f64>,
    /// Elements
    pub blocks: Vec<RestartBlock>,
}

fn to_f64<T: RealScalar>(values: &[T]) -> Vec<f64> {
    values
        .iter()
        .map(|v| v.to_f64().unwrap_or(f64::NAN))
        .collect()
}

fn from_f64<T: RealScalar>(values: &[f64]) -> Vec<T> {
    values
        .iter()
        .map(|v| <T as NumCast>::from(*v).unwrap_or_else(T::nan))
        .collect()
}

impl RestartData {
    /// Collect the restart data of a zone
    pub fn from_view<T: RealScalar>(zone: &ZoneView<'_, T>, request: &OutputRequest) -> Self {
        let mesh = zone.mesh();
        let solution = zone.solution();
        Self {
            iteration: request.iteration(),
            time: request.time(),
            zone: zone.id(),
            gdim: mesh.gdim(),
            names: solution.names().to_vec(),
            conserved: solution.conserved(),
            global_ids: mesh.nodes().iter().map(|n| n.global_id).collect(),
            boundary: mesh.nodes().iter().map(|n| n.boundary).collect(),
            coordinates: to_f64(mesh.coordinates()),
            values: to_f64(solution.data()),
            blocks: mesh
                .blocks()
                .iter()
                .map(|b| RestartBlock {
                    element_type: b.element_type(),
                    connectivity: b.connectivity().to_vec(),
                    boundary: b.iter().map(|e| e.boundary).collect(),
                })
                .collect(),
        }
    }

    /// The merged solution that was written
    pub fn to_solution<T: RealScalar>(&self) -> MergedSolution<T> {
        MergedSolution::new(self.names.clone(), self.conserved, from_f64(&self.values))
    }

    /// A single partition that owns every node of the restart
    ///
    /// Merging this partition reproduces the solution that was written.
    pub fn to_partition<T: RealScalar>(&self, rank: usize) -> Partition<T> {
        Partition::from_raw_parts(
            rank,
            self.gdim,
            from_f64(&self.coordinates),
            self.global_ids.clone(),
            vec![Ownership::Owned; self.global_ids.len()],
            self.boundary.clone(),
            self.blocks
                .iter()
                .map(|b| {
                    LocalElementBlock::new(
                        b.element_type,
                        b.connectivity.clone(),
                        vec![Ownership::Owned; b.boundary.len()],
                        b.boundary.clone(),
                    )
                })
                .collect(),
            FieldLayout::new(self.names.iter().cloned(), self.conserved),
            from_f64(&self.values),
        )
    }

    /// Parse restart data from a RON string
    pub fn from_ron_str(s: &str) -> Result<Self, WriterError> {
        ron::from_str(s).map_err(|e| WriterError::Encoding(e.to_string()))
    }

    /// Encode as a RON string
    pub fn to_ron_string(&self) -> Result<String, WriterError> {
        ron::to_string(self).map_err(|e| WriterError::Encoding(e.to_string()))
    }
}

/// Read a restart file
pub fn read_restart(path: &Path) -> Result<RestartData, WriterError> {
    RestartData::from_ron_str(&std::fs::read_to_string(path)?)
}

/// Writer for native restart files
#[derive(Debug, Clone, Copy)]
pub struct RestartWriter;

impl<T: RealScalar> Writer<T> for RestartWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::NativeRestart
    }

    fn write(
        &self,
        zone: &ZoneView<'_, T>,
        request: &OutputRequest,
        out: &mut dyn Write,
    ) -> Result<(), WriterError> {
        let data = RestartData::from_view(zone, request);
        out.write_all(data.to_ron_string()?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        merge::{GeometryMerger, SolutionMerger, ZoneAggregator},
        output::FileNaming,
        shapes::unit_square_partitions_with,
        traits::DerivedQuantity,
    };

    struct Ratio;

    impl DerivedQuantity<f64> for Ratio {
        fn name(&self) -> &str {
            "Ratio"
        }
        fn evaluate(&self, conserved: &[f64]) -> f64 {
            conserved[1] / conserved[0]
        }
    }

    #[test]
    fn test_restart_round_trip() {
        let layout = FieldLayout::new(["Density", "Energy"], 2);
        let partitions = unit_square_partitions_with::<f64>(3, 3, &layout, |x| {
            vec![1.0 / 3.0 + x[0], (0.1 + x[1]).sqrt()]
        });
        let derived: Vec<Box<dyn DerivedQuantity<f64>>> = vec![Box::new(Ratio)];
        let zones = ZoneAggregator::default()
            .aggregate(&[partitions], &derived)
            .unwrap()
            .zones;
        let zone = &zones[0];

        let request = OutputRequest::new(20, 1.5, ".", FileNaming::default());
        let mut out = Vec::<u8>::new();
        RestartWriter
            .write(&ZoneView::full(zone), &request, &mut out)
            .unwrap();
        let data = RestartData::from_ron_str(&String::from_utf8(out).unwrap()).unwrap();

        assert_eq!(data.iteration, 20);
        assert_eq!(data.to_solution::<f64>(), *zone.solution());
        assert_eq!(
            data.global_ids,
            zone.mesh()
                .nodes()
                .iter()
                .map(|n| n.global_id)
                .collect::<Vec<_>>()
        );

        // Merging the restart again gives the same mesh and solution
        let restart_partitions = [data.to_partition::<f64>(0)];
        let ctx = GeometryMerger::number_nodes(&restart_partitions).unwrap();
        let mesh = GeometryMerger::merge(&ctx, &restart_partitions).unwrap();
        let solution = SolutionMerger::new()
            .merge_solution(&ctx, &restart_partitions, &[])
            .unwrap();
        assert_eq!(solution.data(), zone.solution().data());
        assert_eq!(mesh.coordinates(), zone.mesh().coordinates());
        assert_eq!(mesh.blocks().len(), zone.mesh().blocks().len());
        for (a, b) in mesh.blocks().iter().zip(zone.mesh().blocks()) {
            assert_eq!(a.element_type(), b.element_type());
            assert_eq!(a.connectivity(), b.connectivity());
        }
    }
}
