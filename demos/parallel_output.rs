use mpi::{environment::Universe, traits::Communicator};
use ndmerge::{gather::MpiGather, shapes, OutputConfig, OutputEngine};

/// Parallel output
///
/// Demonstration of gathering the partitions of every process onto process 0
fn main() {
    tracing_subscriber::fmt::init();

    let universe: Universe = mpi::initialize().unwrap();
    let comm = universe.world();
    let rank = comm.rank() as usize;
    let size = comm.size() as usize;

    // Every process builds the partitions of its own rank
    let local = vec![shapes::unit_cube_partitions::<f64>(4, size).swap_remove(rank)];
    let config = OutputConfig {
        directory: "_parallel_output".into(),
        ..Default::default()
    };
    let mut engine = OutputEngine::new(config, MpiGather::new(&comm, 0, local));

    // Every process must take part in the request
    if let Some(report) = engine.request_output(0, 0.0, &[]).unwrap() {
        for (format, status) in report.statuses() {
            println!("{format}: {status:?}");
        }
    }
}
