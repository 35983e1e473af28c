use ndmerge::{gather::ChannelGather, shapes, OutputConfig, OutputEngine};
use std::thread;
use std::time::Duration;

/// Threaded output
///
/// Demonstration of worker threads reporting their partitions to an aggregation point
fn main() {
    tracing_subscriber::fmt::init();

    let ranks = 4;
    let (gather, senders) = ChannelGather::<f64>::new(vec![ranks, ranks], Duration::from_secs(5));
    let config = OutputConfig {
        directory: "_threaded_output".into(),
        ..Default::default()
    };
    let mut engine = OutputEngine::new(config, gather);

    // Each worker owns one partition of each of two zones
    let workers = (0..ranks)
        .map(|rank| {
            let senders = senders.clone();
            thread::spawn(move || {
                let square = shapes::unit_square_partitions::<f64>(8, ranks).swap_remove(rank);
                let cube = shapes::unit_cube_partitions::<f64>(4, ranks).swap_remove(rank);
                senders[0].send(0, square).unwrap();
                senders[1].send(0, cube).unwrap();
            })
        })
        .collect::<Vec<_>>();

    let report = engine.request_output(0, 0.0, &[]).unwrap().unwrap();
    for w in workers {
        w.join().unwrap();
    }
    for (format, status) in report.statuses() {
        println!("{format}: {status:?}");
    }
}
