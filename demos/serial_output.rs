use ndmerge::{
    closure::{FreeStream, IdealGas},
    gather::SerialGather,
    history::HistoryFormat,
    shapes,
    types::OutputFormat,
    OutputConfig, OutputEngine,
};

/// Serial output
///
/// Demonstration of merging the partitions of a single process and writing every format
///
/// Output from worker threads is demonstrated in the example `threaded_output.rs`
fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let free_stream = FreeStream {
        density: 1.2,
        pressure: 101325.0,
        velocity: 50.0,
    };
    let gas = IdealGas::<f64>::air(2).with_free_stream(free_stream);

    // Fields that are not set take their default values
    let config = OutputConfig {
        directory: "_serial_output".into(),
        history_format: HistoryFormat::Screen,
        formats: OutputFormat::ALL.to_vec(),
        ..Default::default()
    };
    let mut engine =
        OutputEngine::new(config, SerialGather::new(1)).with_derived(gas.quantities());

    for iteration in 0..3 {
        // Four partitions of a unit square, with halo nodes on the borders between them
        let partitions = shapes::unit_square_partitions_with::<f64>(
            8,
            4,
            &gas.conserved_layout(),
            |x| {
                let u = 50.0 * (1.0 + 0.1 * x[1]);
                vec![1.2, 1.2 * u, 0.0, 101325.0 / 0.4 + 0.5 * 1.2 * u * u]
            },
        );
        for p in partitions {
            engine.gather_mut().submit(0, p).unwrap();
        }

        let report = engine
            .request_output(iteration, iteration as f64 * 1e-3, &[])
            .unwrap()
            .unwrap();
        for (format, status) in report.statuses() {
            println!("{format}: {status:?}");
        }

        engine
            .record_history(
                iteration,
                iteration as f64 * 1e-3,
                &[("rms[Rho]", -(iteration as f64)), ("CL", 0.1)],
            )
            .unwrap();
    }

    print!("{}", engine.history().render(HistoryFormat::Screen));
}
