//! Basic demo: CPU load and HTTP request metrics flushed to a file.
//!
//! Run with:
//! ```bash
//! cargo run --example basic
//! ```
//!
//! Set `RUST_LOG=telemetria=debug` to watch the collector's lifecycle.

use std::thread;
use std::time::Duration;

use rand::Rng;
use telemetria::{Collector, MetricWriter, ValueKind};
use tracing_subscriber::EnvFilter;

fn main() -> telemetria::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    println!("=== Basic Metrics Collection Demo ===");

    let writer = MetricWriter::to_file("basic_metrics_output.txt")?;
    let collector = Collector::new(writer);

    // CPU utilization in cores (0.0 = idle, 2.0 = both cores busy) and
    // HTTP requests served per second.
    collector.register("CPU", ValueKind::Float)?;
    collector.register("HTTP requests RPS", ValueKind::Signed)?;

    collector.start();
    println!("Metrics collection started, flushing every second...");

    let mut rng = rand::thread_rng();
    for _ in 0..10 {
        let cpu_utilization = rng.gen_range(0.0..2.0);
        let http_requests = rng.gen_range(20..=60i64);

        collector.record("CPU", cpu_utilization);
        collector.record("HTTP requests RPS", http_requests);

        println!("Recorded: CPU={cpu_utilization:.2}, HTTP requests={http_requests}");
        thread::sleep(Duration::from_secs(1));
    }

    println!("Flushing final metrics...");
    collector.flush();
    collector.stop();

    println!("\nDemo completed! Check 'basic_metrics_output.txt' for results.");
    println!("Each line reads: <timestamp> \"<metric name>\" <value>");
    println!("Example: 2025-06-01 15:00:01.653 \"CPU\" 0.97");

    Ok(())
}
