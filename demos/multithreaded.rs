//! Multi-threaded demo: several producer threads recording different
//! metrics through one shared collector.
//!
//! Run with:
//! ```bash
//! cargo run --example multithreaded
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use telemetria::{Collector, MetricWriter, ScopedCollector, ValueKind};
use tracing_subscriber::EnvFilter;

/// Spawns a producer that records one metric at a fixed pace until told
/// to stop.
fn spawn_producer<F>(
    collector: &Arc<ScopedCollector>,
    stop: &Arc<AtomicBool>,
    pace: Duration,
    mut produce: F,
) -> thread::JoinHandle<()>
where
    F: FnMut(&Collector) + Send + 'static,
{
    let collector_clone = Arc::clone(collector);
    let stop_clone = Arc::clone(stop);
    thread::spawn(move || {
        while !stop_clone.load(Ordering::Relaxed) {
            produce(&collector_clone);
            thread::sleep(pace);
        }
    })
}

fn main() -> telemetria::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    println!("=== Multi-Threaded Metrics Collection Demo ===");

    let writer = MetricWriter::to_file("multithreaded_metrics_output.txt")?;
    let collector = Arc::new(ScopedCollector::new(Collector::new(writer)));

    collector.register("CPU", ValueKind::Float)?;
    collector.register("HTTP requests RPS", ValueKind::Signed)?;
    collector.register("Memory Usage MB", ValueKind::Float)?;
    collector.register("Network Bytes/sec", ValueKind::Signed)?;

    let stop = Arc::new(AtomicBool::new(false));
    let mut producers = vec![];

    producers.push(spawn_producer(
        &collector,
        &stop,
        Duration::from_millis(800),
        |collector| {
            let load = rand::thread_rng().gen_range(0.1..1.8);
            collector.record("CPU", load);
            println!("[cpu] recorded {load:.2}");
        },
    ));

    for id in 1..=2 {
        producers.push(spawn_producer(
            &collector,
            &stop,
            Duration::from_millis(600),
            move |collector| {
                let requests = rand::thread_rng().gen_range(5..=25i64);
                collector.record("HTTP requests RPS", requests);
                println!("[http {id}] recorded {requests}");
            },
        ));
    }

    producers.push(spawn_producer(
        &collector,
        &stop,
        Duration::from_millis(1200),
        |collector| {
            let megabytes = rand::thread_rng().gen_range(100.0..512.0);
            collector.record("Memory Usage MB", megabytes);
            println!("[memory] recorded {megabytes:.0} MB");
        },
    ));

    producers.push(spawn_producer(
        &collector,
        &stop,
        Duration::from_millis(900),
        |collector| {
            let bytes = rand::thread_rng().gen_range(1_024..=10_485_760i64);
            collector.record("Network Bytes/sec", bytes);
            println!("[network] recorded {bytes} bytes");
        },
    ));

    println!("Started {} producer threads, running for 6 seconds...", producers.len());
    thread::sleep(Duration::from_secs(6));

    stop.store(true, Ordering::Relaxed);
    for producer in producers {
        producer.join().expect("producer thread panicked");
    }

    // Last handle: dropping it stops the collector and flushes what is left.
    drop(collector);

    println!("\nDemo completed! Check 'multithreaded_metrics_output.txt' for results.");
    Ok(())
}
