//! Real-time demo: synthetic feed -> SPSC queue -> router -> signals.
//!
//! Three threads: the feed simulator produces ticks at a fixed rate, the
//! consumer drains the queue into the router, and the main thread drives
//! the dashboard and the shutdown sequence (Ctrl-C or duration limit).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use market_data::{SpscQueue, Symbol, Tick};
use signal_engine::Router;

use crate::config::DemoConfig;
use crate::feed::FeedSimulator;
use crate::sink::SignalLogger;

mod config;
mod dashboard;
mod export;
mod feed;
mod sink;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run duration in seconds (overrides the config).
    #[arg(long)]
    duration: Option<u64>,

    /// Tick rate per symbol in Hz (overrides the config).
    #[arg(long)]
    rate: Option<f64>,

    /// Z-score threshold (overrides the config).
    #[arg(long)]
    zscore: Option<f64>,

    /// Skip CSV export on shutdown.
    #[arg(long)]
    no_csv: bool,

    /// Disable the live dashboard and per-signal log lines.
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    let mut config = match &args.config {
        Some(path) => DemoConfig::from_file(path.to_str().context("non-utf8 config path")?)
            .with_context(|| format!("loading config from {path:?}"))?,
        None => DemoConfig::default(),
    };
    if let Some(duration) = args.duration {
        config.duration_secs = duration;
    }
    if let Some(rate) = args.rate {
        anyhow::ensure!(rate > 0.0, "rate must be positive");
        config.feed.tick_interval_us = (1_000_000.0 / rate) as u64;
    }
    if let Some(zscore) = args.zscore {
        config.engine.zscore_threshold = zscore;
    }
    if args.no_csv {
        config.output.enable_csv = false;
    }
    if args.quiet {
        config.output.enable_dashboard = false;
    }

    // Shutdown flag, set by Ctrl-C or the duration limit.
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Release);
        })
        .context("installing Ctrl-C handler")?;
    }

    let (producer, mut consumer) = SpscQueue::<Tick>::with_capacity(config.feed.queue_capacity);
    let queue_observer = producer.observer();

    // Router configuration must be complete before the consumer starts.
    let logger = Arc::new(SignalLogger::new(args.quiet));
    let mut router = Router::new();
    router.set_zscore_threshold(config.engine.zscore_threshold);
    router.set_correlation_threshold(config.engine.correlation_threshold);
    router.set_volume_threshold(config.engine.volume_threshold);
    router.set_mean_reversion_params(
        config.engine.mean_reversion_fast,
        config.engine.mean_reversion_slow,
        config.engine.mean_reversion_threshold,
    );
    for (a, b) in &config.watched_pairs {
        router.add_watched_pair(Symbol::intern(a), Symbol::intern(b));
    }
    {
        let logger = Arc::clone(&logger);
        router.set_signal_callback(move |event| logger.record(event));
    }
    let router_stats = router.stats();

    let feed = FeedSimulator::new(
        config.symbols.clone(),
        config.feed.model,
        Duration::from_micros(config.feed.tick_interval_us),
    );
    let feed_stats = feed.stats();

    info!(
        symbols = config.symbols.len(),
        pairs = config.watched_pairs.len(),
        interval_us = config.feed.tick_interval_us,
        duration_secs = config.duration_secs,
        "starting pipeline"
    );

    let producer_done = Arc::new(AtomicBool::new(false));

    let feed_handle = {
        let shutdown = Arc::clone(&shutdown);
        let done = Arc::clone(&producer_done);
        let duration = Duration::from_secs(config.duration_secs);
        thread::Builder::new()
            .name("tickflow-feed".into())
            .spawn(move || {
                feed.run(producer, shutdown, Some(duration));
                done.store(true, Ordering::Release);
            })
            .context("spawning feed thread")?
    };

    let consumer_handle = {
        let done = Arc::clone(&producer_done);
        thread::Builder::new()
            .name("tickflow-consumer".into())
            .spawn(move || {
                loop {
                    match consumer.pop() {
                        Some(tick) => router.process(tick),
                        None => {
                            if done.load(Ordering::Acquire) {
                                break;
                            }
                            thread::sleep(Duration::from_micros(10));
                        }
                    }
                }
            })
            .context("spawning consumer thread")?
    };

    // Main thread: dashboard and shutdown sequencing.
    let dashboard = dashboard::Dashboard::new(
        queue_observer,
        Arc::clone(&router_stats),
        Arc::clone(&feed_stats),
    );

    let deadline = std::time::Instant::now() + Duration::from_secs(config.duration_secs);
    while !shutdown.load(Ordering::Acquire) && !producer_done.load(Ordering::Acquire) {
        if std::time::Instant::now() >= deadline {
            info!("duration limit reached, shutting down");
            shutdown.store(true, Ordering::Release);
            break;
        }
        if config.output.enable_dashboard {
            dashboard.print_status();
        }
        thread::sleep(Duration::from_millis(1000));
    }
    shutdown.store(true, Ordering::Release);

    feed_handle.join().expect("feed thread panicked");
    consumer_handle.join().expect("consumer thread panicked");

    dashboard.print_final_report();

    if config.output.enable_csv {
        let dir = PathBuf::from(&config.output.csv_dir);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {dir:?}"))?;

        let signals_path = dir.join("signals.csv");
        export::export_signals(&signals_path, &logger.rows())
            .with_context(|| format!("writing {signals_path:?}"))?;

        let hist_path = dir.join("latency_histogram.csv");
        export::export_latency_histogram(&hist_path, router_stats.latency_histogram())
            .with_context(|| format!("writing {hist_path:?}"))?;

        info!(signals = logger.count(), dir = %dir.display(), "csv export complete");
    }

    Ok(())
}
