//! Terminal status dashboard.

use std::sync::Arc;
use std::time::Instant;

use market_data::{QueueObserver, Tick};
use signal_engine::RouterStats;

use crate::feed::FeedStats;

/// Periodic status display for the demo.
pub struct Dashboard {
    start: Instant,
    queue: QueueObserver<Tick>,
    router: Arc<RouterStats>,
    feed: Arc<FeedStats>,
}

impl Dashboard {
    pub fn new(
        queue: QueueObserver<Tick>,
        router: Arc<RouterStats>,
        feed: Arc<FeedStats>,
    ) -> Self {
        Self {
            start: Instant::now(),
            queue,
            router,
            feed,
        }
    }

    /// Clears the terminal and prints the current pipeline status.
    pub fn print_status(&self) {
        let elapsed = self.start.elapsed().as_secs();
        let hist = self.router.latency_histogram();

        // Clear screen, cursor home.
        print!("\x1b[2J\x1b[H");
        println!("== tickflow ==================================================");
        println!("runtime     {elapsed:>6} s");
        println!(
            "feed        {:>10} ticks | dropped {:>8} ({:.2}%)",
            self.feed.ticks_generated(),
            self.feed.ticks_dropped(),
            self.feed.drop_rate() * 100.0,
        );
        println!("queue       {:>9.1}% full", self.queue.fill_ratio() * 100.0);
        println!(
            "processed   {:>10} ticks | rate {:>10.0} tps",
            self.router.ticks_processed(),
            self.router.processing_rate(),
        );
        println!("signals     {:>10}", self.router.signals_generated());
        println!(
            "latency     p50 {:>6.0} us | p95 {:>6.0} us | p99 {:>6.0} us",
            hist.p50_us(),
            hist.p95_us(),
            hist.p99_us(),
        );
        println!("==============================================================");
    }

    /// Prints the shutdown summary with the full latency table.
    pub fn print_final_report(&self) {
        let hist = self.router.latency_histogram();
        let total = hist.total_samples();

        println!();
        println!("== final results =============================================");
        println!("ticks processed   {:>12}", self.router.ticks_processed());
        println!("signals generated {:>12}", self.router.signals_generated());
        println!("average rate      {:>12.0} tps", self.router.processing_rate());
        println!(
            "feed drop rate    {:>11.2}%",
            self.feed.drop_rate() * 100.0
        );
        println!();
        println!("latency histogram ({total} samples)");
        println!("   range (us)      |    count | percent");
        println!("-------------------+----------+--------");
        for bucket in hist.snapshot() {
            println!(
                "{:>7} - {:<9} | {:>8} | {:>6.2}%",
                bucket.lower_bound_us, bucket.upper_bound_us, bucket.count, bucket.percentage,
            );
        }
        println!();
        println!(
            "mean {:.1} us | min {} us | max {} us | p50 {:.1} us | p95 {:.1} us | p99 {:.1} us",
            hist.mean_latency_us(),
            hist.min_latency_us(),
            hist.max_latency_us(),
            hist.p50_us(),
            hist.p95_us(),
            hist.p99_us(),
        );
    }
}
