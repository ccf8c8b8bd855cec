//! Tick routing and signal detection.
//!
//! The [`Router`] owns every rule instance. Per-symbol rules are created
//! lazily on the first tick of a symbol; per-pair correlation rules are
//! created when the pair is registered, so `add_watched_pair` must run
//! before the first tick that concerns either symbol.
//!
//! `process` must be called from a single thread (the queue consumer).
//! None of the rule state is locked; observer threads read only the shared
//! [`RouterStats`] counters and histogram.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use market_data::{SignalEvent, SignalKind, Symbol, Tick};

use crate::latency::LatencyHistogram;
use crate::rules::{
    CorrelationBreakRule, MeanReversionRule, SignalRule, VolumeRule, ZScoreRule,
    DEFAULT_CORRELATION_THRESHOLD, DEFAULT_MEAN_REVERSION_THRESHOLD,
    DEFAULT_MEAN_REVERSION_WINDOWS, DEFAULT_MIN_PAIR_OBSERVATIONS, DEFAULT_VOLUME_THRESHOLD,
    DEFAULT_ZSCORE_THRESHOLD,
};

/// Sink invoked synchronously from `process` for every fired signal.
///
/// Sinks run on the consumer thread inside the hot path; they must not
/// block, or ingestion stalls and the queue fills up.
pub type SignalSink = Box<dyn FnMut(&SignalEvent) + Send>;

/// Telemetry shared between the consumer thread and observers.
///
/// All fields are atomic; readers see eventually-consistent values.
pub struct RouterStats {
    ticks_processed: AtomicU64,
    signals_generated: AtomicU64,
    latency: LatencyHistogram,
}

impl RouterStats {
    fn new() -> Self {
        Self {
            ticks_processed: AtomicU64::new(0),
            signals_generated: AtomicU64::new(0),
            latency: LatencyHistogram::new(),
        }
    }

    #[inline]
    pub fn ticks_processed(&self) -> u64 {
        self.ticks_processed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn signals_generated(&self) -> u64 {
        self.signals_generated.load(Ordering::Acquire)
    }

    #[inline]
    pub fn latency_histogram(&self) -> &LatencyHistogram {
        &self.latency
    }

    /// Ticks per second since the first processed tick.
    #[inline]
    pub fn processing_rate(&self) -> f64 {
        self.latency.samples_per_second()
    }
}

/// Canonical unordered pair key: symbols ordered by name.
fn pair_key(a: Symbol, b: Symbol) -> (Symbol, Symbol) {
    if a.as_str() <= b.as_str() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Routing and signal detection engine.
pub struct Router {
    // Per-symbol rules, created lazily on the first tick of a symbol
    zscore_rules: HashMap<Symbol, ZScoreRule>,
    volume_rules: HashMap<Symbol, VolumeRule>,
    mean_reversion_rules: HashMap<Symbol, MeanReversionRule>,

    // Per-pair rules, created at registration
    correlation_rules: HashMap<(Symbol, Symbol), CorrelationBreakRule>,
    watched_pairs: Vec<(Symbol, Symbol)>,

    latest_ticks: HashMap<Symbol, Tick>,

    sink: Option<SignalSink>,
    stats: Arc<RouterStats>,

    // Thresholds applied to rules created after the setter ran
    zscore_threshold: f64,
    correlation_threshold: f64,
    volume_threshold: f64,
    mean_reversion_windows: (usize, usize),
    mean_reversion_threshold: f64,
}

impl Router {
    pub fn new() -> Self {
        Self {
            zscore_rules: HashMap::new(),
            volume_rules: HashMap::new(),
            mean_reversion_rules: HashMap::new(),
            correlation_rules: HashMap::new(),
            watched_pairs: Vec::new(),
            latest_ticks: HashMap::new(),
            sink: None,
            stats: Arc::new(RouterStats::new()),
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            correlation_threshold: DEFAULT_CORRELATION_THRESHOLD,
            volume_threshold: DEFAULT_VOLUME_THRESHOLD,
            mean_reversion_windows: DEFAULT_MEAN_REVERSION_WINDOWS,
            mean_reversion_threshold: DEFAULT_MEAN_REVERSION_THRESHOLD,
        }
    }

    // Configuration. All of these must happen before the consumer thread
    // starts processing; they are not synchronized against `process`.

    pub fn set_zscore_threshold(&mut self, threshold: f64) {
        self.zscore_threshold = threshold;
    }

    pub fn set_correlation_threshold(&mut self, threshold: f64) {
        self.correlation_threshold = threshold;
    }

    pub fn set_volume_threshold(&mut self, threshold: f64) {
        self.volume_threshold = threshold;
    }

    pub fn set_mean_reversion_params(&mut self, fast_window: usize, slow_window: usize, threshold: f64) {
        self.mean_reversion_windows = (fast_window, slow_window);
        self.mean_reversion_threshold = threshold;
    }

    /// Installs the signal sink. Replaces any previous sink.
    pub fn set_signal_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&SignalEvent) + Send + 'static,
    {
        self.sink = Some(Box::new(callback));
    }

    /// Registers a symbol pair for correlation tracking.
    ///
    /// The pair is stored under its canonical (name-ordered) key and its
    /// correlation rule is created immediately with the current threshold.
    /// Duplicate registrations are ignored.
    pub fn add_watched_pair(&mut self, a: Symbol, b: Symbol) {
        let key = pair_key(a, b);
        if self.correlation_rules.contains_key(&key) {
            debug!(a = %key.0, b = %key.1, "pair already watched");
            return;
        }
        debug!(a = %key.0, b = %key.1, "watching pair");
        self.watched_pairs.push(key);
        self.correlation_rules.insert(
            key,
            CorrelationBreakRule::new(self.correlation_threshold, DEFAULT_MIN_PAIR_OBSERVATIONS),
        );
    }

    /// Processes one tick: updates the latest-tick map, drives the symbol's
    /// rules and every watched pair containing the symbol, and emits a
    /// signal for each rule that fires.
    ///
    /// Consumer-thread only. The evaluation order (z-score, volume, mean
    /// reversion, then pairs) is fixed; signal ids increase in emission
    /// order.
    pub fn process(&mut self, tick: Tick) {
        let symbol = tick.symbol;
        let event_time = tick.timestamp;

        // The pair pass below must see this tick on its own side.
        self.latest_ticks.insert(symbol, tick);
        self.ensure_symbol_rules(symbol);

        self.evaluate_single_symbol(symbol, &tick, event_time);
        self.evaluate_pairs(symbol, event_time);

        self.stats.latency.add_sample(event_time, Instant::now());
        self.stats.ticks_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn ensure_symbol_rules(&mut self, symbol: Symbol) {
        let zscore_threshold = self.zscore_threshold;
        self.zscore_rules
            .entry(symbol)
            .or_insert_with(|| ZScoreRule::new(zscore_threshold));
        let volume_threshold = self.volume_threshold;
        self.volume_rules
            .entry(symbol)
            .or_insert_with(|| VolumeRule::new(volume_threshold));
        let (fast, slow) = self.mean_reversion_windows;
        let threshold = self.mean_reversion_threshold;
        self.mean_reversion_rules
            .entry(symbol)
            .or_insert_with(|| MeanReversionRule::new(fast, slow, threshold));
    }

    fn evaluate_single_symbol(&mut self, symbol: Symbol, tick: &Tick, event_time: Instant) {
        let zscore = self.zscore_rules.get_mut(&symbol).expect("rule ensured");
        zscore.add_observation(tick.last_price);
        let eval = zscore.evaluate();
        if eval.fires {
            self.emit(SignalKind::ZScoreBreak, symbol, None, eval.strength, event_time);
        }

        let volume = self.volume_rules.get_mut(&symbol).expect("rule ensured");
        volume.add_volume(tick.last_size);
        let eval = volume.evaluate();
        if eval.fires {
            self.emit(SignalKind::VolumeSpike, symbol, None, eval.strength, event_time);
        }

        let mean_rev = self
            .mean_reversion_rules
            .get_mut(&symbol)
            .expect("rule ensured");
        mean_rev.add_observation(tick.last_price);
        let eval = mean_rev.evaluate();
        if eval.fires {
            self.emit(
                SignalKind::PairTradeEntry,
                symbol,
                None,
                eval.strength,
                event_time,
            );
        }
    }

    fn evaluate_pairs(&mut self, symbol: Symbol, event_time: Instant) {
        for i in 0..self.watched_pairs.len() {
            let (a, b) = self.watched_pairs[i];
            if a != symbol && b != symbol {
                continue;
            }

            // Both sides must have been observed at least once.
            let (price_a, price_b) = match (self.latest_ticks.get(&a), self.latest_ticks.get(&b)) {
                (Some(tick_a), Some(tick_b)) => (tick_a.last_price, tick_b.last_price),
                _ => continue,
            };

            let Some(rule) = self.correlation_rules.get_mut(&(a, b)) else {
                continue;
            };
            rule.add_pair(price_a, price_b);
            let eval = rule.evaluate();
            if eval.fires {
                self.emit(
                    SignalKind::CorrelationBreak,
                    a,
                    Some(b),
                    eval.strength,
                    event_time,
                );
            }
        }
    }

    fn emit(
        &mut self,
        kind: SignalKind,
        primary: Symbol,
        secondary: Option<Symbol>,
        strength: f64,
        event_time: Instant,
    ) {
        let signal_id = self.stats.signals_generated.fetch_add(1, Ordering::AcqRel);
        if let Some(sink) = self.sink.as_mut() {
            let event = SignalEvent {
                kind,
                primary_symbol: primary,
                secondary_symbol: secondary,
                signal_strength: strength,
                confidence: kind.confidence(),
                event_time,
                generation_time: Instant::now(),
                signal_id,
            };
            sink(&event);
        }
    }

    // Telemetry

    /// Shared stats handle for observer threads.
    pub fn stats(&self) -> Arc<RouterStats> {
        Arc::clone(&self.stats)
    }

    #[inline]
    pub fn ticks_processed(&self) -> u64 {
        self.stats.ticks_processed()
    }

    #[inline]
    pub fn signals_generated(&self) -> u64 {
        self.stats.signals_generated()
    }

    #[inline]
    pub fn latency_histogram(&self) -> &LatencyHistogram {
        self.stats.latency_histogram()
    }

    #[inline]
    pub fn processing_rate(&self) -> f64 {
        self.stats.processing_rate()
    }

    /// Current correlation of a watched pair, 0 if the pair is unknown.
    pub fn get_correlation(&self, a: Symbol, b: Symbol) -> f64 {
        self.correlation_rules
            .get(&pair_key(a, b))
            .map(|rule| rule.correlation())
            .unwrap_or(0.0)
    }

    /// Resets counters, the latency histogram, and every rule.
    pub fn reset_stats(&mut self) {
        self.stats.ticks_processed.store(0, Ordering::Release);
        self.stats.signals_generated.store(0, Ordering::Release);
        self.stats.latency.reset();

        for rule in self.zscore_rules.values_mut() {
            rule.reset();
        }
        for rule in self.volume_rules.values_mut() {
            rule.reset();
        }
        for rule in self.mean_reversion_rules.values_mut() {
            rule.reset();
        }
        for rule in self.correlation_rules.values_mut() {
            rule.reset();
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Captured {
        kind: SignalKind,
        primary: Symbol,
        secondary: Option<Symbol>,
        strength: f64,
        confidence: f64,
        signal_id: u64,
    }

    fn capturing_router() -> (Router, Arc<Mutex<Vec<Captured>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        let sink_events = Arc::clone(&events);
        router.set_signal_callback(move |event: &SignalEvent| {
            sink_events.lock().unwrap().push(Captured {
                kind: event.kind,
                primary: event.primary_symbol,
                secondary: event.secondary_symbol,
                strength: event.signal_strength,
                confidence: event.confidence,
                signal_id: event.signal_id,
            });
        });
        (router, events)
    }

    fn tick(symbol: Symbol, price: f64, size: f64, seq: u64) -> Tick {
        Tick::new(symbol, price, price - 0.05, price + 0.05, size, seq)
    }

    #[test]
    fn test_warmup_gating() {
        let (mut router, events) = capturing_router();
        let sym = Symbol::intern("RTR_WARMUP");

        // Wild prices and sizes, but nothing may fire before the warmups.
        for i in 1..=9u64 {
            router.process(tick(sym, if i % 2 == 0 { 10.0 } else { 500.0 }, 1e6, i));
        }
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .all(|e| e.kind != SignalKind::ZScoreBreak));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .all(|e| e.kind != SignalKind::VolumeSpike));

        assert_eq!(router.ticks_processed(), 9);
    }

    #[test]
    fn test_zscore_break_emitted_with_confidence() {
        let (mut router, events) = capturing_router();
        let sym = Symbol::intern("RTR_ZBRK");

        for i in 1..=10u64 {
            router.process(tick(sym, 100.0 + (i % 2) as f64, 100.0, i));
        }
        router.process(tick(sym, 200.0, 100.0, 11));

        let events = events.lock().unwrap();
        let zbreak = events
            .iter()
            .find(|e| e.kind == SignalKind::ZScoreBreak)
            .expect("z-score break not emitted");
        assert_eq!(zbreak.primary, sym);
        assert_eq!(zbreak.secondary, None);
        assert!(zbreak.strength > 2.5);
        assert!((zbreak.confidence - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_multi_signal_tick_ordering() {
        let (mut router, events) = capturing_router();
        let a = Symbol::intern("RTR_ORD_A");
        let b = Symbol::intern("RTR_ORD_B");
        router.add_watched_pair(a, b);

        // Decorrelated pair history: A oscillates in place, B trends, so the
        // pair rule fires on every tick once past its 50-observation gate.
        let mut seq_a = 0u64;
        let mut seq_b = 0u64;
        for i in 0..40 {
            seq_a += 1;
            router.process(tick(a, 100.0 + (i % 2) as f64, 100.0 + (i % 3) as f64, seq_a));
            seq_b += 1;
            router.process(tick(b, 50.0 + i as f64, 100.0, seq_b));
        }

        events.lock().unwrap().clear();

        // An extreme tick on A: z-score break, volume spike, and the pair
        // break must all fire, in that order, with consecutive ids.
        seq_a += 1;
        router.process(tick(a, 500.0, 100_000.0, seq_a));

        let events = events.lock().unwrap();
        assert!(events.len() >= 3, "expected at least 3 signals, got {}", events.len());
        let kinds: Vec<SignalKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SignalKind::ZScoreBreak,
                SignalKind::VolumeSpike,
                SignalKind::CorrelationBreak,
            ]
        );
        assert!(events.windows(2).all(|w| w[1].signal_id == w[0].signal_id + 1));

        let pair_break = &events[2];
        assert_eq!(pair_break.primary, a);
        assert_eq!(pair_break.secondary, Some(b));
    }

    #[test]
    fn test_perfect_correlation_does_not_fire() {
        let (mut router, events) = capturing_router();
        let a = Symbol::intern("RTR_CORR_A");
        let b = Symbol::intern("RTR_CORR_B");
        router.add_watched_pair(a, b);

        // B tracks 2x + 1; interleaved updates keep the pair near-collinear.
        for i in 1..=60u64 {
            let x = i as f64;
            router.process(tick(a, x, 10.0, i));
            router.process(tick(b, 2.0 * x + 1.0, 10.0, i));
        }

        assert!(router.get_correlation(a, b) > 0.99);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .all(|e| e.kind != SignalKind::CorrelationBreak));
    }

    #[test]
    fn test_correlation_collapse_fires() {
        let (mut router, events) = capturing_router();
        let a = Symbol::intern("RTR_COLL_A");
        let b = Symbol::intern("RTR_COLL_B");
        router.add_watched_pair(a, b);

        for i in 1..=60u64 {
            let x = i as f64;
            router.process(tick(a, x, 10.0, i));
            router.process(tick(b, 2.0 * x + 1.0, 10.0, i));
        }

        // B decouples: it oscillates in place while A keeps trending.
        let mut fired_at_corr = None;
        for i in 61..=2000u64 {
            router.process(tick(a, i as f64, 10.0, i));
            router.process(tick(b, 120.0 + (i % 2) as f64, 10.0, i));
            let fired = events
                .lock()
                .unwrap()
                .iter()
                .any(|e| e.kind == SignalKind::CorrelationBreak);
            if fired {
                fired_at_corr = Some(router.get_correlation(a, b));
                break;
            }
        }

        let corr = fired_at_corr.expect("correlation break never fired");
        assert!(corr.abs() < 0.3, "fired at correlation {corr}");
    }

    #[test]
    fn test_pair_requires_both_sides_observed() {
        let (mut router, events) = capturing_router();
        let a = Symbol::intern("RTR_HALF_A");
        let b = Symbol::intern("RTR_HALF_B");
        router.add_watched_pair(a, b);

        // Only A ever ticks: the pair rule must accumulate nothing.
        for i in 1..=100u64 {
            router.process(tick(a, i as f64, 10.0, i));
        }
        assert_eq!(router.get_correlation(a, b), 0.0);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .all(|e| e.kind != SignalKind::CorrelationBreak));
    }

    #[test]
    fn test_duplicate_pair_registration_ignored() {
        let mut router = Router::new();
        let a = Symbol::intern("RTR_DUP_A");
        let b = Symbol::intern("RTR_DUP_B");
        router.add_watched_pair(a, b);
        router.add_watched_pair(b, a);
        assert_eq!(router.watched_pairs.len(), 1);
    }

    #[test]
    fn test_counters_and_reset() {
        let (mut router, _events) = capturing_router();
        let sym = Symbol::intern("RTR_RESET");

        for i in 1..=25u64 {
            router.process(tick(sym, 100.0 + (i % 2) as f64, 100.0, i));
        }
        router.process(tick(sym, 400.0, 50_000.0, 26));

        assert_eq!(router.ticks_processed(), 26);
        assert!(router.signals_generated() > 0);
        assert!(router.latency_histogram().total_samples() == 26);

        router.reset_stats();
        assert_eq!(router.ticks_processed(), 0);
        assert_eq!(router.signals_generated(), 0);
        assert_eq!(router.latency_histogram().total_samples(), 0);

        // Rules restarted their warmup: the next outlier must stay quiet.
        router.process(tick(sym, 1000.0, 1e6, 27));
        assert_eq!(router.signals_generated(), 0);
    }

    #[test]
    fn test_emission_without_sink_advances_counter() {
        let mut router = Router::new();
        let sym = Symbol::intern("RTR_NOSINK");

        for i in 1..=10u64 {
            router.process(tick(sym, 100.0 + (i % 2) as f64, 100.0, i));
        }
        router.process(tick(sym, 300.0, 100.0, 11));
        assert!(router.signals_generated() > 0);
    }
}
