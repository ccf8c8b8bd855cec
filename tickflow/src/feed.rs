//! Synthetic market data feed.
//!
//! Drives a configurable stochastic price process per symbol and pushes
//! valid ticks into the SPSC queue. A failed push is counted as a drop and
//! the tick is discarded; the queue is sized to absorb micro-bursts, so
//! drops are an overload signal rather than an error.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use tracing::info;

use market_data::{Producer, Symbol, Tick};

use crate::config::SymbolSpec;

/// Stochastic process used to evolve prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceModel {
    GeometricBrownianMotion,
    OrnsteinUhlenbeck,
    JumpDiffusion,
    MicrostructureNoise,
}

/// Feed counters shared with observer threads.
#[derive(Default)]
pub struct FeedStats {
    generated: AtomicU64,
    dropped: AtomicU64,
}

impl FeedStats {
    #[inline]
    pub fn ticks_generated(&self) -> u64 {
        self.generated.load(Ordering::Acquire)
    }

    #[inline]
    pub fn ticks_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }

    pub fn drop_rate(&self) -> f64 {
        let generated = self.ticks_generated();
        if generated > 0 {
            self.ticks_dropped() as f64 / generated as f64
        } else {
            0.0
        }
    }
}

struct SymbolState {
    spec: SymbolSpec,
    symbol: Symbol,
    price: f64,
    sequence_id: u64,
}

/// Market microstructure simulator.
pub struct FeedSimulator {
    symbols: Vec<SymbolState>,
    model: PriceModel,
    tick_interval: Duration,
    rng: StdRng,
    normal: Normal<f64>,
    exp: Exp<f64>,
    stats: Arc<FeedStats>,
}

impl FeedSimulator {
    pub fn new(specs: Vec<SymbolSpec>, model: PriceModel, tick_interval: Duration) -> Self {
        let symbols = specs
            .into_iter()
            .map(|spec| SymbolState {
                symbol: Symbol::intern(&spec.symbol),
                price: spec.initial_price,
                sequence_id: 0,
                spec,
            })
            .collect();

        Self {
            symbols,
            model,
            tick_interval,
            rng: StdRng::from_entropy(),
            normal: Normal::new(0.0, 1.0).expect("unit normal"),
            exp: Exp::new(1.0).expect("unit exponential"),
            stats: Arc::new(FeedStats::default()),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Shared counters for the dashboard.
    pub fn stats(&self) -> Arc<FeedStats> {
        Arc::clone(&self.stats)
    }

    /// Generates one tick per symbol into the queue.
    pub fn generate_ticks(&mut self, producer: &mut Producer<Tick>) {
        for i in 0..self.symbols.len() {
            let tick = self.next_tick(i);
            match producer.push(tick) {
                Ok(()) => {
                    self.stats.generated.fetch_add(1, Ordering::Relaxed);
                }
                Err(_dropped) => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Producer loop: one tick batch per interval until the shutdown flag
    /// is set or the duration elapses. Never blocks while holding a slot.
    pub fn run(
        mut self,
        mut producer: Producer<Tick>,
        shutdown: Arc<AtomicBool>,
        duration: Option<Duration>,
    ) {
        let start = Instant::now();
        let mut next_batch = start;

        while !shutdown.load(Ordering::Acquire) {
            if let Some(limit) = duration {
                if start.elapsed() >= limit {
                    break;
                }
            }

            self.generate_ticks(&mut producer);

            next_batch += self.tick_interval;
            let now = Instant::now();
            if next_batch > now {
                thread::sleep(next_batch - now);
            } else {
                // Falling behind: skip ahead rather than bursting.
                next_batch = now;
            }
        }

        info!(
            generated = self.stats.ticks_generated(),
            dropped = self.stats.ticks_dropped(),
            "feed stopped"
        );
    }

    fn next_tick(&mut self, idx: usize) -> Tick {
        let model = self.model;
        let normal = self.normal;
        let exp = self.exp;
        let dt = self.tick_interval.as_secs_f64() / (365.25 * 24.0 * 3600.0);

        let z: f64 = normal.sample(&mut self.rng);

        let state = &mut self.symbols[idx];
        let spec = &state.spec;

        let price = &mut state.price;
        match model {
            PriceModel::GeometricBrownianMotion => {
                *price += spec.drift * *price * dt + spec.volatility * *price * dt.sqrt() * z;
            }
            PriceModel::OrnsteinUhlenbeck => {
                *price += spec.mean_reversion * (spec.initial_price - *price) * dt
                    + spec.volatility * dt.sqrt() * z;
            }
            PriceModel::JumpDiffusion => {
                *price += spec.drift * *price * dt + spec.volatility * *price * dt.sqrt() * z;
                if spec.jump_intensity > 0.0 {
                    let jump_prob = spec.jump_intensity * dt;
                    if self.rng.gen::<f64>() < jump_prob {
                        let jump = spec.jump_mean + spec.jump_std * normal.sample(&mut self.rng);
                        *price *= jump.exp();
                    }
                }
            }
            PriceModel::MicrostructureNoise => {
                let base_move = spec.volatility * dt.sqrt() * z * *price;
                let noise = spec.tick_size * normal.sample(&mut self.rng) * 0.1;
                *price += base_move + noise;
            }
        }

        // Prices stay positive and on the tick grid.
        *price = price.max(spec.tick_size);
        *price = round_to_tick(*price, spec.tick_size);

        let half_spread = *price * spec.bid_ask_spread * 0.5;
        let bid = round_to_tick(*price - half_spread, spec.tick_size).max(spec.tick_size);
        let ask = round_to_tick(*price + half_spread, spec.tick_size).max(bid);

        let volume = (exp.sample(&mut self.rng) * 100.0).max(1.0);

        state.sequence_id += 1;
        Tick::new(state.symbol, *price, bid, ask, volume, state.sequence_id)
    }
}

fn round_to_tick(price: f64, tick_size: f64) -> f64 {
    (price / tick_size).round() * tick_size
}
