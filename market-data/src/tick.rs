//! Tick and signal event records.

use std::time::{Duration, Instant};

use crate::symbol::Symbol;

/// A single market observation.
///
/// All fields are `Copy`; ticks move through the SPSC queue by value.
/// A valid tick has positive finite prices, `bid_price <= ask_price`,
/// a non-negative size, and a per-symbol sequence id starting at 1.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Last trade price
    pub last_price: f64,
    /// Best bid price
    pub bid_price: f64,
    /// Best ask price
    pub ask_price: f64,
    /// Last trade quantity
    pub last_size: f64,
    /// Monotonic production timestamp, used for latency measurement
    pub timestamp: Instant,
    /// Interned symbol handle
    pub symbol: Symbol,
    /// Monotonically increasing per symbol, starting at 1
    pub sequence_id: u64,
}

impl Tick {
    /// Creates a tick stamped with the current monotonic time.
    #[inline]
    pub fn new(
        symbol: Symbol,
        last_price: f64,
        bid_price: f64,
        ask_price: f64,
        last_size: f64,
        sequence_id: u64,
    ) -> Self {
        Self {
            last_price,
            bid_price,
            ask_price,
            last_size,
            timestamp: Instant::now(),
            symbol,
            sequence_id,
        }
    }

    /// Midpoint of bid and ask.
    #[inline]
    pub fn mid_price(&self) -> f64 {
        (self.bid_price + self.ask_price) * 0.5
    }

    /// Quoted spread.
    #[inline]
    pub fn spread(&self) -> f64 {
        self.ask_price - self.bid_price
    }

    /// Spread in basis points of the midpoint (0 when the mid is not positive).
    #[inline]
    pub fn spread_bps(&self) -> f64 {
        let mid = self.mid_price();
        if mid > 0.0 {
            (self.spread() / mid) * 10000.0
        } else {
            0.0
        }
    }

    /// Checks the record invariants.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.last_price > 0.0
            && self.last_price.is_finite()
            && self.bid_price > 0.0
            && self.ask_price.is_finite()
            && self.ask_price > 0.0
            && self.bid_price <= self.ask_price
            && self.last_size >= 0.0
            && self.last_size.is_finite()
    }
}

/// Kind of a signal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    ZScoreBreak,
    CorrelationBreak,
    PairTradeEntry,
    PairTradeExit,
    VolumeSpike,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::ZScoreBreak => "ZScoreBreak",
            SignalKind::CorrelationBreak => "CorrelationBreak",
            SignalKind::PairTradeEntry => "PairTradeEntry",
            SignalKind::PairTradeExit => "PairTradeExit",
            SignalKind::VolumeSpike => "VolumeSpike",
        }
    }

    /// Fixed per-kind confidence attached to emitted events.
    pub fn confidence(&self) -> f64 {
        match self {
            SignalKind::ZScoreBreak => 0.95,
            SignalKind::CorrelationBreak => 0.88,
            SignalKind::PairTradeEntry => 0.85,
            SignalKind::PairTradeExit => 0.85,
            SignalKind::VolumeSpike => 0.90,
        }
    }
}

/// A discrete event emitted when a signal rule's firing condition is met.
#[derive(Debug, Clone, Copy)]
pub struct SignalEvent {
    pub kind: SignalKind,
    pub primary_symbol: Symbol,
    /// Set for cross-symbol signals only
    pub secondary_symbol: Option<Symbol>,
    /// Signed rule strength; meaning depends on the kind
    pub signal_strength: f64,
    pub confidence: f64,
    /// Timestamp of the triggering tick
    pub event_time: Instant,
    /// Captured when the event was emitted
    pub generation_time: Instant,
    /// Globally increasing per router instance
    pub signal_id: u64,
}

impl SignalEvent {
    /// Observation-to-emission latency.
    #[inline]
    pub fn latency(&self) -> Duration {
        self.generation_time.saturating_duration_since(self.event_time)
    }
}
