//! # Signal Engine
//!
//! Rule evaluation and routing for the tick pipeline:
//!
//! - **Rules**: stateful evaluators over observation streams reporting
//!   `(fires, strength)`: `ZScoreRule`, `VolumeRule`, `MeanReversionRule`,
//!   `CorrelationBreakRule`
//! - **Router**: owns per-symbol and per-pair rule state, drives every rule
//!   on each tick, and emits `SignalEvent`s through a synchronous sink
//! - **LatencyHistogram**: lock-free bucketed latency and throughput
//!   accounting, readable from any thread
//!
//! The router's `process` is single-threaded by contract (the consumer
//! thread); its telemetry is shared with observer threads through
//! [`router::RouterStats`].

pub mod latency;
pub mod router;
pub mod rules;

// Re-exports
pub use latency::{BucketSnapshot, LatencyHistogram};
pub use router::{Router, RouterStats};
pub use rules::{
    CorrelationBreakRule, Evaluation, MeanReversionRule, SignalRule, VolumeRule, ZScoreRule,
};
