//! # Market Data
//!
//! Value records and transport for the tick processing pipeline:
//!
//! - `Symbol`: interned symbol handle with cheap equality and hashing
//! - `Tick`: a single market observation
//! - `SignalEvent`: a discrete event emitted when a rule fires
//! - `SpscQueue`: wait-free bounded single-producer/single-consumer queue
//!
//! Ticks are plain `Copy` values and are moved (never shared) from the
//! producer thread to the consumer thread through the queue.

pub mod spsc;
pub mod symbol;
pub mod tick;

pub use spsc::{Consumer, Producer, QueueObserver, SpscQueue};
pub use symbol::Symbol;
pub use tick::{SignalEvent, SignalKind, Tick};
