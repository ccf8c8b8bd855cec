//! Demo configuration structures.

use serde::{Deserialize, Serialize};

use crate::feed::PriceModel;

/// Configuration for a single simulated symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSpec {
    /// Symbol name
    pub symbol: String,
    /// Starting price
    pub initial_price: f64,
    /// Annualized volatility (e.g. 0.02 = 2%)
    pub volatility: f64,
    /// Annualized drift
    pub drift: f64,
    /// Mean reversion speed (Ornstein-Uhlenbeck only)
    pub mean_reversion: f64,
    /// Expected jumps per year (jump diffusion only)
    pub jump_intensity: f64,
    /// Mean log jump size
    pub jump_mean: f64,
    /// Log jump size volatility
    pub jump_std: f64,
    /// Relative bid/ask spread (e.g. 0.01 = 1%)
    pub bid_ask_spread: f64,
    /// Minimum price increment
    pub tick_size: f64,
}

impl SymbolSpec {
    pub fn new(symbol: impl Into<String>, initial_price: f64, volatility: f64) -> Self {
        Self {
            symbol: symbol.into(),
            initial_price,
            volatility,
            drift: 0.0,
            mean_reversion: 0.0,
            jump_intensity: 0.0,
            jump_mean: 0.0,
            jump_std: 0.01,
            bid_ask_spread: 0.01,
            tick_size: 0.01,
        }
    }
}

/// Signal engine thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Z-score breakout threshold
    pub zscore_threshold: f64,
    /// Correlation breakdown threshold
    pub correlation_threshold: f64,
    /// Volume spike threshold
    pub volume_threshold: f64,
    /// Fast EMA window for mean reversion
    pub mean_reversion_fast: usize,
    /// Slow EMA window for mean reversion
    pub mean_reversion_slow: usize,
    /// Mean reversion divergence threshold
    pub mean_reversion_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zscore_threshold: 2.5,
            correlation_threshold: 0.3,
            volume_threshold: 3.0,
            mean_reversion_fast: 10,
            mean_reversion_slow: 50,
            mean_reversion_threshold: 2.0,
        }
    }
}

/// Feed simulator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Price process driving the simulation
    pub model: PriceModel,
    /// Microseconds between tick batches (500 = 2000 Hz per symbol)
    pub tick_interval_us: u64,
    /// Tick queue size (power of two)
    pub queue_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            model: PriceModel::GeometricBrownianMotion,
            tick_interval_us: 500,
            queue_capacity: 65536,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for CSV exports
    pub csv_dir: String,
    /// Write signals.csv and latency_histogram.csv on shutdown
    pub enable_csv: bool,
    /// Print the live dashboard
    pub enable_dashboard: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_dir: "data".to_string(),
            enable_csv: true,
            enable_dashboard: true,
        }
    }
}

/// Complete demo configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Run duration in seconds
    pub duration_secs: u64,
    /// Pairs registered for correlation tracking
    pub watched_pairs: Vec<(String, String)>,
    /// Simulated symbols
    pub symbols: Vec<SymbolSpec>,
    pub engine: EngineConfig,
    pub feed: FeedConfig,
    pub output: OutputConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            watched_pairs: vec![
                ("AAPL".to_string(), "MSFT".to_string()),
                ("GOOGL".to_string(), "TSLA".to_string()),
            ],
            symbols: vec![
                SymbolSpec::new("AAPL", 180.0, 0.02),
                SymbolSpec::new("MSFT", 410.0, 0.02),
                SymbolSpec::new("GOOGL", 150.0, 0.025),
                SymbolSpec::new("TSLA", 240.0, 0.04),
            ],
            engine: EngineConfig::default(),
            feed: FeedConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
