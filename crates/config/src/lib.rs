use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root configuration for the gamma exposure engine and its operator binary.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GexConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub walls: WallConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
}

/// How per-contract gamma is turned into exposure.
///
/// `dollar_gamma` is canonical: `gamma * oi * multiplier * sign * spot`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureConvention {
    #[default]
    DollarGamma,
    /// `gamma * oi * multiplier * sign`, without the spot multiplier
    GammaOpenInterest,
    /// `|gamma| * oi * multiplier`, calls and puts both add
    UnsignedGamma,
}

impl ExposureConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureConvention::DollarGamma => "dollar_gamma",
            ExposureConvention::GammaOpenInterest => "gamma_open_interest",
            ExposureConvention::UnsignedGamma => "unsigned_gamma",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub exposure_convention: ExposureConvention,
    /// Shares per contract
    #[serde(default = "default_contract_multiplier")]
    pub contract_multiplier: f64,
    /// Keep only strikes within `spot * (1 ± price_band)`
    #[serde(default)]
    pub price_band: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exposure_convention: ExposureConvention::default(),
            contract_multiplier: default_contract_multiplier(),
            price_band: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WallConfig {
    /// Upper bound on the number of walls returned
    #[serde(default = "default_max_walls")]
    pub max_walls: usize,
    /// Buckets below `noise_floor * max|exposure|` are never walls
    #[serde(default = "default_noise_floor")]
    pub noise_floor: f64,
    /// Strongest strikes taken from each side before backfilling
    #[serde(default = "default_per_side")]
    pub per_side: usize,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            max_walls: default_max_walls(),
            noise_floor: default_noise_floor(),
            per_side: default_per_side(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowConfig {
    /// Age after which a baseline is replaced
    #[serde(default = "default_baseline_window_seconds")]
    pub baseline_window_seconds: u64,
    /// Baselines with less total open interest always classify Neutral
    #[serde(default = "default_min_base_liquidity")]
    pub min_base_liquidity: u64,
    #[serde(default = "default_iv_epsilon")]
    pub iv_epsilon: f64,
    /// Liquidity tiers; the engine evaluates them from highest `min_total_oi` down
    #[serde(default = "default_threshold_tiers")]
    pub thresholds: Vec<ThresholdTierConfig>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            baseline_window_seconds: default_baseline_window_seconds(),
            min_base_liquidity: default_min_base_liquidity(),
            iv_epsilon: default_iv_epsilon(),
            thresholds: default_threshold_tiers(),
        }
    }
}

/// One row of the liquidity-scaled threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThresholdTierConfig {
    pub min_total_oi: u64,
    pub call: f64,
    pub put: f64,
    pub iv: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// One of: pretty, json, compact
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_metrics_port(),
        }
    }
}
