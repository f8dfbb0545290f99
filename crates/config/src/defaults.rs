use crate::ThresholdTierConfig;

pub fn default_enabled() -> bool {
    true
}

pub fn default_contract_multiplier() -> f64 {
    100.0
}

pub fn default_max_walls() -> usize {
    7
}

pub fn default_noise_floor() -> f64 {
    0.2
}

pub fn default_per_side() -> usize {
    3
}

pub fn default_baseline_window_seconds() -> u64 {
    3600
}

pub fn default_min_base_liquidity() -> u64 {
    5_000
}

pub fn default_iv_epsilon() -> f64 {
    1e-6
}

/// Deeper books need smaller relative moves to be meaningful.
pub fn default_threshold_tiers() -> Vec<ThresholdTierConfig> {
    vec![
        ThresholdTierConfig {
            min_total_oi: 500_000,
            call: 0.05,
            put: 0.05,
            iv: 0.03,
        },
        ThresholdTierConfig {
            min_total_oi: 100_000,
            call: 0.10,
            put: 0.10,
            iv: 0.05,
        },
        ThresholdTierConfig {
            min_total_oi: 10_000,
            call: 0.20,
            put: 0.20,
            iv: 0.07,
        },
        ThresholdTierConfig {
            min_total_oi: 0,
            call: 0.30,
            put: 0.30,
            iv: 0.10,
        },
    ]
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}
