use crate::*;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Engine: {message}")]
    InvalidEngine { message: String },

    #[error("Walls: {message}")]
    InvalidWalls { message: String },

    #[error("Flow: {message}")]
    InvalidFlow { message: String },

    #[error("No flow threshold tiers defined")]
    NoThresholdTiers,

    #[error("Threshold tier {index}: {message}")]
    InvalidThresholdTier { index: usize, message: String },

    #[error("Duplicate threshold tier for min_total_oi {0}")]
    DuplicateThresholdTier(u64),

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &GexConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_engine(&config.engine, &mut report);
    validate_walls(&config.walls, &mut report);
    validate_flow(&config.flow, &mut report);
    validate_logging(&config.logging, &mut report);

    if let Some(metrics) = &config.metrics {
        if metrics.enabled && metrics.port == 0 {
            report.add_error(ValidationError::InvalidPositiveInteger {
                field: "metrics.port".to_string(),
            });
        }
    }

    report
}

fn validate_engine(engine: &EngineConfig, report: &mut ValidationReport) {
    if !(engine.contract_multiplier.is_finite() && engine.contract_multiplier > 0.0) {
        report.add_error(ValidationError::InvalidEngine {
            message: format!(
                "contract_multiplier must be positive, got: {}",
                engine.contract_multiplier
            ),
        });
    }

    match engine.price_band {
        Some(band) if !(band > 0.0 && band < 1.0) => {
            report.add_error(ValidationError::InvalidEngine {
                message: format!("price_band must be in (0, 1), got: {}", band),
            });
        }
        Some(band) if band > 0.5 => {
            report.add_warning(
                "engine.price_band",
                "Bands wider than 50% keep deep out-of-the-money strikes",
            );
        }
        Some(_) => {}
        None => report.add_default("engine.price_band", "disabled"),
    }

    if engine.exposure_convention != ExposureConvention::DollarGamma {
        report.add_warning(
            "engine.exposure_convention",
            "Flow thresholds and noise floors are tuned for dollar_gamma magnitudes",
        );
    }
}

fn validate_walls(walls: &WallConfig, report: &mut ValidationReport) {
    if walls.max_walls == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "walls.max_walls".to_string(),
        });
    }

    if !(0.0..1.0).contains(&walls.noise_floor) {
        report.add_error(ValidationError::InvalidWalls {
            message: format!("noise_floor must be in [0, 1), got: {}", walls.noise_floor),
        });
    }

    if walls.per_side == 0 {
        report.add_warning(
            "walls.per_side",
            "No per-side picks; walls come from the global maximum and backfill only",
        );
    } else if walls.per_side * 2 + 1 > walls.max_walls && walls.max_walls > 0 {
        report.add_warning(
            "walls.per_side",
            "Per-side picks can exceed max_walls; weakest picks will be dropped",
        );
    }
}

fn validate_flow(flow: &FlowConfig, report: &mut ValidationReport) {
    if flow.baseline_window_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "flow.baseline_window_seconds".to_string(),
        });
    }

    if !(flow.iv_epsilon.is_finite() && flow.iv_epsilon > 0.0) {
        report.add_error(ValidationError::InvalidFlow {
            message: format!("iv_epsilon must be positive, got: {}", flow.iv_epsilon),
        });
    }

    if flow.thresholds.is_empty() {
        report.add_error(ValidationError::NoThresholdTiers);
        return;
    }

    let mut seen = HashSet::new();
    for (index, tier) in flow.thresholds.iter().enumerate() {
        if !seen.insert(tier.min_total_oi) {
            report.add_error(ValidationError::DuplicateThresholdTier(tier.min_total_oi));
        }

        for (name, value) in [("call", tier.call), ("put", tier.put), ("iv", tier.iv)] {
            if !(value.is_finite() && value >= 0.0) {
                report.add_error(ValidationError::InvalidThresholdTier {
                    index,
                    message: format!("{} threshold must be non-negative, got: {}", name, value),
                });
            }
        }
    }

    let descending = flow
        .thresholds
        .windows(2)
        .all(|pair| pair[0].min_total_oi > pair[1].min_total_oi);
    if !descending {
        report.add_warning(
            "flow.thresholds",
            "Tiers are not listed from highest min_total_oi down; they will be re-ordered",
        );
    }

    if !flow.thresholds.iter().any(|tier| tier.min_total_oi == 0) {
        report.add_warning(
            "flow.thresholds",
            "No tier starts at 0; baselines below every tier use the lowest tier",
        );
    }

    let lowest_tier = flow.thresholds.iter().map(|tier| tier.min_total_oi).min();
    if lowest_tier.is_some_and(|lowest| flow.min_base_liquidity < lowest) {
        report.add_warning(
            "flow.min_base_liquidity",
            "Liquidity gate is below the lowest threshold tier",
        );
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    let valid_formats = ["pretty", "json", "compact"];
    if !valid_formats.contains(&logging.format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }
}
