//! Exposure engine error types

use thiserror::Error;

/// Contract violations rejected at the normalizer boundary, plus engine setup errors.
///
/// Missing data, empty chains, stale baselines and thin liquidity are not errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GexError {
    /// Open interest below zero
    #[error("Negative open interest {value} at strike {strike}")]
    NegativeOpenInterest { strike: f64, value: i64 },

    /// Gamma below zero
    #[error("Negative gamma {value} at strike {strike}")]
    NegativeGamma { strike: f64, value: f64 },

    /// Implied volatility below zero or not finite
    #[error("Invalid implied volatility {value} at strike {strike}")]
    InvalidImpliedVolatility { strike: f64, value: f64 },

    /// Strike not finite or not positive
    #[error("Invalid strike: {0}")]
    InvalidStrike(f64),

    /// Non-finite numeric field
    #[error("Non-finite {field} at strike {strike}")]
    NonFinite { field: &'static str, strike: f64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
