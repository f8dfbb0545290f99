//! Gamma exposure analytics for options chains
//!
//! This crate turns a raw options chain snapshot into a per-strike gamma
//! exposure profile, the walls where hedging pressure concentrates, a
//! directional flow signal and an IV-implied expected move.
//!
//! # Core Components
//!
//! - [`normalizer`] - Raw vendor records to validated contracts
//! - [`aggregator`] - Per-strike signed exposure and open interest sums
//! - [`walls`] - Bounded, deterministic wall selection
//! - [`baseline`] - Rolling open interest and IV baselines per (symbol, expiration)
//! - [`flow`] - Liquidity-scaled drift classification against a baseline
//! - [`expected_move`] - ATM-IV projected price band
//! - [`expiry`] - Nearest-expiration selection and horizon labels
//! - [`engine`] - One full cycle over a chain snapshot
//!
//! # Key Invariants
//!
//! - Calls add exposure and puts subtract, through [`OptionSide::sign`] only
//! - A profile has unique strikes in ascending order
//! - Wall selection is idempotent and returns at most `max_walls` strikes
//! - At most one baseline per key; it is replaced only after its window elapses
//! - Missing data and thin liquidity are never errors

pub mod aggregator;
pub mod baseline;
pub mod clock;
pub mod engine;
pub mod error;
pub mod expected_move;
pub mod expiry;
pub mod flow;
pub mod normalizer;
pub mod rank;
pub mod types;
pub mod walls;

pub use aggregator::{AggregationSettings, StrikeAggregator};
pub use baseline::{BaselineAccess, BaselineStore, InMemoryBaselineStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{ChainRequest, CycleReport, GexEngine};
pub use error::GexError;
pub use expiry::{ExpiryChoice, ExpiryHorizon};
pub use flow::{FlowClassifier, FlowRules, FlowSnapshot, ThresholdTable};
pub use normalizer::{NormalizationStats, NormalizedChain, Normalizer, RawContract};
pub use types::{
    Baseline, BaselineKey, Classification, Contract, ExpectedMove, ExposureProfile, ExposureSign,
    OptionSide, Signal, SignalReason, StrikeBucket, ThresholdTier, Wall,
};
pub use walls::WallSelector;

pub type Result<T> = std::result::Result<T, GexError>;
