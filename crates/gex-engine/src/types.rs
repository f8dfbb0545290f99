//! Shared types for the exposure engine

use chrono::{DateTime, Duration, NaiveDate, Utc};
use config::{ExposureConvention, ThresholdTierConfig};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use crate::rank;

/// Option side (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    /// Exposure sign: calls add, puts subtract
    pub fn sign(&self) -> f64 {
        match self {
            OptionSide::Call => 1.0,
            OptionSide::Put => -1.0,
        }
    }

    /// Parse from a vendor contract type (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Some(Self::Call),
            "put" | "p" => Some(Self::Put),
            _ => None,
        }
    }
}

/// A validated option contract, immutable for one fetch cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub strike: f64,
    pub side: OptionSide,
    pub open_interest: u64,
    /// Zero when the vendor sent none; see `has_iv`
    pub implied_volatility: f64,
    pub has_iv: bool,
    pub gamma: f64,
    pub expiration: NaiveDate,
}

impl Contract {
    pub fn iv(&self) -> Option<f64> {
        self.has_iv.then_some(self.implied_volatility)
    }
}

/// Aggregated exposure at one (expiration, strike)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeBucket {
    pub expiration: NaiveDate,
    pub strike: f64,
    pub net_exposure: f64,
    pub call_oi: u64,
    pub put_oi: u64,
    pub avg_iv: Option<f64>,
    /// Mean IV of the quoted calls at this strike
    #[serde(default)]
    pub call_iv: Option<f64>,
    #[serde(default)]
    pub put_iv: Option<f64>,
}

impl StrikeBucket {
    pub fn abs_exposure(&self) -> f64 {
        self.net_exposure.abs()
    }

    pub fn total_oi(&self) -> u64 {
        self.call_oi.saturating_add(self.put_oi)
    }
}

/// Per-strike exposure for one (symbol, expiration), ascending by strike.
///
/// Strikes are unique. Build through the aggregator or [`ExposureProfile::from_buckets`],
/// which merges duplicate strikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureProfile {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub spot: f64,
    pub convention: ExposureConvention,
    buckets: Vec<StrikeBucket>,
}

impl ExposureProfile {
    pub fn empty(
        symbol: impl Into<String>,
        expiration: NaiveDate,
        spot: f64,
        convention: ExposureConvention,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            expiration,
            spot,
            convention,
            buckets: Vec::new(),
        }
    }

    pub fn from_buckets(
        symbol: impl Into<String>,
        expiration: NaiveDate,
        spot: f64,
        convention: ExposureConvention,
        buckets: impl IntoIterator<Item = StrikeBucket>,
    ) -> Self {
        let mut merged: BTreeMap<OrderedFloat<f64>, StrikeBucket> = BTreeMap::new();
        let mut ivs: BTreeMap<OrderedFloat<f64>, [IvMean; 3]> = BTreeMap::new();

        for bucket in buckets {
            let key = OrderedFloat(bucket.strike);
            let [all, call, put] = ivs.entry(key).or_default();
            all.add(bucket.avg_iv);
            call.add(bucket.call_iv);
            put.add(bucket.put_iv);
            match merged.entry(key) {
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    existing.net_exposure += bucket.net_exposure;
                    existing.call_oi = existing.call_oi.saturating_add(bucket.call_oi);
                    existing.put_oi = existing.put_oi.saturating_add(bucket.put_oi);
                }
                Entry::Vacant(entry) => {
                    entry.insert(bucket);
                }
            }
        }

        let buckets = merged
            .into_iter()
            .map(|(key, mut bucket)| {
                if let Some([all, call, put]) = ivs.get(&key) {
                    bucket.avg_iv = all.mean();
                    bucket.call_iv = call.mean();
                    bucket.put_iv = put.mean();
                }
                bucket
            })
            .collect();

        Self {
            symbol: symbol.into(),
            expiration,
            spot,
            convention,
            buckets,
        }
    }

    pub fn buckets(&self) -> &[StrikeBucket] {
        &self.buckets
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket(&self, strike: f64) -> Option<&StrikeBucket> {
        self.buckets
            .binary_search_by(|b| b.strike.total_cmp(&strike))
            .ok()
            .map(|idx| &self.buckets[idx])
    }

    pub fn total_call_oi(&self) -> u64 {
        self.buckets.iter().fold(0u64, |acc, b| acc.saturating_add(b.call_oi))
    }

    pub fn total_put_oi(&self) -> u64 {
        self.buckets.iter().fold(0u64, |acc, b| acc.saturating_add(b.put_oi))
    }

    pub fn net_exposure(&self) -> f64 {
        self.buckets.iter().map(|b| b.net_exposure).sum()
    }

    pub fn max_abs_exposure(&self) -> f64 {
        self.buckets
            .iter()
            .map(StrikeBucket::abs_exposure)
            .fold(0.0, f64::max)
    }

    /// Bucket closest to spot; the lower strike wins a tie
    pub fn atm_bucket(&self) -> Option<&StrikeBucket> {
        rank::closest_to(&self.buckets, self.spot, |b| b.strike)
    }

    /// ATM IV from the closest strikes with a quoted call and a quoted put
    pub fn atm_iv(&self) -> Option<f64> {
        rank::atm_iv(&self.buckets, self.spot, |b| b.strike, |b| b.call_iv, |b| b.put_iv)
    }

    /// `(strike, exposure / max(max|exposure|, 1.0))` for every bucket
    pub fn normalized(&self) -> Vec<(f64, f64)> {
        let denom = self.max_abs_exposure().max(1.0);
        self.buckets
            .iter()
            .map(|b| (b.strike, b.net_exposure / denom))
            .collect()
    }
}

/// Running mean of the IVs present in a group
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct IvMean {
    sum: f64,
    count: usize,
}

impl IvMean {
    pub(crate) fn add(&mut self, iv: Option<f64>) {
        if let Some(iv) = iv {
            self.sum += iv;
            self.count += 1;
        }
    }

    pub(crate) fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureSign {
    Positive,
    Negative,
}

impl ExposureSign {
    pub fn of(exposure: f64) -> Self {
        if exposure < 0.0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }
}

/// A strike carrying concentrated exposure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub strike: f64,
    /// `|exposure| / max|exposure|` over the source profile
    pub strength: f64,
    pub sign: ExposureSign,
    pub exposure: f64,
}

impl Wall {
    pub fn from_bucket(bucket: &StrikeBucket, max_abs: f64) -> Self {
        Self {
            strike: bucket.strike,
            strength: bucket.abs_exposure() / max_abs,
            sign: ExposureSign::of(bucket.net_exposure),
            exposure: bucket.net_exposure,
        }
    }
}

/// Key of one rolling baseline
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaselineKey {
    pub symbol: String,
    pub expiration: NaiveDate,
}

impl BaselineKey {
    pub fn new(symbol: impl Into<String>, expiration: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            expiration,
        }
    }
}

impl fmt::Display for BaselineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.expiration)
    }
}

/// Open interest and ATM IV captured at the start of a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub captured_at: DateTime<Utc>,
    pub call_oi: u64,
    pub put_oi: u64,
    pub atm_iv: Option<f64>,
}

impl Baseline {
    pub fn total_oi(&self) -> u64 {
        self.call_oi.saturating_add(self.put_oi)
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.captured_at
    }

    /// Fresh until its age exceeds `window`
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) <= window
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Bullish,
    Bearish,
    Neutral,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Bullish => "bullish",
            Classification::Bearish => "bearish",
            Classification::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReason {
    NoBaseline,
    InsufficientBaseLiquidity,
    CallBuildWithIvExpansion,
    PutBuildWithIvExpansion,
    ThresholdsNotMet,
}

impl fmt::Display for SignalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SignalReason::NoBaseline => "no baseline",
            SignalReason::InsufficientBaseLiquidity => "insufficient base liquidity",
            SignalReason::CallBuildWithIvExpansion => "call open interest build with IV expansion",
            SignalReason::PutBuildWithIvExpansion => "put open interest build with IV expansion",
            SignalReason::ThresholdsNotMet => "thresholds not met",
        };
        f.write_str(text)
    }
}

/// Relative-move thresholds for one liquidity tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTier {
    pub min_total_oi: u64,
    pub call: f64,
    pub put: f64,
    pub iv: f64,
}

impl From<&ThresholdTierConfig> for ThresholdTier {
    fn from(tier: &ThresholdTierConfig) -> Self {
        Self {
            min_total_oi: tier.min_total_oi,
            call: tier.call,
            put: tier.put,
            iv: tier.iv,
        }
    }
}

/// Directional flow read, recomputed every cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub classification: Classification,
    pub call_delta_ratio: f64,
    pub put_delta_ratio: f64,
    pub iv_delta_ratio: f64,
    pub reason: SignalReason,
    /// Tier the ratios were judged against, if any
    pub tier: Option<ThresholdTier>,
}

impl Signal {
    pub fn no_baseline() -> Self {
        Self {
            classification: Classification::Neutral,
            call_delta_ratio: 0.0,
            put_delta_ratio: 0.0,
            iv_delta_ratio: 0.0,
            reason: SignalReason::NoBaseline,
            tier: None,
        }
    }
}

/// IV-implied one-sigma move to expiration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedMove {
    pub spot: Option<f64>,
    pub atm_iv: Option<f64>,
    pub projected_move: Option<f64>,
    pub days_to_expiration: Option<i64>,
}

impl ExpectedMove {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.projected_move.is_some()
    }

    /// `(spot - move, spot + move)`
    pub fn band(&self) -> Option<(f64, f64)> {
        let spot = self.spot?;
        let projected = self.projected_move?;
        Some((spot - projected, spot + projected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 23).unwrap()
    }

    fn bucket(strike: f64, exposure: f64) -> StrikeBucket {
        StrikeBucket {
            expiration: date(),
            strike,
            net_exposure: exposure,
            call_oi: 10,
            put_oi: 5,
            avg_iv: Some(0.2),
            call_iv: Some(0.2),
            put_iv: None,
        }
    }

    #[test]
    fn test_side_parse() {
        assert_eq!(OptionSide::parse("call"), Some(OptionSide::Call));
        assert_eq!(OptionSide::parse(" PUT "), Some(OptionSide::Put));
        assert_eq!(OptionSide::parse("straddle"), None);
        assert_eq!(OptionSide::Call.sign(), 1.0);
        assert_eq!(OptionSide::Put.sign(), -1.0);
    }

    #[test]
    fn test_from_buckets_sorts_and_merges() {
        let profile = ExposureProfile::from_buckets(
            "SPY",
            date(),
            102.0,
            ExposureConvention::DollarGamma,
            vec![bucket(105.0, 10.0), bucket(100.0, -4.0), bucket(105.0, 5.0)],
        );

        assert_eq!(profile.len(), 2);
        assert_eq!(profile.buckets()[0].strike, 100.0);
        let merged = profile.bucket(105.0).unwrap();
        assert_eq!(merged.net_exposure, 15.0);
        assert_eq!(merged.call_oi, 20);
        assert!((merged.avg_iv.unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(profile.total_call_oi(), 30);
        assert_eq!(profile.total_put_oi(), 15);
    }

    #[test]
    fn test_atm_bucket_prefers_lower_strike_on_tie() {
        let profile = ExposureProfile::from_buckets(
            "SPY",
            date(),
            102.5,
            ExposureConvention::DollarGamma,
            vec![bucket(100.0, 1.0), bucket(105.0, 1.0), bucket(110.0, 1.0)],
        );

        assert_eq!(profile.atm_bucket().unwrap().strike, 100.0);
    }

    #[test]
    fn test_normalized_floors_denominator() {
        let profile = ExposureProfile::from_buckets(
            "SPY",
            date(),
            100.0,
            ExposureConvention::GammaOpenInterest,
            vec![bucket(100.0, 0.5), bucket(105.0, -0.25)],
        );

        let normalized = profile.normalized();
        assert_eq!(normalized, vec![(100.0, 0.5), (105.0, -0.25)]);

        let empty = ExposureProfile::empty("SPY", date(), 100.0, ExposureConvention::DollarGamma);
        assert!(empty.normalized().is_empty());
        assert_eq!(empty.max_abs_exposure(), 0.0);
    }

    #[test]
    fn test_baseline_freshness_edges() {
        let captured_at = DateTime::parse_from_rfc3339("2026-10-19T14:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let baseline = Baseline {
            captured_at,
            call_oi: 1,
            put_oi: 1,
            atm_iv: None,
        };
        let window = Duration::hours(1);
        let epsilon = Duration::milliseconds(1);

        assert!(baseline.is_fresh(captured_at + window - epsilon, window));
        assert!(baseline.is_fresh(captured_at + window, window));
        assert!(!baseline.is_fresh(captured_at + window + epsilon, window));
    }

    #[test]
    fn test_expected_move_band() {
        let em = ExpectedMove {
            spot: Some(100.0),
            atm_iv: Some(0.25),
            projected_move: Some(3.0),
            days_to_expiration: Some(5),
        };
        assert_eq!(em.band(), Some((97.0, 103.0)));
        assert!(ExpectedMove::unavailable().band().is_none());
    }

    #[test]
    fn test_signal_reason_display() {
        assert_eq!(
            SignalReason::InsufficientBaseLiquidity.to_string(),
            "insufficient base liquidity"
        );
        assert_eq!(SignalReason::NoBaseline.to_string(), "no baseline");
    }
}
