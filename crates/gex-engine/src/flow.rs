//! Open-interest and IV drift classification against a rolling baseline

use chrono::{DateTime, Duration, Utc};
use config::{FlowConfig, ThresholdTierConfig};
use std::sync::Arc;
use tracing::debug;

use crate::baseline::BaselineStore;
use crate::clock::Clock;
use crate::error::GexError;
use crate::types::{
    Baseline, BaselineKey, Classification, ExposureProfile, Signal, SignalReason, ThresholdTier,
};
use crate::Result;

pub const DEFAULT_BASELINE_WINDOW: i64 = 3600;
pub const DEFAULT_MIN_BASE_LIQUIDITY: u64 = 5_000;
pub const DEFAULT_IV_EPSILON: f64 = 1e-6;

/// The aggregate the classifier compares: OI totals and ATM IV
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSnapshot {
    pub call_oi: u64,
    pub put_oi: u64,
    pub atm_iv: Option<f64>,
}

impl FlowSnapshot {
    pub fn from_profile(profile: &ExposureProfile) -> Self {
        Self {
            call_oi: profile.total_call_oi(),
            put_oi: profile.total_put_oi(),
            atm_iv: profile.atm_iv(),
        }
    }

    pub fn capture(&self, at: DateTime<Utc>) -> Baseline {
        Baseline {
            captured_at: at,
            call_oi: self.call_oi,
            put_oi: self.put_oi,
            atm_iv: self.atm_iv,
        }
    }
}

/// Liquidity tiers ordered from the highest `min_total_oi` down
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    tiers: Vec<ThresholdTier>,
}

impl ThresholdTable {
    pub fn new(mut tiers: Vec<ThresholdTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(GexError::Config("threshold table needs at least one tier".to_string()));
        }
        tiers.sort_by(|a, b| b.min_total_oi.cmp(&a.min_total_oi));
        tiers.dedup_by_key(|tier| tier.min_total_oi);
        Ok(Self { tiers })
    }

    pub fn from_config(tiers: &[ThresholdTierConfig]) -> Result<Self> {
        Self::new(tiers.iter().map(ThresholdTier::from).collect())
    }

    pub fn tiers(&self) -> &[ThresholdTier] {
        &self.tiers
    }

    /// First tier whose floor `total_oi` reaches; the lowest tier otherwise
    pub fn lookup(&self, total_oi: u64) -> ThresholdTier {
        self.tiers
            .iter()
            .find(|tier| total_oi >= tier.min_total_oi)
            .or_else(|| self.tiers.last())
            .copied()
            .unwrap_or(ThresholdTier {
                min_total_oi: 0,
                call: f64::INFINITY,
                put: f64::INFINITY,
                iv: f64::INFINITY,
            })
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            tiers: config::default_threshold_tiers()
                .iter()
                .map(ThresholdTier::from)
                .collect(),
        }
    }
}

/// Pure comparison rules, independent of storage and time
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRules {
    pub thresholds: ThresholdTable,
    pub min_base_liquidity: u64,
    pub iv_epsilon: f64,
}

impl Default for FlowRules {
    fn default() -> Self {
        Self {
            thresholds: ThresholdTable::default(),
            min_base_liquidity: DEFAULT_MIN_BASE_LIQUIDITY,
            iv_epsilon: DEFAULT_IV_EPSILON,
        }
    }
}

impl FlowRules {
    pub fn from_config(config: &FlowConfig) -> Result<Self> {
        Ok(Self {
            thresholds: ThresholdTable::from_config(&config.thresholds)?,
            min_base_liquidity: config.min_base_liquidity,
            iv_epsilon: config.iv_epsilon,
        })
    }

    pub fn compare(&self, today: &FlowSnapshot, base: &Baseline) -> Signal {
        let call_delta_ratio = delta_ratio(today.call_oi as f64, base.call_oi as f64, 1.0);
        let put_delta_ratio = delta_ratio(today.put_oi as f64, base.put_oi as f64, 1.0);
        let iv_delta_ratio = match (today.atm_iv, base.atm_iv) {
            (Some(now), Some(then)) => delta_ratio(now, then, self.iv_epsilon),
            _ => 0.0,
        };

        let base_total = base.total_oi();
        if base_total < self.min_base_liquidity {
            return Signal {
                classification: Classification::Neutral,
                call_delta_ratio,
                put_delta_ratio,
                iv_delta_ratio,
                reason: SignalReason::InsufficientBaseLiquidity,
                tier: None,
            };
        }

        let tier = self.thresholds.lookup(base_total);
        let iv_expanding = iv_delta_ratio >= tier.iv;

        let (classification, reason) =
            if call_delta_ratio >= tier.call && put_delta_ratio <= 0.0 && iv_expanding {
                (Classification::Bullish, SignalReason::CallBuildWithIvExpansion)
            } else if put_delta_ratio >= tier.put && call_delta_ratio <= 0.0 && iv_expanding {
                (Classification::Bearish, SignalReason::PutBuildWithIvExpansion)
            } else {
                (Classification::Neutral, SignalReason::ThresholdsNotMet)
            };

        Signal {
            classification,
            call_delta_ratio,
            put_delta_ratio,
            iv_delta_ratio,
            reason,
            tier: Some(tier),
        }
    }
}

fn delta_ratio(today: f64, base: f64, floor: f64) -> f64 {
    (today - base) / base.max(floor)
}

/// Classifies each cycle's profile against the baseline held for its key
pub struct FlowClassifier {
    store: Arc<dyn BaselineStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
    rules: FlowRules,
}

impl FlowClassifier {
    pub fn new(
        store: Arc<dyn BaselineStore>,
        clock: Arc<dyn Clock>,
        window: Duration,
        rules: FlowRules,
    ) -> Self {
        Self {
            store,
            clock,
            window,
            rules,
        }
    }

    pub fn from_config(
        config: &FlowConfig,
        store: Arc<dyn BaselineStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let seconds = i64::try_from(config.baseline_window_seconds)
            .map_err(|_| GexError::Config("baseline window out of range".to_string()))?;
        Ok(Self::new(
            store,
            clock,
            Duration::seconds(seconds),
            FlowRules::from_config(config)?,
        ))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn store(&self) -> &Arc<dyn BaselineStore> {
        &self.store
    }

    /// Drop baselines that fell out of the window as of the clock's now
    pub fn purge_stale(&self) -> usize {
        self.store.purge_stale(self.clock.now(), self.window)
    }

    pub fn classify(&self, key: &BaselineKey, profile: &ExposureProfile) -> Signal {
        let today = FlowSnapshot::from_profile(profile);
        let now = self.clock.now();

        let access = self
            .store
            .get_or_capture(key, today.capture(now), now, self.window);

        if access.captured {
            debug!(%key, clock = self.clock.name(), "No fresh baseline, captured current aggregate");
            return Signal::no_baseline();
        }

        let signal = self.rules.compare(&today, &access.baseline);
        debug!(
            %key,
            classification = ?signal.classification,
            call_delta = signal.call_delta_ratio,
            put_delta = signal.put_delta_ratio,
            iv_delta = signal.iv_delta_ratio,
            reason = %signal.reason,
            "Classified flow"
        );
        signal
    }
}

impl std::fmt::Debug for FlowClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowClassifier")
            .field("clock", &self.clock.name())
            .field("baselines", &self.store.len())
            .field("window", &self.window)
            .field("rules", &self.rules)
            .finish()
    }
}
