//! One analytics cycle: normalize, aggregate, select walls, classify flow

use chrono::NaiveDate;
use config::GexConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::{AggregationSettings, StrikeAggregator};
use crate::baseline::{BaselineStore, InMemoryBaselineStore};
use crate::clock::{Clock, SystemClock};
use crate::expected_move;
use crate::expiry::{self, ExpiryChoice, ExpiryHorizon};
use crate::flow::{FlowClassifier, FlowRules, DEFAULT_BASELINE_WINDOW};
use crate::normalizer::{NormalizationStats, Normalizer, RawContract};
use crate::types::{BaselineKey, ExpectedMove, ExposureProfile, Signal, Wall};
use crate::walls::WallSelector;
use crate::Result;

/// Chain snapshot for one symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainRequest {
    pub symbol: String,
    /// Overrides the underlying price carried by the records
    #[serde(default)]
    pub spot: Option<f64>,
    /// Expiration to analyze; the nearest unexpired one when absent
    #[serde(default)]
    pub expiration: Option<NaiveDate>,
    /// Trading date; today per the engine clock when absent
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default, rename = "results")]
    pub records: Vec<RawContract>,
}

impl ChainRequest {
    pub fn new(symbol: impl Into<String>, records: Vec<RawContract>) -> Self {
        Self {
            symbol: symbol.into(),
            records,
            ..Self::default()
        }
    }

    pub fn with_spot(mut self, spot: f64) -> Self {
        self.spot = Some(spot);
        self
    }

    pub fn with_expiration(mut self, expiration: NaiveDate) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }
}

/// Everything one cycle produced
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub expiration: Option<NaiveDate>,
    pub expiry_horizon: Option<ExpiryHorizon>,
    pub spot: Option<f64>,
    /// `None` when no expiration or spot could be resolved
    pub profile: Option<Arc<ExposureProfile>>,
    pub walls: Vec<Wall>,
    /// `None` for an empty profile
    pub signal: Option<Signal>,
    pub expected_move: ExpectedMove,
    pub stats: NormalizationStats,
}

impl CycleReport {
    fn unresolved(
        symbol: &str,
        as_of: NaiveDate,
        choice: Option<ExpiryChoice>,
        spot: Option<f64>,
        stats: NormalizationStats,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            as_of,
            expiration: choice.map(|c| c.date),
            expiry_horizon: choice.map(|c| c.horizon),
            spot,
            profile: None,
            walls: Vec::new(),
            signal: None,
            expected_move: ExpectedMove::unavailable(),
            stats,
        }
    }
}

/// Exposure analytics engine.
///
/// Shareable across threads; the only mutable state is the baseline store.
pub struct GexEngine {
    aggregator: StrikeAggregator,
    walls: WallSelector,
    classifier: FlowClassifier,
    clock: Arc<dyn Clock>,
}

impl GexEngine {
    pub fn new(
        aggregator: StrikeAggregator,
        walls: WallSelector,
        classifier: FlowClassifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            aggregator,
            walls,
            classifier,
            clock,
        }
    }

    pub fn from_config(
        config: &GexConfig,
        store: Arc<dyn BaselineStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let classifier = FlowClassifier::from_config(&config.flow, store, Arc::clone(&clock))?;
        Ok(Self::new(
            StrikeAggregator::new(AggregationSettings::from(&config.engine)),
            WallSelector::from_config(&config.walls),
            classifier,
            clock,
        ))
    }

    /// Default settings, in-memory baselines, system clock
    pub fn with_defaults() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let classifier = FlowClassifier::new(
            Arc::new(InMemoryBaselineStore::new()),
            Arc::clone(&clock),
            chrono::Duration::seconds(DEFAULT_BASELINE_WINDOW),
            FlowRules::default(),
        );
        Self::new(
            StrikeAggregator::default(),
            WallSelector::default(),
            classifier,
            clock,
        )
    }

    pub fn baselines(&self) -> &Arc<dyn BaselineStore> {
        self.classifier.store()
    }

    #[instrument(skip(self, request), fields(symbol = %request.symbol, records = request.records.len()))]
    pub fn run_cycle(&self, request: &ChainRequest) -> Result<CycleReport> {
        let as_of = request
            .as_of
            .unwrap_or_else(|| self.clock.now().date_naive());

        let mut normalizer = Normalizer::new();
        if let Some(expiration) = request.expiration {
            normalizer = normalizer.with_default_expiration(expiration);
        }
        let chain = normalizer.normalize(&request.records)?;

        let spot = request
            .spot
            .filter(|s| s.is_finite() && *s > 0.0)
            .or(chain.underlying_price);

        let choice = match request.expiration {
            Some(date) => Some(ExpiryChoice::for_date(date, as_of)),
            None => expiry::next_expiration(chain.contracts.iter().map(|c| c.expiration), as_of),
        };

        if let Some(choice) = choice.filter(ExpiryChoice::is_expired) {
            warn!(
                expiration = %choice.date,
                %as_of,
                days_out = choice.days_out,
                "Requested expiration is already past"
            );
        }

        let (Some(choice), Some(spot_price)) = (choice, spot) else {
            warn!(
                has_expiration = choice.is_some(),
                has_spot = spot.is_some(),
                "Cannot resolve expiration or spot, skipping profile"
            );
            return Ok(CycleReport::unresolved(&request.symbol, as_of, choice, spot, chain.stats));
        };

        let profile = Arc::new(self.aggregator.aggregate(
            &request.symbol,
            choice.date,
            &chain.contracts,
            spot_price,
        ));

        let purged = self.classifier.purge_stale();
        if purged > 0 {
            debug!(purged, "Dropped expired baselines");
        }

        let walls = self.walls.select(&profile);
        let signal = if profile.is_empty() {
            None
        } else {
            let key = BaselineKey::new(request.symbol.as_str(), choice.date);
            Some(self.classifier.classify(&key, &profile))
        };
        let expected_move = expected_move::estimate(&chain.contracts, spot, choice.date, as_of);

        info!(
            expiration = %choice.date,
            horizon = %choice.horizon,
            strikes = profile.len(),
            walls = walls.len(),
            classification = ?signal.map(|s| s.classification),
            "Cycle complete"
        );

        Ok(CycleReport {
            symbol: request.symbol.clone(),
            as_of,
            expiration: Some(choice.date),
            expiry_horizon: Some(choice.horizon),
            spot,
            profile: Some(profile),
            walls,
            signal,
            expected_move,
            stats: chain.stats,
        })
    }
}

impl std::fmt::Debug for GexEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GexEngine")
            .field("aggregator", &self.aggregator)
            .field("walls", &self.walls)
            .field("classifier", &self.classifier)
            .field("clock", &self.clock.name())
            .finish()
    }
}
