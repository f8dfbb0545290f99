//! Strike aggregation into an exposure profile

use chrono::NaiveDate;
use config::{EngineConfig, ExposureConvention};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::rank;
use crate::types::{Contract, ExposureProfile, IvMean, OptionSide, StrikeBucket};

pub const DEFAULT_CONTRACT_MULTIPLIER: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationSettings {
    pub convention: ExposureConvention,
    pub contract_multiplier: f64,
    pub price_band: Option<f64>,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            convention: ExposureConvention::DollarGamma,
            contract_multiplier: DEFAULT_CONTRACT_MULTIPLIER,
            price_band: None,
        }
    }
}

impl From<&EngineConfig> for AggregationSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            convention: config.exposure_convention,
            contract_multiplier: config.contract_multiplier,
            price_band: config.price_band,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrikeAggregator {
    settings: AggregationSettings,
}

impl StrikeAggregator {
    pub fn new(settings: AggregationSettings) -> Self {
        Self { settings }
    }

    pub fn with_price_band(band: f64) -> Self {
        Self::new(AggregationSettings {
            price_band: Some(band),
            ..AggregationSettings::default()
        })
    }

    pub fn settings(&self) -> &AggregationSettings {
        &self.settings
    }

    /// Exposure one contract contributes under the configured convention
    pub fn contract_exposure(&self, contract: &Contract, spot: f64) -> f64 {
        let base = contract.gamma * contract.open_interest as f64 * self.settings.contract_multiplier;
        match self.settings.convention {
            ExposureConvention::DollarGamma => base * contract.side.sign() * spot,
            ExposureConvention::GammaOpenInterest => base * contract.side.sign(),
            ExposureConvention::UnsignedGamma => base.abs(),
        }
    }

    /// Build the profile of one expiration; contracts of other expirations are ignored
    pub fn aggregate(
        &self,
        symbol: &str,
        expiration: NaiveDate,
        contracts: &[Contract],
        spot: f64,
    ) -> ExposureProfile {
        let convention = self.settings.convention;

        if !(spot.is_finite() && spot > 0.0) {
            warn!(symbol, spot, "Spot unavailable, returning empty profile");
            return ExposureProfile::empty(symbol, expiration, spot, convention);
        }

        let in_scope = contracts.iter().filter(|c| {
            c.expiration == expiration && rank::in_price_band(c.strike, spot, self.settings.price_band)
        });
        let groups = rank::group_by_key(in_scope, |c| c.strike);

        let buckets: Vec<StrikeBucket> = groups
            .into_iter()
            .map(|(strike, group)| self.bucket(expiration, strike.0, &group, spot))
            .collect();

        debug!(
            symbol,
            %expiration,
            contracts = contracts.len(),
            strikes = buckets.len(),
            convention = convention.as_str(),
            "Aggregated exposure profile"
        );

        // Keys come out of a BTreeMap, so buckets are already sorted and unique
        ExposureProfile::from_buckets(symbol, expiration, spot, convention, buckets)
    }

    /// One profile per expiration present in `contracts`
    pub fn aggregate_by_expiration(
        &self,
        symbol: &str,
        contracts: &[Contract],
        spot: f64,
    ) -> BTreeMap<NaiveDate, ExposureProfile> {
        let mut expirations: Vec<NaiveDate> = contracts.iter().map(|c| c.expiration).collect();
        expirations.sort_unstable();
        expirations.dedup();

        expirations
            .into_iter()
            .map(|expiration| (expiration, self.aggregate(symbol, expiration, contracts, spot)))
            .collect()
    }

    fn bucket(&self, expiration: NaiveDate, strike: f64, group: &[&Contract], spot: f64) -> StrikeBucket {
        let mut net_exposure = 0.0;
        let mut call_oi = 0u64;
        let mut put_oi = 0u64;
        let mut all_iv = IvMean::default();
        let mut call_iv = IvMean::default();
        let mut put_iv = IvMean::default();

        for contract in group {
            net_exposure += self.contract_exposure(contract, spot);
            all_iv.add(contract.iv());
            match contract.side {
                OptionSide::Call => {
                    call_oi = call_oi.saturating_add(contract.open_interest);
                    call_iv.add(contract.iv());
                }
                OptionSide::Put => {
                    put_oi = put_oi.saturating_add(contract.open_interest);
                    put_iv.add(contract.iv());
                }
            }
        }

        StrikeBucket {
            expiration,
            strike,
            net_exposure,
            call_oi,
            put_oi,
            avg_iv: all_iv.mean(),
            call_iv: call_iv.mean(),
            put_iv: put_iv.mean(),
        }
    }
}
