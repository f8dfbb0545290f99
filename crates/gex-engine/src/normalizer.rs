//! Raw snapshot records to validated contracts

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GexError;
use crate::types::{Contract, OptionSide};
use crate::Result;

/// One option record as delivered by a chain snapshot vendor.
///
/// Every field is optional; the normalizer decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContract {
    #[serde(default)]
    pub details: Option<RawDetails>,
    #[serde(default)]
    pub greeks: Option<RawGreeks>,
    #[serde(default)]
    pub open_interest: Option<i64>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub underlying_asset: Option<RawUnderlying>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetails {
    #[serde(default)]
    pub strike_price: Option<f64>,
    #[serde(default)]
    pub contract_type: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub expiration_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGreeks {
    #[serde(default)]
    pub gamma: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUnderlying {
    #[serde(default)]
    pub price: Option<f64>,
}

impl RawContract {
    pub fn new(strike: f64, contract_type: &str, gamma: f64) -> Self {
        Self {
            details: Some(RawDetails {
                strike_price: Some(strike),
                contract_type: Some(contract_type.to_string()),
                expiration_date: None,
            }),
            greeks: Some(RawGreeks { gamma: Some(gamma) }),
            ..Self::default()
        }
    }

    pub fn with_open_interest(mut self, open_interest: i64) -> Self {
        self.open_interest = Some(open_interest);
        self
    }

    pub fn with_iv(mut self, iv: f64) -> Self {
        self.implied_volatility = Some(iv);
        self
    }

    pub fn with_expiration(mut self, date: &str) -> Self {
        self.details
            .get_or_insert_with(RawDetails::default)
            .expiration_date = Some(date.to_string());
        self
    }

    pub fn with_underlying_price(mut self, price: f64) -> Self {
        self.underlying_asset = Some(RawUnderlying { price: Some(price) });
        self
    }

    fn strike(&self) -> Option<f64> {
        self.details.as_ref()?.strike_price
    }

    fn side(&self) -> Option<OptionSide> {
        OptionSide::parse(self.details.as_ref()?.contract_type.as_deref()?)
    }

    fn gamma(&self) -> Option<f64> {
        self.greeks.as_ref()?.gamma
    }

    fn expiration(&self) -> Option<NaiveDate> {
        let raw = self.details.as_ref()?.expiration_date.as_deref()?;
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
    }

    fn underlying_price(&self) -> Option<f64> {
        self.underlying_asset.as_ref()?.price
    }
}

/// Per-batch counts of what the normalizer kept, dropped and coerced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub received: usize,
    pub accepted: usize,
    pub missing_strike: usize,
    pub missing_side: usize,
    pub missing_gamma: usize,
    pub missing_expiration: usize,
    /// Accepted with IV coerced to zero
    pub missing_iv: usize,
}

impl NormalizationStats {
    pub fn dropped(&self) -> usize {
        self.received - self.accepted
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedChain {
    pub contracts: Vec<Contract>,
    pub stats: NormalizationStats,
    /// First usable underlying price seen in the batch
    pub underlying_price: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    default_expiration: Option<NaiveDate>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expiration used for records that carry none (chains fetched per expiration)
    pub fn with_default_expiration(mut self, expiration: NaiveDate) -> Self {
        self.default_expiration = Some(expiration);
        self
    }

    pub fn normalize(&self, records: &[RawContract]) -> Result<NormalizedChain> {
        let mut stats = NormalizationStats {
            received: records.len(),
            ..NormalizationStats::default()
        };
        let mut contracts = Vec::with_capacity(records.len());

        for record in records {
            if let Some(contract) = self.normalize_record(record, &mut stats)? {
                contracts.push(contract);
            }
        }
        stats.accepted = contracts.len();

        let underlying_price = records
            .iter()
            .filter_map(RawContract::underlying_price)
            .find(|price| price.is_finite() && *price > 0.0);

        if stats.dropped() > 0 {
            warn!(
                received = stats.received,
                dropped = stats.dropped(),
                missing_strike = stats.missing_strike,
                missing_side = stats.missing_side,
                missing_gamma = stats.missing_gamma,
                missing_expiration = stats.missing_expiration,
                "Skipped incomplete contract records"
            );
        }
        debug!(accepted = stats.accepted, missing_iv = stats.missing_iv, "Normalized chain");

        Ok(NormalizedChain {
            contracts,
            stats,
            underlying_price,
        })
    }

    fn normalize_record(
        &self,
        record: &RawContract,
        stats: &mut NormalizationStats,
    ) -> Result<Option<Contract>> {
        let Some(strike) = record.strike() else {
            stats.missing_strike += 1;
            return Ok(None);
        };
        let Some(side) = record.side() else {
            stats.missing_side += 1;
            return Ok(None);
        };
        let Some(gamma) = record.gamma() else {
            stats.missing_gamma += 1;
            return Ok(None);
        };
        let Some(expiration) = record.expiration().or(self.default_expiration) else {
            stats.missing_expiration += 1;
            return Ok(None);
        };

        if !strike.is_finite() || strike <= 0.0 {
            return Err(GexError::InvalidStrike(strike));
        }
        if !gamma.is_finite() {
            return Err(GexError::NonFinite {
                field: "gamma",
                strike,
            });
        }
        if gamma < 0.0 {
            return Err(GexError::NegativeGamma {
                strike,
                value: gamma,
            });
        }

        let open_interest = match record.open_interest {
            Some(value) if value < 0 => {
                return Err(GexError::NegativeOpenInterest { strike, value });
            }
            Some(value) => value as u64,
            None => 0,
        };

        let (implied_volatility, has_iv) = match record.implied_volatility {
            Some(iv) if !iv.is_finite() || iv < 0.0 => {
                return Err(GexError::InvalidImpliedVolatility { strike, value: iv });
            }
            Some(iv) => (iv, true),
            None => {
                stats.missing_iv += 1;
                (0.0, false)
            }
        };

        Ok(Some(Contract {
            strike,
            side,
            open_interest,
            implied_volatility,
            has_iv,
            gamma,
            expiration,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const EXPIRY: &str = "2026-10-23";

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 23).unwrap()
    }

    #[test]
    fn test_complete_record() {
        let records = vec![RawContract::new(100.0, "call", 0.05)
            .with_open_interest(1_200)
            .with_iv(0.31)
            .with_expiration(EXPIRY)];

        let chain = Normalizer::new().normalize(&records).unwrap();

        assert_eq!(chain.contracts.len(), 1);
        let contract = &chain.contracts[0];
        assert_eq!(contract.side, OptionSide::Call);
        assert_eq!(contract.open_interest, 1_200);
        assert_eq!(contract.iv(), Some(0.31));
        assert_eq!(contract.expiration, expiry());
        assert_eq!(chain.stats.dropped(), 0);
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let mut no_strike = RawContract::new(100.0, "call", 0.05).with_expiration(EXPIRY);
        no_strike.details.as_mut().unwrap().strike_price = None;
        let mut no_gamma = RawContract::new(100.0, "put", 0.05).with_expiration(EXPIRY);
        no_gamma.greeks = None;
        let records = vec![
            no_strike,
            RawContract::new(100.0, "warrant", 0.05).with_expiration(EXPIRY),
            no_gamma,
            RawContract::new(105.0, "put", 0.02).with_expiration(EXPIRY),
        ];

        let chain = Normalizer::new().normalize(&records).unwrap();

        assert_eq!(chain.contracts.len(), 1);
        assert_eq!(chain.stats.missing_strike, 1);
        assert_eq!(chain.stats.missing_side, 1);
        assert_eq!(chain.stats.missing_gamma, 1);
        assert_eq!(chain.stats.dropped(), 3);
    }

    #[test]
    fn test_missing_iv_and_oi_are_coerced() {
        let records = vec![RawContract::new(100.0, "put", 0.01).with_expiration(EXPIRY)];

        let chain = Normalizer::new().normalize(&records).unwrap();

        let contract = &chain.contracts[0];
        assert_eq!(contract.implied_volatility, 0.0);
        assert!(!contract.has_iv);
        assert_eq!(contract.iv(), None);
        assert_eq!(contract.open_interest, 0);
        assert_eq!(chain.stats.missing_iv, 1);
    }

    #[test]
    fn test_default_expiration_fallback() {
        let records = vec![
            RawContract::new(100.0, "call", 0.01),
            RawContract::new(100.0, "call", 0.01).with_expiration("not-a-date"),
        ];

        let skipped = Normalizer::new().normalize(&records).unwrap();
        assert!(skipped.contracts.is_empty());
        assert_eq!(skipped.stats.missing_expiration, 2);

        let filled = Normalizer::new()
            .with_default_expiration(expiry())
            .normalize(&records)
            .unwrap();
        assert_eq!(filled.contracts.len(), 2);
        assert!(filled.contracts.iter().all(|c| c.expiration == expiry()));
    }

    #[test]
    fn test_negative_open_interest_rejects_batch() {
        let records = vec![
            RawContract::new(100.0, "call", 0.01).with_expiration(EXPIRY),
            RawContract::new(105.0, "call", 0.01)
                .with_open_interest(-5)
                .with_expiration(EXPIRY),
        ];

        let err = Normalizer::new().normalize(&records).unwrap_err();
        assert_matches!(err, GexError::NegativeOpenInterest { value: -5, .. });
    }

    #[test]
    fn test_negative_gamma_and_iv_rejected() {
        let gamma = vec![RawContract::new(100.0, "call", -0.01).with_expiration(EXPIRY)];
        assert_matches!(
            Normalizer::new().normalize(&gamma),
            Err(GexError::NegativeGamma { .. })
        );

        let iv = vec![RawContract::new(100.0, "call", 0.01)
            .with_iv(-0.2)
            .with_expiration(EXPIRY)];
        assert_matches!(
            Normalizer::new().normalize(&iv),
            Err(GexError::InvalidImpliedVolatility { .. })
        );

        let strike = vec![RawContract::new(0.0, "call", 0.01).with_expiration(EXPIRY)];
        assert_matches!(
            Normalizer::new().normalize(&strike),
            Err(GexError::InvalidStrike(_))
        );
    }

    #[test]
    fn test_underlying_price_hint() {
        let records = vec![
            RawContract::new(100.0, "call", 0.01).with_underlying_price(0.0),
            RawContract::new(100.0, "call", 0.01).with_underlying_price(101.5),
            RawContract::new(100.0, "put", 0.01).with_underlying_price(99.0),
        ];

        let chain = Normalizer::new().normalize(&records).unwrap();
        assert_eq!(chain.underlying_price, Some(101.5));
    }

    #[test]
    fn test_deserialize_vendor_record() {
        let json = r#"{
            "details": {"strike_price": 190, "contract_type": "call", "expiration_date": "2026-10-23"},
            "greeks": {"gamma": 0.034, "delta": 0.52},
            "open_interest": 4211,
            "implied_volatility": 0.27,
            "underlying_asset": {"price": 189.4, "ticker": "AAPL"}
        }"#;

        let record: RawContract = serde_json::from_str(json).unwrap();
        let chain = Normalizer::new().normalize(&[record]).unwrap();

        assert_eq!(chain.contracts[0].strike, 190.0);
        assert_eq!(chain.contracts[0].open_interest, 4211);
        assert_eq!(chain.underlying_price, Some(189.4));
    }

    #[test]
    fn test_empty_batch() {
        let chain = Normalizer::new().normalize(&[]).unwrap();
        assert!(chain.contracts.is_empty());
        assert_eq!(chain.stats, NormalizationStats::default());
        assert!(chain.underlying_price.is_none());
    }
}
