//! IV-implied expected move to expiration

use chrono::NaiveDate;
use tracing::debug;

use crate::rank;
use crate::types::{Contract, ExpectedMove, OptionSide};

const DAYS_PER_YEAR: f64 = 365.0;

/// ATM IV from the closest-to-spot call and put that carry an IV.
///
/// Averages both sides when both exist, otherwise uses the one available.
pub fn atm_iv(contracts: &[Contract], spot: f64) -> Option<f64> {
    rank::atm_iv(
        contracts,
        spot,
        |c| c.strike,
        |c| quoted_iv(c, OptionSide::Call),
        |c| quoted_iv(c, OptionSide::Put),
    )
}

fn quoted_iv(contract: &Contract, side: OptionSide) -> Option<f64> {
    if contract.side == side {
        contract.iv()
    } else {
        None
    }
}

/// `spot * iv * sqrt(days / 365)`
pub fn projected_move(spot: f64, iv: f64, days_to_expiration: i64) -> f64 {
    spot * iv * (days_to_expiration as f64 / DAYS_PER_YEAR).sqrt()
}

/// Days until `expiration`, never less than one
pub fn days_to_expiration(expiration: NaiveDate, as_of: NaiveDate) -> i64 {
    (expiration - as_of).num_days().max(1)
}

/// Expected move for one expiration; contracts of other expirations are ignored
pub fn estimate(
    contracts: &[Contract],
    spot: Option<f64>,
    expiration: NaiveDate,
    as_of: NaiveDate,
) -> ExpectedMove {
    let Some(spot) = spot.filter(|s| s.is_finite() && *s > 0.0) else {
        return ExpectedMove::unavailable();
    };

    let in_expiration: Vec<Contract> = contracts
        .iter()
        .filter(|c| c.expiration == expiration)
        .cloned()
        .collect();

    let Some(iv) = atm_iv(&in_expiration, spot) else {
        debug!(%expiration, "No implied volatility near spot");
        return ExpectedMove::unavailable();
    };

    let days = days_to_expiration(expiration, as_of);
    ExpectedMove {
        spot: Some(spot),
        atm_iv: Some(iv),
        projected_move: Some(projected_move(spot, iv, days)),
        days_to_expiration: Some(days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 23).unwrap()
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn contract(strike: f64, side: OptionSide, iv: Option<f64>) -> Contract {
        Contract {
            strike,
            side,
            open_interest: 100,
            implied_volatility: iv.unwrap_or(0.0),
            has_iv: iv.is_some(),
            gamma: 0.01,
            expiration: expiry(),
        }
    }

    #[test]
    fn test_reference_scenario() {
        let contracts = vec![
            contract(95.0, OptionSide::Call, Some(0.40)),
            contract(100.0, OptionSide::Call, Some(0.24)),
            contract(100.0, OptionSide::Put, Some(0.26)),
            contract(105.0, OptionSide::Put, Some(0.40)),
        ];

        let estimate = estimate(&contracts, Some(100.0), expiry(), as_of());

        assert_eq!(estimate.days_to_expiration, Some(5));
        assert!((estimate.atm_iv.unwrap() - 0.25).abs() < 1e-12);
        assert!((estimate.projected_move.unwrap() - 2.93).abs() < 0.01);
        let (low, high) = estimate.band().unwrap();
        assert!((low - 97.07).abs() < 0.01);
        assert!((high - 102.93).abs() < 0.01);
    }

    #[test]
    fn test_one_sided_and_tie_breaking() {
        // Equidistant calls: the lower strike wins
        let contracts = vec![
            contract(98.0, OptionSide::Call, Some(0.30)),
            contract(102.0, OptionSide::Call, Some(0.50)),
            contract(100.0, OptionSide::Put, None),
        ];

        assert_eq!(atm_iv(&contracts, 100.0), Some(0.30));
    }

    #[test]
    fn test_unquoted_atm_strike_falls_through() {
        let contracts = vec![
            contract(100.0, OptionSide::Call, None),
            contract(100.0, OptionSide::Put, None),
            contract(101.0, OptionSide::Call, Some(0.30)),
        ];

        assert_eq!(atm_iv(&contracts, 100.0), Some(0.30));
    }

    #[test]
    fn test_unavailable() {
        let quoted = vec![contract(100.0, OptionSide::Call, Some(0.2))];
        let unquoted = vec![contract(100.0, OptionSide::Call, None)];

        assert!(!estimate(&quoted, None, expiry(), as_of()).is_available());
        assert!(!estimate(&quoted, Some(0.0), expiry(), as_of()).is_available());
        assert!(!estimate(&quoted, Some(f64::NAN), expiry(), as_of()).is_available());
        assert_eq!(estimate(&unquoted, Some(100.0), expiry(), as_of()), ExpectedMove::unavailable());
        assert!(estimate(&[], Some(100.0), expiry(), as_of()).band().is_none());
    }

    #[test]
    fn test_days_floor_at_one() {
        assert_eq!(days_to_expiration(expiry(), expiry()), 1);
        assert_eq!(days_to_expiration(as_of(), expiry()), 1);

        let contracts = vec![contract(100.0, OptionSide::Call, Some(0.2))];
        let same_day = estimate(&contracts, Some(100.0), expiry(), expiry());
        assert_eq!(same_day.days_to_expiration, Some(1));
    }

    #[test]
    fn test_other_expirations_ignored() {
        let mut other = contract(100.0, OptionSide::Call, Some(0.9));
        other.expiration = NaiveDate::from_ymd_opt(2026, 11, 20).unwrap();
        let contracts = vec![other, contract(110.0, OptionSide::Call, Some(0.2))];

        let estimate = estimate(&contracts, Some(100.0), expiry(), as_of());

        assert_eq!(estimate.atm_iv, Some(0.2));
    }
}
