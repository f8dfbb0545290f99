//! Filter, group, rank and bound stages shared by the aggregator and wall selector

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::StrikeBucket;

/// True when `strike` lies in `[spot * (1 - band), spot * (1 + band)]`, or no band is set
pub fn in_price_band(strike: f64, spot: f64, band: Option<f64>) -> bool {
    match band {
        Some(band) => {
            let lower = spot * (1.0 - band);
            let upper = spot * (1.0 + band);
            strike >= lower && strike <= upper
        }
        None => true,
    }
}

/// Group items by a float key, ascending
pub fn group_by_key<T, F>(items: impl IntoIterator<Item = T>, key: F) -> BTreeMap<OrderedFloat<f64>, Vec<T>>
where
    F: Fn(&T) -> f64,
{
    let mut groups: BTreeMap<OrderedFloat<f64>, Vec<T>> = BTreeMap::new();
    for item in items {
        groups.entry(OrderedFloat(key(&item))).or_default().push(item);
    }
    groups
}

/// Largest `|exposure|` first; ties go to the lower strike
pub fn by_magnitude_desc(a: &&StrikeBucket, b: &&StrikeBucket) -> Ordering {
    b.abs_exposure()
        .total_cmp(&a.abs_exposure())
        .then_with(|| a.strike.total_cmp(&b.strike))
}

/// Most positive first; ties go to the lower strike
pub fn by_value_desc(a: &&StrikeBucket, b: &&StrikeBucket) -> Ordering {
    b.net_exposure
        .total_cmp(&a.net_exposure)
        .then_with(|| a.strike.total_cmp(&b.strike))
}

/// Most negative first; ties go to the lower strike
pub fn by_value_asc(a: &&StrikeBucket, b: &&StrikeBucket) -> Ordering {
    a.net_exposure
        .total_cmp(&b.net_exposure)
        .then_with(|| a.strike.total_cmp(&b.strike))
}

pub fn by_strike(a: &&StrikeBucket, b: &&StrikeBucket) -> Ordering {
    a.strike.total_cmp(&b.strike)
}

/// Item whose key is closest to `target`; the lower key wins a tie
pub fn closest_to<T, F>(items: &[T], target: f64, key: F) -> Option<&T>
where
    F: Fn(&T) -> f64,
{
    items.iter().min_by(|a, b| {
        let (ka, kb) = (key(a), key(b));
        (ka - target)
            .abs()
            .total_cmp(&(kb - target).abs())
            .then_with(|| ka.total_cmp(&kb))
    })
}

/// ATM implied volatility: the quoted call and the quoted put closest to
/// `spot`, averaged, or whichever side is quoted.
///
/// Unquoted items are skipped, so an unquoted ATM strike falls through to
/// the nearest quoted one. The lower strike wins a distance tie.
pub fn atm_iv<T, S, C, P>(items: &[T], spot: f64, strike: S, call_iv: C, put_iv: P) -> Option<f64>
where
    S: Fn(&T) -> f64,
    C: Fn(&T) -> Option<f64>,
    P: Fn(&T) -> Option<f64>,
{
    let call = closest_quoted(items, spot, &strike, &call_iv);
    let put = closest_quoted(items, spot, &strike, &put_iv);

    match (call, put) {
        (Some(call), Some(put)) => Some((call + put) / 2.0),
        (Some(iv), None) | (None, Some(iv)) => Some(iv),
        (None, None) => None,
    }
}

fn closest_quoted<T, S, V>(items: &[T], spot: f64, strike: &S, iv: &V) -> Option<f64>
where
    S: Fn(&T) -> f64,
    V: Fn(&T) -> Option<f64>,
{
    let quoted: Vec<&T> = items.iter().filter(|item| iv(*item).is_some()).collect();
    closest_to(&quoted, spot, |item| strike(*item)).and_then(|item| iv(*item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bucket(strike: f64, exposure: f64) -> StrikeBucket {
        StrikeBucket {
            expiration: NaiveDate::from_ymd_opt(2026, 10, 23).unwrap(),
            strike,
            net_exposure: exposure,
            call_oi: 0,
            put_oi: 0,
            avg_iv: None,
            call_iv: None,
            put_iv: None,
        }
    }

    #[test]
    fn test_price_band_is_inclusive() {
        assert!(in_price_band(75.0, 100.0, Some(0.25)));
        assert!(in_price_band(125.0, 100.0, Some(0.25)));
        assert!(!in_price_band(74.9, 100.0, Some(0.25)));
        assert!(!in_price_band(125.1, 100.0, Some(0.25)));
        assert!(in_price_band(1_000.0, 100.0, None));
    }

    #[test]
    fn test_group_by_key_orders_keys() {
        let groups = group_by_key(vec![105.0, 100.0, 105.0], |x| *x);
        let keys: Vec<f64> = groups.keys().map(|k| k.0).collect();
        assert_eq!(keys, vec![100.0, 105.0]);
        assert_eq!(groups[&OrderedFloat(105.0)].len(), 2);
    }

    #[test]
    fn test_magnitude_ties_break_by_strike() {
        let a = bucket(110.0, -50.0);
        let b = bucket(100.0, 50.0);
        let c = bucket(105.0, 80.0);
        let mut ranked = vec![&a, &b, &c];
        ranked.sort_by(by_magnitude_desc);

        let strikes: Vec<f64> = ranked.iter().map(|b| b.strike).collect();
        assert_eq!(strikes, vec![105.0, 100.0, 110.0]);
    }

    #[test]
    fn test_closest_to_tie() {
        let strikes = [95.0, 100.0, 105.0];
        assert_eq!(closest_to(&strikes, 102.5, |s| *s), Some(&100.0));
        assert_eq!(closest_to(&strikes, 104.0, |s| *s), Some(&105.0));
        assert_eq!(closest_to::<f64, _>(&[], 1.0, |s| *s), None);
    }

    #[test]
    fn test_atm_iv_skips_unquoted_strikes() {
        // (strike, call iv, put iv)
        let rows = [
            (99.0, None, Some(0.40)),
            (100.0, None, None),
            (101.0, Some(0.30), None),
            (103.0, Some(0.50), Some(0.20)),
        ];

        let iv = atm_iv(&rows, 100.0, |r| r.0, |r| r.1, |r| r.2);

        assert!((iv.unwrap() - 0.35).abs() < 1e-12);
        assert_eq!(atm_iv(&rows[..3], 100.0, |r| r.0, |r| r.1, |_| None), Some(0.30));
        assert_eq!(atm_iv(&rows[1..2], 100.0, |r| r.0, |r| r.1, |r| r.2), None);
    }
}
