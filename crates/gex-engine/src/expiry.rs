//! Nearest-expiration selection

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Horizon of an expiration relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryHorizon {
    /// Expiration before today; only reachable when a date is requested explicitly
    Expired,
    FirstWeekly,
    SecondWeekly,
    ThirdWeekly,
    FourthWeekly,
    Monthly,
}

impl ExpiryHorizon {
    pub fn from_days_out(days_out: i64) -> Self {
        match days_out {
            i64::MIN..=-1 => Self::Expired,
            0..=7 => Self::FirstWeekly,
            8..=14 => Self::SecondWeekly,
            15..=21 => Self::ThirdWeekly,
            22..=28 => Self::FourthWeekly,
            _ => Self::Monthly,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Expired => "Expired",
            Self::FirstWeekly => "1st Weekly",
            Self::SecondWeekly => "2nd Weekly",
            Self::ThirdWeekly => "3rd Weekly",
            Self::FourthWeekly => "4th Weekly",
            Self::Monthly => "Optimal Monthly",
        }
    }
}

impl fmt::Display for ExpiryHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryChoice {
    pub date: NaiveDate,
    pub days_out: i64,
    pub horizon: ExpiryHorizon,
}

impl ExpiryChoice {
    /// Classify an explicit date; dates before `today` come out as `Expired`
    pub fn for_date(date: NaiveDate, today: NaiveDate) -> Self {
        let days_out = (date - today).num_days();
        Self {
            date,
            days_out,
            horizon: ExpiryHorizon::from_days_out(days_out),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.days_out < 0
    }
}

/// Earliest expiration on or after `today`
pub fn next_expiration<I>(dates: I, today: NaiveDate) -> Option<ExpiryChoice>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let date = dates.into_iter().filter(|d| *d >= today).min()?;
    Some(ExpiryChoice::for_date(date, today))
}
