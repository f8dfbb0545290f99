//! Wall selection over an exposure profile
//!
//! Walls are the strikes where hedging pressure concentrates. Selection is
//! bounded and deterministic:
//!
//! 1. Buckets under `noise_floor * max|exposure|` are discarded
//! 2. The strongest `per_side` positive and negative buckets are picked, plus
//!    the global maximum
//! 3. The pick is trimmed by magnitude to `max_walls`, or backfilled by
//!    magnitude up to it
//! 4. The result is ordered by strike

use config::WallConfig;
use ordered_float::OrderedFloat;
use std::collections::HashSet;
use tracing::debug;

use crate::rank;
use crate::types::{ExposureProfile, StrikeBucket, Wall};

pub const DEFAULT_MAX_WALLS: usize = 7;
pub const DEFAULT_NOISE_FLOOR: f64 = 0.2;
pub const DEFAULT_PER_SIDE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallSelector {
    max_walls: usize,
    noise_floor: f64,
    per_side: usize,
}

impl WallSelector {
    pub fn new(max_walls: usize, noise_floor: f64) -> Self {
        Self {
            max_walls,
            noise_floor: noise_floor.clamp(0.0, 1.0),
            per_side: DEFAULT_PER_SIDE,
        }
    }

    pub fn with_per_side(mut self, per_side: usize) -> Self {
        self.per_side = per_side;
        self
    }

    pub fn from_config(config: &WallConfig) -> Self {
        Self::new(config.max_walls, config.noise_floor).with_per_side(config.per_side)
    }

    pub fn max_walls(&self) -> usize {
        self.max_walls
    }

    pub fn select(&self, profile: &ExposureProfile) -> Vec<Wall> {
        let max_abs = profile.max_abs_exposure();
        if self.max_walls == 0 || max_abs <= 0.0 || !max_abs.is_finite() {
            return Vec::new();
        }

        let floor = self.noise_floor * max_abs;
        let candidates: Vec<&StrikeBucket> = profile
            .buckets()
            .iter()
            .filter(|b| b.abs_exposure() >= floor)
            .collect();

        let mut positive: Vec<&StrikeBucket> =
            candidates.iter().copied().filter(|b| b.net_exposure > 0.0).collect();
        positive.sort_by(rank::by_value_desc);

        let mut negative: Vec<&StrikeBucket> =
            candidates.iter().copied().filter(|b| b.net_exposure < 0.0).collect();
        negative.sort_by(rank::by_value_asc);

        let mut by_magnitude = candidates;
        by_magnitude.sort_by(rank::by_magnitude_desc);

        let mut picked: Vec<&StrikeBucket> = Vec::with_capacity(self.max_walls);
        let mut seen: HashSet<OrderedFloat<f64>> = HashSet::new();

        for bucket in positive.iter().copied().take(self.per_side) {
            push_unique(bucket, &mut picked, &mut seen);
        }
        for bucket in negative.iter().copied().take(self.per_side) {
            push_unique(bucket, &mut picked, &mut seen);
        }
        if let Some(top) = by_magnitude.first().copied() {
            push_unique(top, &mut picked, &mut seen);
        }

        picked.sort_by(rank::by_magnitude_desc);
        picked.truncate(self.max_walls);

        for bucket in by_magnitude.iter().copied() {
            if picked.len() >= self.max_walls {
                break;
            }
            push_unique(bucket, &mut picked, &mut seen);
        }

        picked.sort_by(rank::by_strike);

        debug!(
            symbol = %profile.symbol,
            expiration = %profile.expiration,
            buckets = profile.len(),
            walls = picked.len(),
            "Selected walls"
        );

        picked
            .into_iter()
            .map(|bucket| Wall::from_bucket(bucket, max_abs))
            .collect()
    }
}

fn push_unique<'a>(
    bucket: &'a StrikeBucket,
    picked: &mut Vec<&'a StrikeBucket>,
    seen: &mut HashSet<OrderedFloat<f64>>,
) {
    if seen.insert(OrderedFloat(bucket.strike)) {
        picked.push(bucket);
    }
}

impl Default for WallSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WALLS, DEFAULT_NOISE_FLOOR)
    }
}
