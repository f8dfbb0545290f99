//! Rolling baseline storage keyed by (symbol, expiration)

use chrono::{DateTime, Duration, Utc};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::types::{Baseline, BaselineKey};

/// Outcome of a baseline lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineAccess {
    pub baseline: Baseline,
    /// The candidate was stored because no fresh baseline existed
    pub captured: bool,
}

/// Keyed store holding at most one baseline per key.
///
/// Implementations must be safe to share across threads. Only
/// `get_or_capture` is used on the hot path.
pub trait BaselineStore: Send + Sync {
    fn get(&self, key: &BaselineKey) -> Option<Baseline>;

    fn put(&self, key: BaselineKey, baseline: Baseline);

    fn remove(&self, key: &BaselineKey) -> Option<Baseline>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every baseline older than `window`; returns how many were removed.
    ///
    /// Stores that cannot enumerate their entries keep the default no-op and
    /// rely on `get_or_capture` replacing stale entries per key.
    fn purge_stale(&self, _now: DateTime<Utc>, _window: Duration) -> usize {
        0
    }

    /// Return the fresh baseline for `key`, or store `candidate` in its place.
    ///
    /// The default is a plain get-then-put; stores that can do better should
    /// make the replace atomic per key.
    fn get_or_capture(
        &self,
        key: &BaselineKey,
        candidate: Baseline,
        now: DateTime<Utc>,
        window: Duration,
    ) -> BaselineAccess {
        match self.get(key) {
            Some(existing) if existing.is_fresh(now, window) => BaselineAccess {
                baseline: existing,
                captured: false,
            },
            _ => {
                self.put(key.clone(), candidate);
                BaselineAccess {
                    baseline: candidate,
                    captured: true,
                }
            }
        }
    }
}

/// In-memory baseline store.
///
/// Freshness is checked under an upgradable read lock, so readers proceed
/// while a single writer decides whether to replace an entry.
#[derive(Debug, Default)]
pub struct InMemoryBaselineStore {
    baselines: RwLock<HashMap<BaselineKey, Baseline>>,
}

impl InMemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaselineStore for InMemoryBaselineStore {
    fn get(&self, key: &BaselineKey) -> Option<Baseline> {
        self.baselines.read().get(key).copied()
    }

    fn put(&self, key: BaselineKey, baseline: Baseline) {
        self.baselines.write().insert(key, baseline);
    }

    fn remove(&self, key: &BaselineKey) -> Option<Baseline> {
        self.baselines.write().remove(key)
    }

    fn len(&self) -> usize {
        self.baselines.read().len()
    }

    fn purge_stale(&self, now: DateTime<Utc>, window: Duration) -> usize {
        let mut baselines = self.baselines.write();
        let before = baselines.len();
        baselines.retain(|_, baseline| baseline.is_fresh(now, window));
        let removed = before - baselines.len();
        if removed > 0 {
            debug!(removed, "Purged stale baselines");
        }
        removed
    }

    fn get_or_capture(
        &self,
        key: &BaselineKey,
        candidate: Baseline,
        now: DateTime<Utc>,
        window: Duration,
    ) -> BaselineAccess {
        let baselines = self.baselines.upgradable_read();

        if let Some(existing) = baselines.get(key) {
            if existing.is_fresh(now, window) {
                return BaselineAccess {
                    baseline: *existing,
                    captured: false,
                };
            }
        }

        let mut baselines = RwLockUpgradableReadGuard::upgrade(baselines);
        let previous = baselines.insert(key.clone(), candidate);

        match previous {
            Some(stale) => warn!(
                %key,
                age_seconds = stale.age(now).num_seconds(),
                "Replaced stale baseline"
            ),
            None => info!(%key, "Captured first baseline"),
        }

        BaselineAccess {
            baseline: candidate,
            captured: true,
        }
    }
}
