//! Shared pheromone levels, one entry per registered edge.
//!
//! The map itself is filled once at construction and only read afterwards,
//! so looking up an entry never waits on a writer. Each level sits behind its
//! own lock: updates to one edge are linearizable and never hold up another
//! edge. Entry locks are acquired with a bounded wait; an entry that stays
//! locked past `lock_timeout` yields [`AntRouteError::LockTimeout`] instead of
//! an unapplied update.

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::graph::EdgeKey;
use crate::{AntRouteError, Result};

pub const DEFAULT_INITIAL_LEVEL: f32 = 0.01;
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a single reinforcement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reinforcement {
    Applied { level: f32 },
    /// `level + amount` would exceed 1; the level was left as is.
    Saturated { level: f32 },
}

impl Reinforcement {
    pub fn level(&self) -> f32 {
        match self {
            Reinforcement::Applied { level } | Reinforcement::Saturated { level } => *level,
        }
    }
}

#[derive(Debug)]
pub struct PheromoneTable {
    // Never inserted into or removed from after `new`.
    levels: DashMap<EdgeKey, Mutex<f32>>,
    keys: Vec<EdgeKey>,
    lock_timeout: Duration,
}

impl PheromoneTable {
    /// Register every edge at `initial_level`. No entries are added later.
    pub fn new(edges: impl IntoIterator<Item = EdgeKey>, initial_level: f32) -> Self {
        let level = initial_level.clamp(0.0, 1.0);
        let levels = DashMap::new();
        for key in edges {
            levels.insert(key, Mutex::new(level));
        }
        let mut keys: Vec<EdgeKey> = levels.iter().map(|e| *e.key()).collect();
        keys.sort();
        debug!(edges = keys.len(), initial_level = level, "Pheromone table created");
        Self {
            levels,
            keys,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: &EdgeKey) -> Result<f32> {
        self.update(key, |level| *level)
    }

    /// Run `f` on the level of `key` while holding that entry's lock.
    ///
    /// Other edges stay available for the whole call.
    pub fn update<T>(&self, key: &EdgeKey, f: impl FnOnce(&mut f32) -> T) -> Result<T> {
        self.update_within(key, Instant::now(), f)
    }

    /// Add `amount` unless that would push the level above 1.
    pub fn reinforce(&self, key: &EdgeKey, amount: f32) -> Result<Reinforcement> {
        self.update(key, |level| {
            let proposed = *level + amount;
            if (0.0..=1.0).contains(&proposed) {
                *level = proposed;
                Reinforcement::Applied { level: proposed }
            } else {
                Reinforcement::Saturated { level: *level }
            }
        })
    }

    /// Multiply every level by `factor`, one entry at a time.
    ///
    /// The whole pass shares one `lock_timeout` budget. Entries that are
    /// free are always decayed, even after the budget is spent; an entry
    /// still locked when it runs out is skipped and the first such edge is
    /// returned as a `LockTimeout` once the pass is over. Returns the number
    /// of decayed entries on success.
    pub fn decay_all(&self, factor: f32) -> Result<usize> {
        let factor = factor.clamp(0.0, 1.0);
        let started = Instant::now();
        let mut decayed = 0;
        let mut first_timeout = None;
        for key in &self.keys {
            match self.update_within(key, started, |level| *level *= factor) {
                Ok(()) => decayed += 1,
                Err(err @ AntRouteError::LockTimeout { .. }) => {
                    if first_timeout.is_none() {
                        first_timeout = Some(err);
                    }
                }
                Err(err) => return Err(err),
            }
        }
        match first_timeout {
            Some(err) => Err(err),
            None => Ok(decayed),
        }
    }

    /// Point-in-time copy of the levels, in key order.
    ///
    /// Each value is read under its entry lock; the copy as a whole is not
    /// atomic with respect to concurrent updates. Like `decay_all`, the pass
    /// shares one `lock_timeout` budget, and entries still locked when it
    /// runs out are left out of the copy.
    pub fn snapshot(&self) -> Vec<(EdgeKey, f32)> {
        let started = Instant::now();
        self.keys
            .iter()
            .filter_map(|key| match self.update_within(key, started, |level| *level) {
                Ok(level) => Some((*key, level)),
                Err(e) => {
                    warn!(edge = %key, error = %e, "Edge left out of snapshot");
                    None
                }
            })
            .collect()
    }

    fn update_within<T>(
        &self,
        key: &EdgeKey,
        started: Instant,
        f: impl FnOnce(&mut f32) -> T,
    ) -> Result<T> {
        let slot = self
            .levels
            .get(key)
            .ok_or(AntRouteError::UnknownEdge(*key))?;
        let mut level = self.lock(key, &slot, started)?;
        Ok(f(&mut level))
    }

    fn lock<'a>(
        &self,
        key: &EdgeKey,
        slot: &'a Mutex<f32>,
        started: Instant,
    ) -> Result<MutexGuard<'a, f32>> {
        let deadline = started + self.lock_timeout;
        loop {
            match slot.try_lock() {
                Ok(guard) => return Ok(guard),
                // A plain float cannot be left half-written by a panic.
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        let waited = started.elapsed();
                        warn!(
                            edge = %key,
                            waited_ms = waited.as_millis() as u64,
                            "Pheromone entry lock timed out"
                        );
                        return Err(AntRouteError::LockTimeout {
                            edge: *key,
                            waited,
                        });
                    }
                    std::thread::yield_now();
                }
            }
        }
    }
}
