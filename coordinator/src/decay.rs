//! Background evaporation of pheromone levels.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use antroute_core::{PheromoneTable, RoutingParams};

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecayStats {
    pub ticks: u64,
    /// Ticks where at least one entry could not be locked in time.
    pub partial_ticks: u64,
}

pub struct DecayLoop {
    table: Arc<PheromoneTable>,
    factor: f32,
    interval: Duration,
}

impl DecayLoop {
    pub fn new(table: Arc<PheromoneTable>, params: &RoutingParams) -> Self {
        Self {
            table,
            factor: params.decay_factor,
            interval: params.decay_interval(),
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<DecayStats> {
        tokio::spawn(self.run(shutdown))
    }

    /// Decay the whole table once per interval until `shutdown` flips to
    /// `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> DecayStats {
        let mut stats = DecayStats::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; evaporation starts one interval in.
        ticker.tick().await;

        info!(
            factor = self.factor,
            interval_ms = self.interval.as_millis() as u64,
            "Decay loop started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    stats.ticks += 1;
                    match self.table.decay_all(self.factor) {
                        Ok(decayed) => debug!(tick = stats.ticks, decayed, "Pheromones decayed"),
                        Err(e) => {
                            stats.partial_ticks += 1;
                            warn!(tick = stats.ticks, error = %e, "Decay tick incomplete");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!(ticks = stats.ticks, partial_ticks = stats.partial_ticks, "Decay loop stopped");
        stats
    }
}
