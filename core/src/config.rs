use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::GraphSpec;
use crate::{AntRouteError, Result};

/// Tunable constants of the routing algorithm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingParams {
    pub initial_level: f32,
    pub base_increment: f32,
    pub decay_factor: f32,
    pub decay_interval_ms: u64,
    pub lock_timeout_ms: u64,
    pub modifier_bonus: f32,
    pub modifier_decrement: f32,
    pub round_trip_window: u64,
    pub step_budget: u32,
    pub step_interval_ms: u64,
    /// Request a snapshot every this many steps; 0 disables snapshots.
    pub snapshot_every: u32,
    pub request_retries: u32,
}

impl Default for RoutingParams {
    fn default() -> Self {
        Self {
            initial_level: 0.01,
            base_increment: 0.01,
            decay_factor: 0.97,
            decay_interval_ms: 100,
            lock_timeout_ms: 1_000,
            modifier_bonus: 2.0,
            modifier_decrement: 0.2,
            round_trip_window: 15,
            step_budget: 2_000,
            step_interval_ms: 50,
            snapshot_every: 100,
            request_retries: 3,
        }
    }
}

impl RoutingParams {
    pub fn decay_interval(&self) -> Duration {
        Duration::from_millis(self.decay_interval_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(AntRouteError::Config(format!(
                "decay_factor must be in (0, 1], got {}",
                self.decay_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_level) {
            return Err(AntRouteError::Config(format!(
                "initial_level must be in [0, 1], got {}",
                self.initial_level
            )));
        }
        let rates = [self.base_increment, self.modifier_bonus, self.modifier_decrement];
        if rates.iter().any(|r| !r.is_finite())
            || self.base_increment < 0.0
            || self.modifier_bonus < 1.0
            || self.modifier_decrement <= 0.0
        {
            return Err(AntRouteError::Config(
                "base_increment must be >= 0, modifier_bonus >= 1 and modifier_decrement > 0".into(),
            ));
        }
        if self.decay_interval_ms == 0 {
            return Err(AntRouteError::Config("decay_interval_ms must be > 0".into()));
        }
        Ok(())
    }
}

/// Everything needed to bootstrap one simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub coordinator_addr: SocketAddr,
    pub agents: u32,
    pub seed: Option<u64>,
    pub graph: GraphSpec,
    /// Directory for JSON pheromone snapshots; snapshots are only logged when unset.
    pub snapshot_dir: Option<PathBuf>,
    pub routing: RoutingParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            coordinator_addr: SocketAddr::from(([127, 0, 0, 1], 7777)),
            agents: 15,
            seed: None,
            graph: GraphSpec::default(),
            snapshot_dir: None,
            routing: RoutingParams::default(),
        }
    }
}

impl SimulationConfig {
    /// Load from the TOML file named by `ANTROUTE_CONFIG` (or `./antroute.toml`),
    /// then apply `ANTROUTE_ADDR`, `ANTROUTE_SEED` and `ANTROUTE_AGENTS`.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load() -> Result<Self> {
        let path = std::env::var("ANTROUTE_CONFIG").unwrap_or_else(|_| "antroute.toml".into());
        let mut config = if Path::new(&path).exists() {
            let config = Self::from_toml_file(&path)?;
            tracing::info!(target = "config", path = %path, "Loaded TOML config");
            config
        } else {
            tracing::info!(target = "config", path = %path, "No TOML config found; using defaults/env");
            Self::default()
        };
        config.apply_env()?;
        config.routing.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = env_non_empty("ANTROUTE_ADDR") {
            self.coordinator_addr = addr
                .parse()
                .map_err(|e| AntRouteError::Config(format!("ANTROUTE_ADDR {:?}: {}", addr, e)))?;
        }
        if let Some(seed) = env_non_empty("ANTROUTE_SEED") {
            self.seed = Some(
                seed.parse()
                    .map_err(|e| AntRouteError::Config(format!("ANTROUTE_SEED {:?}: {}", seed, e)))?,
            );
        }
        if let Some(agents) = env_non_empty("ANTROUTE_AGENTS") {
            self.agents = agents
                .parse()
                .map_err(|e| AntRouteError::Config(format!("ANTROUTE_AGENTS {:?}: {}", agents, e)))?;
        }
        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}
