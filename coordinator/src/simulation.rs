//! One process hosting the coordinator, the decay loop and every ant.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use antroute_core::{AgentCore, AgentParams, AntId, EdgeKey, SimulationConfig};

use crate::runner::{AgentOutcome, AgentRunner};
use crate::snapshot::{JsonSnapshotSink, LogSnapshotSink, SnapshotSink};
use crate::{serve_on, CoordinatorError, CoordinatorState, DecayLoop, DecayStats, Result};

/// Count-down latch: resolves once every registered unit has finished.
#[derive(Clone, Debug)]
pub struct CompletionLatch {
    remaining: Arc<watch::Sender<usize>>,
}

impl CompletionLatch {
    pub fn new(count: usize) -> Self {
        let (tx, _rx) = watch::channel(count);
        Self {
            remaining: Arc::new(tx),
        }
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    pub fn count_down(&self) {
        self.remaining.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Counts down when dropped, so a panicking task still completes.
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard {
            latch: self.clone(),
        }
    }

    pub async fn wait(&self) {
        let mut rx = self.remaining.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

pub struct CompletionGuard {
    latch: CompletionLatch,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}

#[derive(Debug)]
pub struct SimulationReport {
    pub seed: u64,
    pub outcomes: Vec<AgentOutcome>,
    pub decay: DecayStats,
    pub final_levels: Vec<(EdgeKey, f32)>,
}

impl SimulationReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    /// The `n` edges with the most pheromone, strongest first.
    pub fn strongest_edges(&self, n: usize) -> Vec<(EdgeKey, f32)> {
        let mut levels = self.final_levels.clone();
        levels.sort_by(|a, b| b.1.total_cmp(&a.1));
        levels.truncate(n);
        levels
    }
}

pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<SimulationReport> {
        let config = self.config;
        config.routing.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        info!(seed, "Using seed");
        let mut rng = StdRng::seed_from_u64(seed);

        let graph = config.graph.build(&mut rng)?;
        let sink: Arc<dyn SnapshotSink> = match &config.snapshot_dir {
            Some(dir) => Arc::new(JsonSnapshotSink::new(dir.clone())),
            None => Arc::new(LogSnapshotSink),
        };
        let state = CoordinatorState::new(graph, &config.routing).with_snapshot_sink(sink);
        let source = state.graph.source();
        let destination = state.graph.destination();

        let listener = TcpListener::bind(config.coordinator_addr).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = {
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(serve_on(listener, state.clone(), async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            }))
        };
        let decay = DecayLoop::new(Arc::clone(&state.pheromones), &config.routing)
            .spawn(shutdown_rx);

        let latch = CompletionLatch::new(config.agents as usize);
        let agent_params = AgentParams::from(&config.routing);
        let mut agents = Vec::with_capacity(config.agents as usize);
        for ant_id in 0..config.agents {
            let start = if ant_id <= config.agents / 2 {
                source
            } else {
                destination
            };
            let core = AgentCore::new(ant_id, start, source, destination, agent_params);
            let ant_rng = StdRng::seed_from_u64(agent_seed(seed, ant_id));
            let params = config.routing.clone();
            let guard = latch.guard();
            agents.push(tokio::spawn(async move {
                let _guard = guard;
                match AgentRunner::connect(addr, core, ant_rng, params).await {
                    Ok(runner) => runner.run().await,
                    Err(e) => {
                        error!(ant_id, error = %e, "Agent could not reach coordinator");
                        AgentOutcome {
                            ant_id,
                            steps: 0,
                            final_vertex: start,
                            error: Some(e),
                        }
                    }
                }
            }));
        }

        latch.wait().await;
        info!(agents = config.agents, "All agents finished");
        let _ = shutdown_tx.send(true);

        let mut outcomes = Vec::with_capacity(agents.len());
        for handle in agents {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "Agent task panicked"),
            }
        }
        let decay = decay
            .await
            .map_err(|e| CoordinatorError::Internal(format!("decay loop: {}", e)))?;
        server
            .await
            .map_err(|e| CoordinatorError::Internal(format!("server task: {}", e)))??;

        Ok(SimulationReport {
            seed,
            outcomes,
            decay,
            final_levels: state.pheromones.snapshot(),
        })
    }
}

fn agent_seed(seed: u64, ant_id: AntId) -> u64 {
    seed ^ (u64::from(ant_id) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
