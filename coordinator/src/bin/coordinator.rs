use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;

use antroute_coordinator::{start_server, CoordinatorState, DecayLoop, JsonSnapshotSink};
use antroute_core::telemetry::init_tracing;
use antroute_core::SimulationConfig;

/// Coordinator and decay loop only; ants connect from elsewhere.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    init_tracing("antroute-coordinator", "info")?;

    let config = SimulationConfig::load()?;
    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, "Using seed");
    let graph = config.graph.build(&mut StdRng::seed_from_u64(seed))?;

    let mut state = CoordinatorState::new(graph, &config.routing);
    if let Some(dir) = &config.snapshot_dir {
        state = state.with_snapshot_sink(Arc::new(JsonSnapshotSink::new(dir.clone())));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let decay = DecayLoop::new(Arc::clone(&state.pheromones), &config.routing).spawn(shutdown_rx);

    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
        tracing::info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    };

    let server_result = start_server(config.coordinator_addr, state, shutdown).await;
    let _ = decay.await;

    server_result.map_err(|e| e.into())
}
