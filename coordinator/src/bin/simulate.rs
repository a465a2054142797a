use antroute_coordinator::Simulation;
use antroute_core::telemetry::init_tracing;
use antroute_core::SimulationConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    init_tracing("antroute-sim", "info")?;

    let config = SimulationConfig::load()?;
    tracing::info!(
        addr = %config.coordinator_addr,
        agents = config.agents,
        graph = ?config.graph,
        "Starting simulation"
    );

    let report = Simulation::new(config).run().await?;

    tracing::info!(
        seed = report.seed,
        agents = report.outcomes.len(),
        failed = report.failed(),
        decay_ticks = report.decay.ticks,
        "Simulation complete"
    );
    for (edge, level) in report.strongest_edges(5) {
        tracing::info!(edge = %edge, level, "Strong edge");
    }
    Ok(())
}
