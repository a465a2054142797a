use std::time::Duration;

use antroute_coordinator::{CompletionLatch, CoordinatorError, Simulation};
use antroute_core::{AntRouteError, GraphSpec, RoutingParams, SimulationConfig};

fn config(snapshot_dir: Option<std::path::PathBuf>) -> SimulationConfig {
    SimulationConfig {
        coordinator_addr: "127.0.0.1:0".parse().unwrap(),
        agents: 5,
        seed: Some(5924385651977311760),
        graph: GraphSpec::DoublePath,
        snapshot_dir,
        routing: RoutingParams {
            step_budget: 40,
            step_interval_ms: 1,
            decay_interval_ms: 5,
            snapshot_every: 20,
            ..RoutingParams::default()
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_agent_completes_and_levels_stay_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let report = tokio::time::timeout(
        Duration::from_secs(30),
        Simulation::new(config(Some(dir.path().to_path_buf()))).run(),
    )
    .await
    .expect("simulation finished in time")
    .unwrap();

    assert_eq!(report.seed, 5924385651977311760);
    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.failed(), 0);
    assert!(report.outcomes.iter().all(|o| o.steps == 40));
    assert!(report.decay.ticks > 0);

    assert_eq!(report.final_levels.len(), 6);
    for (edge, level) in &report.final_levels {
        assert!((0.0..=1.0).contains(level), "{} out of range: {}", edge, level);
    }
    assert!(dir.path().join("pheromone_frame_20.json").exists());
    assert!(dir.path().join("pheromone_frame_40.json").exists());
}

#[tokio::test]
async fn latch_counts_down_through_guards() {
    let latch = CompletionLatch::new(3);
    let mut tasks = Vec::new();
    for i in 0..3u64 {
        let guard = latch.guard();
        tasks.push(tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_millis(5 * i)).await;
            if i == 1 {
                panic!("agent blew up");
            }
        }));
    }
    tokio::time::timeout(Duration::from_secs(1), latch.wait())
        .await
        .expect("latch released");
    assert_eq!(latch.remaining(), 0);
    for t in tasks {
        let _ = t.await;
    }
}

#[tokio::test]
async fn latch_of_zero_is_already_open() {
    let latch = CompletionLatch::new(0);
    tokio::time::timeout(Duration::from_millis(100), latch.wait())
        .await
        .expect("latch released");
}

#[tokio::test]
async fn invalid_routing_params_are_rejected_before_start() {
    let mut bad = config(None);
    bad.routing.decay_factor = f32::NAN;
    let result = Simulation::new(bad).run().await;
    assert!(matches!(result, Err(CoordinatorError::Core(AntRouteError::Config(_)))));
}
