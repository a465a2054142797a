use super::*;
use antroute_coordinator::AgentRunner;
use antroute_core::graph::samples;
use antroute_core::{AgentCore, AgentParams, EdgeKey, RoutingParams};
use antroute_proto::NeighborsRequest;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn triangle_state() -> CoordinatorState {
    CoordinatorState::new(samples::simple().unwrap(), &RoutingParams::default())
}

#[tokio::test]
async fn triangle_round_trip_doubles_closing_report() {
    let state = triangle_state();
    let (addr, _handle) = start_test_server(state.clone()).await;

    // source = destination = 1
    let core = AgentCore::new(0, 1, 1, 1, AgentParams::default());
    let mut runner = AgentRunner::with_client(
        new_client(addr).await,
        core,
        StdRng::seed_from_u64(11),
        RoutingParams::default(),
    );

    runner.step_once().await.unwrap();
    assert_eq!(runner.core().previous_vertex(), Some(1));
    let first = runner.core().current_vertex();
    assert!([2, 3].contains(&first));

    // Mid-path with a real choice: the only way on is forward.
    runner.step_once().await.unwrap();
    let second = runner.core().current_vertex();
    assert_eq!(second, 5 - first);
    assert_eq!(runner.core().modifier(), 1.0);

    runner.step_once().await.unwrap();
    assert_eq!(runner.core().current_vertex(), 1);
    assert_eq!(runner.core().modifier(), 2.0);

    // The closing edge got 2 * increment, the other two one increment each.
    let closing = state.pheromones.get(&EdgeKey::new(second, 1)).unwrap();
    let opening = state.pheromones.get(&EdgeKey::new(1, first)).unwrap();
    let middle = state.pheromones.get(&EdgeKey::new(first, second)).unwrap();
    assert!((closing - 0.03).abs() < 1e-6, "closing edge {}", closing);
    assert!((opening - 0.02).abs() < 1e-6, "opening edge {}", opening);
    assert!((middle - 0.02).abs() < 1e-6, "middle edge {}", middle);
}

#[tokio::test]
async fn runner_stops_after_budget() {
    let state = CoordinatorState::new(samples::double_path().unwrap(), &RoutingParams::default());
    let (addr, _handle) = start_test_server(state.clone()).await;

    let params = RoutingParams {
        step_budget: 25,
        step_interval_ms: 1,
        snapshot_every: 10,
        ..RoutingParams::default()
    };
    let core = AgentCore::new(3, 1, 1, 6, AgentParams::from(&params));
    let runner = AgentRunner::connect(addr, core, StdRng::seed_from_u64(3), params)
        .await
        .unwrap();
    let outcome = runner.run().await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(outcome.ant_id, 3);
    assert_eq!(outcome.steps, 25);
    assert!((1..=6).contains(&outcome.final_vertex));
}

#[tokio::test]
async fn raw_client_sees_anti_backtracking() {
    let (addr, _handle) = start_test_server(triangle_state()).await;
    let mut client = new_client(addr).await;
    let reply = client
        .get_neighbors(NeighborsRequest {
            node_id: 3,
            prev_node: Some(2),
        })
        .await
        .unwrap()
        .into_inner();
    let ids: Vec<u32> = reply.edges.iter().map(|e| e.node_id).collect();
    assert_eq!(ids, vec![1]);
}
