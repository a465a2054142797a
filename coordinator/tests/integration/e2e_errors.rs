use super::*;
use antroute_coordinator::AgentRunner;
use antroute_core::graph::samples;
use antroute_core::{AgentCore, AgentParams, AntRouteError, RoutingParams};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn fast_params() -> RoutingParams {
    RoutingParams {
        step_budget: 20,
        step_interval_ms: 1,
        snapshot_every: 0,
        ..RoutingParams::default()
    }
}

#[tokio::test]
async fn ant_on_unknown_vertex_stops_alone() {
    let state = CoordinatorState::new(samples::double_path().unwrap(), &RoutingParams::default());
    let (addr, _handle) = start_test_server(state).await;

    let lost = AgentCore::new(1, 42, 1, 6, AgentParams::default());
    let healthy = AgentCore::new(2, 1, 1, 6, AgentParams::default());

    let lost = AgentRunner::connect(addr, lost, StdRng::seed_from_u64(1), fast_params())
        .await
        .unwrap();
    let healthy = AgentRunner::connect(addr, healthy, StdRng::seed_from_u64(2), fast_params())
        .await
        .unwrap();
    let (lost, healthy) = tokio::join!(lost.run(), healthy.run());

    assert_eq!(lost.steps, 0);
    assert!(matches!(lost.error, Some(AntRouteError::Rejected(ref m)) if m.contains("NotFound")));
    assert!(healthy.is_success());
    assert_eq!(healthy.steps, 20);
}

#[tokio::test]
async fn connect_to_closed_port_is_a_connection_failure() {
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let core = AgentCore::new(0, 1, 1, 6, AgentParams::default());
    let result = AgentRunner::connect(addr, core, StdRng::seed_from_u64(0), fast_params()).await;
    assert!(matches!(result, Err(AntRouteError::ConnectionFailure(_))));
}

#[tokio::test]
async fn ant_at_isolated_vertex_has_no_candidates() {
    let graph = antroute_core::GraphModel::new(1, 3, 1..=3, Default::default()).unwrap();
    let state = CoordinatorState::new(graph, &RoutingParams::default());
    let (addr, _handle) = start_test_server(state).await;

    let core = AgentCore::new(0, 1, 1, 3, AgentParams::default());
    let outcome = AgentRunner::connect(addr, core, StdRng::seed_from_u64(0), fast_params())
        .await
        .unwrap()
        .run()
        .await;
    assert!(matches!(outcome.error, Some(AntRouteError::NoCandidates(1))));
}
