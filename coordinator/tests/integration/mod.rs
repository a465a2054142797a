//! Coordinator Integration Test Module
//!
//! Tests run a real gRPC server on an ephemeral port:
//!
//! - `e2e_agent_walk`: a single ant stepping through the protocol
//! - `e2e_errors`: failures stay confined to the ant that hit them
//! - `e2e_simulation`: full simulation with decay and completion counting

use std::net::SocketAddr;

use antroute_coordinator::{CoordinatorService, CoordinatorState};
use antroute_proto::coordinator_server::CoordinatorServer;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

pub use antroute_proto::coordinator_client::CoordinatorClient;

/// Start a coordinator on an ephemeral localhost port and return the bound address
pub async fn start_test_server(
    state: CoordinatorState,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let svc = CoordinatorService::new(state);

    // Bind to 127.0.0.1:0 for an ephemeral port
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().unwrap();
    let incoming = TcpListenerStream::new(listener);

    let handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(CoordinatorServer::new(svc))
            .serve_with_incoming(incoming)
            .await
            .expect("server exited cleanly");
    });

    (addr, handle)
}

/// Create a new Coordinator client connected to the given address
pub async fn new_client(addr: SocketAddr) -> CoordinatorClient<tonic::transport::Channel> {
    let endpoint = format!("http://{}", addr);
    CoordinatorClient::connect(endpoint)
        .await
        .expect("connect client")
}

mod e2e_agent_walk;
mod e2e_errors;
mod e2e_simulation;
