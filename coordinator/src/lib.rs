use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use antroute_core::{
    AntId, AntRouteError, Candidate, EdgeKey, GraphModel, PheromoneTable, Reinforcement,
    RoutingParams, Vertex,
};
use antroute_proto::{
    coordinator_server::{Coordinator, CoordinatorServer},
    Edge, NeighborsReply, NeighborsRequest, SnapshotRequest, StatusReply, TraversalReport,
};

pub mod decay;
pub mod runner;
pub mod simulation;
pub mod snapshot;

pub use decay::{DecayLoop, DecayStats};
pub use runner::{AgentOutcome, AgentRunner};
pub use simulation::{CompletionLatch, Simulation, SimulationReport};
pub use snapshot::{JsonSnapshotSink, LogSnapshotSink, SnapshotSink};

#[derive(thiserror::Error, Debug)]
pub enum CoordinatorError {
    #[error(transparent)]
    Core(#[from] AntRouteError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Map a core error onto the gRPC status an ant sees.
pub fn to_status(err: AntRouteError) -> Status {
    match err {
        AntRouteError::UnknownVertex(_) | AntRouteError::UnknownEdge(_) => {
            Status::not_found(err.to_string())
        }
        AntRouteError::InvalidRequest(_) => Status::invalid_argument(err.to_string()),
        other if other.is_retryable() => Status::unavailable(other.to_string()),
        other => Status::internal(other.to_string()),
    }
}

/// Shared state behind every request handler.
///
/// The graph is read-only; the pheromone table is the only mutable resource
/// and is shared with the decay loop through its `Arc`.
#[derive(Clone)]
pub struct CoordinatorState {
    pub graph: Arc<GraphModel>,
    pub pheromones: Arc<PheromoneTable>,
    pub snapshots: Arc<dyn SnapshotSink>,
    pub base_increment: f32,
}

impl CoordinatorState {
    /// Take ownership of `graph`, close it over undirected edges and register
    /// every edge at the initial pheromone level.
    pub fn new(graph: GraphModel, params: &RoutingParams) -> Self {
        let graph = graph.as_undirected_closure();
        let pheromones = PheromoneTable::new(graph.edges(), params.initial_level)
            .with_lock_timeout(params.lock_timeout());
        info!(
            vertices = graph.vertex_count(),
            edges = pheromones.len(),
            source = graph.source(),
            destination = graph.destination(),
            "Coordinator state ready"
        );
        Self {
            graph: Arc::new(graph),
            pheromones: Arc::new(pheromones),
            snapshots: Arc::new(LogSnapshotSink),
            base_increment: params.base_increment,
        }
    }

    pub fn with_snapshot_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.snapshots = sink;
        self
    }

    /// Neighbors of `node` with their pheromone levels, sorted by vertex.
    ///
    /// `prev` is dropped from the candidates when `node` offers a real choice
    /// (more than one neighbor) and is neither the source nor the destination.
    pub fn neighbors(
        &self,
        node: Vertex,
        prev: Option<Vertex>,
    ) -> antroute_core::Result<Vec<Candidate>> {
        let neighbors = self.graph.neighbors_of(node)?;
        let exclude = prev.filter(|_| neighbors.len() > 1 && !self.graph.is_terminal(node));
        neighbors
            .iter()
            .copied()
            .filter(|v| Some(*v) != exclude)
            .map(|v| -> antroute_core::Result<Candidate> {
                let level = self.pheromones.get(&EdgeKey::new(node, v))?;
                Ok(Candidate::new(v, level))
            })
            .collect()
    }

    /// Reinforce the traversed edge by `base_increment * modifier`.
    pub fn record_traversal(
        &self,
        ant_id: AntId,
        prev: Vertex,
        next: Vertex,
        modifier: f32,
    ) -> antroute_core::Result<Reinforcement> {
        if !modifier.is_finite() || modifier < 0.0 {
            return Err(AntRouteError::InvalidRequest(format!(
                "modifier must be a non-negative number, got {}",
                modifier
            )));
        }
        let key = EdgeKey::new(prev, next);
        let outcome = self
            .pheromones
            .reinforce(&key, self.base_increment * modifier)?;
        debug!(ant_id, edge = %key, modifier, level = outcome.level(), "Traversal recorded");
        Ok(outcome)
    }
}

#[derive(Clone)]
pub struct CoordinatorService {
    state: CoordinatorState,
}

impl CoordinatorService {
    pub fn new(state: CoordinatorState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl Coordinator for CoordinatorService {
    async fn get_neighbors(
        &self,
        request: Request<NeighborsRequest>,
    ) -> std::result::Result<Response<NeighborsReply>, Status> {
        let req = request.into_inner();
        let candidates = self
            .state
            .neighbors(req.node_id, req.prev_node)
            .map_err(|e| {
                warn!(node = req.node_id, error = %e, "Neighbor query failed");
                to_status(e)
            })?;
        let edges = candidates
            .into_iter()
            .map(|c| Edge {
                node_id: c.vertex,
                pheromone_level: c.pheromone,
            })
            .collect();
        Ok(Response::new(NeighborsReply { edges }))
    }

    async fn send_traversal(
        &self,
        request: Request<TraversalReport>,
    ) -> std::result::Result<Response<StatusReply>, Status> {
        let req = request.into_inner();
        self.state
            .record_traversal(req.ant_id, req.prev_vertex, req.next_vertex, req.modifier)
            .map_err(|e| {
                warn!(
                    ant_id = req.ant_id,
                    prev = req.prev_vertex,
                    next = req.next_vertex,
                    error = %e,
                    "Traversal report failed"
                );
                to_status(e)
            })?;
        Ok(Response::new(StatusReply { success: true }))
    }

    async fn save_snapshot(
        &self,
        request: Request<SnapshotRequest>,
    ) -> std::result::Result<Response<StatusReply>, Status> {
        let iteration = request.into_inner().iteration;
        let levels = self.state.pheromones.snapshot();
        let success = match self.state.snapshots.save(iteration, &levels).await {
            Ok(()) => true,
            Err(e) => {
                warn!(iteration, error = %e, "Snapshot sink failed");
                false
            }
        };
        Ok(Response::new(StatusReply { success }))
    }
}

/// Serve the coordinator on `addr` until `shutdown` resolves.
pub async fn start_server(
    addr: SocketAddr,
    state: CoordinatorState,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state, shutdown).await
}

/// Serve the coordinator on an already bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    state: CoordinatorState,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<()> {
    let addr = listener.local_addr()?;
    let svc = CoordinatorService::new(state);
    info!(%addr, "Starting AntRoute coordinator gRPC server");
    tonic::transport::Server::builder()
        .add_service(CoordinatorServer::new(svc))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
        .map_err(|e| CoordinatorError::Transport(e.to_string()))?;
    info!(%addr, "Coordinator server stopped");
    Ok(())
}
