//! Client side of the protocol: one ant walking the graph.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use rand::rngs::StdRng;
use tonic::transport::Channel;
use tonic::{Code, Response, Status};
use tracing::{debug, error, info, warn};

use antroute_core::{AgentCore, AntId, AntRouteError, Candidate, Result, RoutingParams, Vertex};
use antroute_proto::{
    coordinator_client::CoordinatorClient, NeighborsRequest, SnapshotRequest, TraversalReport,
};

const RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// How a single ant's run ended.
#[derive(Debug)]
pub struct AgentOutcome {
    pub ant_id: AntId,
    pub steps: u32,
    pub final_vertex: Vertex,
    pub error: Option<AntRouteError>,
}

impl AgentOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives one [`AgentCore`] against the coordinator.
///
/// The client handle is owned by this runner and used by no one else.
pub struct AgentRunner {
    core: AgentCore,
    client: CoordinatorClient<Channel>,
    rng: StdRng,
    params: RoutingParams,
}

impl AgentRunner {
    pub async fn connect(
        addr: SocketAddr,
        core: AgentCore,
        rng: StdRng,
        params: RoutingParams,
    ) -> Result<Self> {
        let endpoint = format!("http://{}", addr);
        let client = CoordinatorClient::connect(endpoint)
            .await
            .map_err(|e| AntRouteError::ConnectionFailure(format!("{}: {}", addr, e)))?;
        Ok(Self::with_client(client, core, rng, params))
    }

    pub fn with_client(
        client: CoordinatorClient<Channel>,
        core: AgentCore,
        rng: StdRng,
        params: RoutingParams,
    ) -> Self {
        Self {
            core,
            client,
            rng,
            params,
        }
    }

    pub fn core(&self) -> &AgentCore {
        &self.core
    }

    /// Walk until the step budget is spent or a request fails for good.
    pub async fn run(mut self) -> AgentOutcome {
        let ant_id = self.core.id();
        info!(
            ant_id,
            start = self.core.current_vertex(),
            destination = self.core.destination(),
            "Starting agent"
        );

        let mut steps = 0;
        let mut failure = None;
        while steps < self.params.step_budget {
            tokio::time::sleep(self.params.step_interval()).await;
            if ant_id == 0 {
                debug!(iteration = steps, "Agent progress");
            }
            if let Err(e) = self.step_once().await {
                error!(ant_id, step = steps, error = %e, "Agent stopped on error");
                failure = Some(e);
                break;
            }
            steps += 1;

            if self.params.snapshot_every != 0 && steps % self.params.snapshot_every == 0 {
                self.request_snapshot(steps).await;
            }
        }

        if failure.is_none() {
            info!(ant_id, steps, "Agent finished");
        }
        AgentOutcome {
            ant_id,
            steps,
            final_vertex: self.core.current_vertex(),
            error: failure,
        }
    }

    /// Query, choose, report.
    pub async fn step_once(&mut self) -> Result<Candidate> {
        let ant_id = self.core.id();
        let from = self.core.current_vertex();
        let query = NeighborsRequest {
            node_id: from,
            prev_node: self.core.previous_vertex(),
        };
        let reply = {
            let client = self.client.clone();
            with_retries(self.params.request_retries, ant_id, "GetNeighbors", move || {
                let mut client = client.clone();
                let query = query.clone();
                async move { client.get_neighbors(query).await }
            })
            .await?
        };

        let candidates: Vec<Candidate> = reply
            .edges
            .into_iter()
            .map(|e| Candidate::new(e.node_id, e.pheromone_level))
            .collect();
        let chosen = self.core.step(&candidates, &mut self.rng)?;

        let report = TraversalReport {
            ant_id,
            prev_vertex: from,
            next_vertex: chosen.vertex,
            modifier: self.core.modifier(),
        };
        let client = self.client.clone();
        with_retries(self.params.request_retries, ant_id, "SendTraversal", move || {
            let mut client = client.clone();
            let report = report.clone();
            async move { client.send_traversal(report).await }
        })
        .await?;

        Ok(chosen)
    }

    async fn request_snapshot(&mut self, iteration: u32) {
        let ant_id = self.core.id();
        match self
            .client
            .save_snapshot(SnapshotRequest { iteration })
            .await
        {
            Ok(reply) if reply.get_ref().success => {}
            Ok(_) => warn!(ant_id, iteration, "Snapshot not saved"),
            Err(status) => warn!(ant_id, iteration, error = %status, "Snapshot request failed"),
        }
    }
}

/// Issue `call`, retrying `UNAVAILABLE` replies (lock timeouts, transient
/// transport trouble) up to `retries` times.
async fn with_retries<T, F, Fut>(
    retries: u32,
    ant_id: AntId,
    rpc: &'static str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Response<T>, Status>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(resp) => return Ok(resp.into_inner()),
            Err(status) if status.code() == Code::Unavailable && attempt < retries => {
                attempt += 1;
                warn!(ant_id, rpc, attempt, error = %status.message(), "Retrying request");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(status) => return Err(status_to_error(status)),
        }
    }
}

fn status_to_error(status: Status) -> AntRouteError {
    match status.code() {
        Code::Unavailable | Code::Unknown | Code::Cancelled | Code::DeadlineExceeded => {
            AntRouteError::ConnectionFailure(status.message().to_string())
        }
        code => AntRouteError::Rejected(format!("{:?}: {}", code, status.message())),
    }
}
