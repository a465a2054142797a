//! Decision logic for a single ant.
//!
//! [`AgentCore`] is pure state: it never talks to the coordinator. The agent
//! loop feeds it the candidate edges returned by a neighbor query and reports
//! whatever edge it picks.

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;

use crate::config::RoutingParams;
use crate::graph::Vertex;
use crate::{AntRouteError, Result};

pub type AntId = u32;

/// One outgoing edge as seen by an ant: target vertex and its pheromone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub vertex: Vertex,
    pub pheromone: f32,
}

impl Candidate {
    pub fn new(vertex: Vertex, pheromone: f32) -> Self {
        Self { vertex, pheromone }
    }
}

/// Reinforcement-modifier tuning for [`AgentCore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentParams {
    pub modifier_bonus: f32,
    pub modifier_decrement: f32,
    /// Steps allowed between leaving the source and reaching the destination
    /// for the round trip to earn the bonus.
    pub round_trip_window: u64,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self::from(&RoutingParams::default())
    }
}

impl From<&RoutingParams> for AgentParams {
    fn from(params: &RoutingParams) -> Self {
        Self {
            modifier_bonus: params.modifier_bonus,
            modifier_decrement: params.modifier_decrement,
            round_trip_window: params.round_trip_window,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentCore {
    id: AntId,
    current: Vertex,
    previous: Option<Vertex>,
    source: Vertex,
    destination: Vertex,
    timestep: u64,
    last_seen_source: Option<u64>,
    modifier: f32,
    params: AgentParams,
}

impl AgentCore {
    pub fn new(
        id: AntId,
        start: Vertex,
        source: Vertex,
        destination: Vertex,
        params: AgentParams,
    ) -> Self {
        let timestep = 1;
        Self {
            id,
            current: start,
            previous: None,
            source,
            destination,
            timestep,
            last_seen_source: (start == source).then_some(timestep),
            modifier: 1.0,
            params,
        }
    }

    pub fn id(&self) -> AntId {
        self.id
    }

    pub fn current_vertex(&self) -> Vertex {
        self.current
    }

    pub fn previous_vertex(&self) -> Option<Vertex> {
        self.previous
    }

    pub fn destination(&self) -> Vertex {
        self.destination
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn last_seen_source(&self) -> Option<u64> {
        self.last_seen_source
    }

    pub fn modifier(&self) -> f32 {
        self.modifier
    }

    /// Advance one step: pick an edge from `candidates` and move along it.
    ///
    /// Arriving at the destination within `round_trip_window` steps of the
    /// last source visit raises the modifier to the bonus; arriving at the
    /// source resets it.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        candidates: &[Candidate],
        rng: &mut R,
    ) -> Result<Candidate> {
        if candidates.is_empty() {
            return Err(AntRouteError::NoCandidates(self.current));
        }
        let chosen = pick_by_pheromone(candidates, rng)?;

        self.timestep += 1;
        if self.modifier > 1.0 {
            self.modifier = (self.modifier - self.params.modifier_decrement).max(1.0);
        }

        self.previous = Some(self.current);
        self.current = chosen.vertex;

        let fast_round_trip = self
            .last_seen_source
            .is_some_and(|seen| self.timestep - seen < self.params.round_trip_window);
        if self.current == self.destination && fast_round_trip {
            self.modifier = self.params.modifier_bonus;
        } else if self.current == self.source {
            self.last_seen_source = Some(self.timestep);
            self.modifier = 1.0;
        }

        Ok(chosen)
    }
}

/// Roulette-wheel selection proportional to pheromone level.
///
/// Falls back to a uniform pick when every weight is zero.
pub fn pick_by_pheromone<R: Rng + ?Sized>(
    candidates: &[Candidate],
    rng: &mut R,
) -> Result<Candidate> {
    if candidates.is_empty() {
        return Err(AntRouteError::InvalidWeights("no candidates".into()));
    }
    match WeightedIndex::new(candidates.iter().map(|c| c.pheromone)) {
        Ok(dist) => Ok(candidates[dist.sample(rng)]),
        Err(WeightedError::AllWeightsZero) => Ok(candidates[rng.gen_range(0..candidates.len())]),
        Err(e) => Err(AntRouteError::InvalidWeights(e.to_string())),
    }
}
