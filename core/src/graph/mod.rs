//! Immutable routing topology.
//!
//! A [`GraphModel`] is built once at startup, closed over undirected edges
//! with [`GraphModel::as_undirected_closure`], and then only read.

pub mod samples;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AntRouteError, Result};

pub use samples::GraphSpec;

/// Vertex identifier, unique within one graph.
pub type Vertex = u32;

/// Direction-independent identity of an edge.
///
/// The pair is stored ordered, so `EdgeKey::new(a, b) == EdgeKey::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    low: Vertex,
    high: Vertex,
}

impl EdgeKey {
    pub fn new(a: Vertex, b: Vertex) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> Vertex {
        self.low
    }

    pub fn high(&self) -> Vertex {
        self.high
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.low, self.high)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphModel {
    vertices: BTreeSet<Vertex>,
    adjacency: BTreeMap<Vertex, BTreeSet<Vertex>>,
    source: Vertex,
    destination: Vertex,
}

impl GraphModel {
    /// Build a graph from a vertex set and a (possibly directed) adjacency map.
    ///
    /// Every vertex gets a neighbor set, empty if the adjacency map has none,
    /// so an isolated vertex is still known to the graph.
    pub fn new(
        source: Vertex,
        destination: Vertex,
        vertices: impl IntoIterator<Item = Vertex>,
        adjacency: BTreeMap<Vertex, BTreeSet<Vertex>>,
    ) -> Result<Self> {
        let vertices: BTreeSet<Vertex> = vertices.into_iter().collect();

        for terminal in [source, destination] {
            if !vertices.contains(&terminal) {
                return Err(AntRouteError::InvalidGraph(format!(
                    "terminal vertex {} is not in the vertex set",
                    terminal
                )));
            }
        }

        for (from, targets) in &adjacency {
            if let Some(missing) = std::iter::once(from)
                .chain(targets.iter())
                .find(|v| !vertices.contains(v))
            {
                return Err(AntRouteError::InvalidGraph(format!(
                    "edge endpoint {} is not in the vertex set",
                    missing
                )));
            }
        }

        let mut full = adjacency;
        for v in &vertices {
            full.entry(*v).or_default();
        }

        Ok(Self {
            vertices,
            adjacency: full,
            source,
            destination,
        })
    }

    pub fn source(&self) -> Vertex {
        self.source
    }

    pub fn destination(&self) -> Vertex {
        self.destination
    }

    pub fn is_terminal(&self, vertex: Vertex) -> bool {
        vertex == self.source || vertex == self.destination
    }

    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.vertices.iter().copied()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn neighbors_of(&self, vertex: Vertex) -> Result<&BTreeSet<Vertex>> {
        self.adjacency
            .get(&vertex)
            .ok_or(AntRouteError::UnknownVertex(vertex))
    }

    /// Every distinct edge, once, in key order.
    pub fn edges(&self) -> Vec<EdgeKey> {
        let keys: BTreeSet<EdgeKey> = self
            .adjacency
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| EdgeKey::new(*from, *to)))
            .collect();
        keys.into_iter().collect()
    }

    /// Symmetrize the adjacency: for each `u -> v`, both directions exist.
    pub fn as_undirected_closure(&self) -> GraphModel {
        let mut adjacency = self.adjacency.clone();
        for (from, targets) in &self.adjacency {
            for to in targets {
                adjacency.entry(*to).or_default().insert(*from);
            }
        }
        GraphModel {
            vertices: self.vertices.clone(),
            adjacency,
            source: self.source,
            destination: self.destination,
        }
    }
}
