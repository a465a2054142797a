//! Sample topologies used to seed a simulation.
//!
//! All generators produce directed adjacency; the coordinator works on the
//! undirected closure.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{GraphModel, Vertex};
use crate::{AntRouteError, Result};

/// Startup topology selector, as found in the `[graph]` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphSpec {
    Simple,
    DoublePath,
    UnevenPath { first: u32, second: u32 },
    LongDoublePath { length: u32 },
    ErdosRenyi { vertices: u32, probability: f32 },
}

impl Default for GraphSpec {
    fn default() -> Self {
        GraphSpec::ErdosRenyi {
            vertices: 20,
            probability: 0.2,
        }
    }
}

impl GraphSpec {
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GraphModel> {
        match self {
            GraphSpec::Simple => simple(),
            GraphSpec::DoublePath => double_path(),
            GraphSpec::UnevenPath { first, second } => uneven_path(*first, *second),
            GraphSpec::LongDoublePath { length } => long_double_path(*length),
            GraphSpec::ErdosRenyi {
                vertices,
                probability,
            } => erdos_renyi(*vertices, *probability, rng),
        }
    }
}

fn adjacency<const N: usize>(
    pairs: [(Vertex, &[Vertex]); N],
) -> BTreeMap<Vertex, BTreeSet<Vertex>> {
    pairs
        .into_iter()
        .map(|(from, to)| (from, to.iter().copied().collect()))
        .collect()
}

/// Triangle on {1,2,3}; source and destination are both 1.
pub fn simple() -> Result<GraphModel> {
    GraphModel::new(1, 1, 1..=3, adjacency([(1, &[2]), (2, &[3]), (3, &[1])]))
}

/// Two three-edge paths from 1 to 6.
pub fn double_path() -> Result<GraphModel> {
    GraphModel::new(
        1,
        6,
        1..=6,
        adjacency([
            (1, &[2, 4]),
            (2, &[3]),
            (3, &[6]),
            (4, &[5]),
            (5, &[6]),
        ]),
    )
}

/// Two disjoint paths from 1 to `first + second`, of `first` and `second`
/// edges respectively.
///
/// The first path runs through `2..=first`, the second through
/// `first + 1..first + second`.
pub fn uneven_path(first: u32, second: u32) -> Result<GraphModel> {
    if first < 2 || second < 2 {
        return Err(AntRouteError::InvalidGraph(format!(
            "uneven path lengths must both be at least 2, got {} and {}",
            first, second
        )));
    }
    let last = first + second;
    let mut edges: BTreeMap<Vertex, BTreeSet<Vertex>> = BTreeMap::new();
    edges.insert(1, BTreeSet::from([first + 1, 2]));
    for i in 2..first {
        edges.insert(i, BTreeSet::from([i + 1]));
    }
    for i in 2..second {
        edges.insert(i + first - 1, BTreeSet::from([i + first]));
    }
    edges.insert(first, BTreeSet::from([last]));
    edges.insert(last - 1, BTreeSet::from([last]));

    GraphModel::new(1, last, 1..=last, edges)
}

pub fn long_double_path(length: u32) -> Result<GraphModel> {
    uneven_path(length, length)
}

/// G(n, p): each pair `i < j` gets the edge `i -> j` with probability `p`.
pub fn erdos_renyi<R: Rng + ?Sized>(n: u32, p: f32, rng: &mut R) -> Result<GraphModel> {
    if n < 2 {
        return Err(AntRouteError::InvalidGraph(format!(
            "erdos-renyi graph needs at least 2 vertices, got {}",
            n
        )));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(AntRouteError::InvalidGraph(format!(
            "edge probability {} outside [0, 1]",
            p
        )));
    }
    let mut edges: BTreeMap<Vertex, BTreeSet<Vertex>> = BTreeMap::new();
    for i in 1..n {
        let targets = edges.entry(i).or_default();
        for j in (i + 1)..=n {
            if rng.gen::<f32>() > p {
                continue;
            }
            targets.insert(j);
        }
    }
    GraphModel::new(1, n, 1..=n, edges)
}
