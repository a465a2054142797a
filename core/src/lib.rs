// AntRoute Core Library
// Pheromone-weighted routing over a shared graph

pub mod ant;
pub mod config;
pub mod error;
pub mod graph;
pub mod pheromone;
pub mod telemetry;

// Export core types
pub use ant::{pick_by_pheromone, AgentCore, AgentParams, AntId, Candidate};
pub use config::{RoutingParams, SimulationConfig};
pub use error::{AntRouteError, Result};
pub use graph::{EdgeKey, GraphModel, GraphSpec, Vertex};
pub use pheromone::{PheromoneTable, Reinforcement};
