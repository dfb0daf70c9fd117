//! Force-directed layout engine for small undirected graphs.
//!
//! A [`Simulation`] owns a [`Graph`] and advances it one tick per frame
//! signal: named forces (Barnes–Hut many-body repulsion, link springs, a
//! centering pull) accumulate into a per-node buffer, a damped explicit
//! integrator applies them scaled by the cooling parameter alpha, and the run
//! converges once alpha falls below its floor. Pointer drags pin nodes and
//! keep the layout warm while any drag is active.

pub mod error;
pub mod graph;
pub mod layout;
pub mod sim;

pub use error::{ConfigError, ConstructionError, DragError, Error, Result};
pub use graph::{Graph, GraphDocument, Link, LinkSpec, Node, NodeSpec};
pub use sim::config::{ConfigPatch, SimulationConfig};
pub use sim::{NumericWarning, Simulation, SimulationState, TickSnapshot};
