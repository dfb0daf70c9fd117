//! The simulation loop and its three-state machine.
//!
//! The engine never schedules itself: whoever owns the frame clock calls
//! [`Simulation::tick`] once per frame, and the call is a no-op unless the
//! simulation is [`SimulationState::Running`]. Pointer events go through the
//! drag methods between ticks.

pub mod config;
pub mod cooling;
mod drag;
pub mod forces;
mod integrate;
mod quadtree;

use eframe::egui::Vec2;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::{ConfigError, ConstructionError, Result};
use crate::graph::{Graph, GraphDocument, Link, Node};
use config::{ConfigPatch, SimulationConfig, unit_interval};
use cooling::Cooling;
use drag::DragTracker;
use forces::{ForceInput, ForceRegistry};
use integrate::integrate;
use quadtree::{QuadNode, collect_quadtree_cells};

pub use drag::DRAG_ALPHA_TARGET;
pub use integrate::{NumericWarning, Quantity};
pub use quadtree::QuadtreeCell;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SimulationState {
    Idle,
    Running,
    Converged,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub fixed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkSegment {
    pub source: Vec2,
    pub target: Vec2,
}

/// State after a completed tick. `nodes` follows graph order, `links`
/// follows link order.
#[derive(Clone, Debug, PartialEq)]
pub struct TickSnapshot {
    pub tick: u64,
    pub alpha: f32,
    pub state: SimulationState,
    pub nodes: Vec<NodeState>,
    pub links: Vec<LinkSegment>,
    pub warnings: Vec<NumericWarning>,
}

type Listener = Box<dyn FnMut(&TickSnapshot)>;

#[derive(Default)]
struct Scratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
}

pub struct Simulation {
    graph: Graph,
    config: SimulationConfig,
    forces: ForceRegistry,
    cooling: Cooling,
    state: SimulationState,
    drag: DragTracker,
    tick_count: u64,
    warning_count: u64,
    scratch: Scratch,
    tick_listeners: Vec<Listener>,
    end_listeners: Vec<Listener>,
}

impl Simulation {
    pub fn new(graph: Graph) -> std::result::Result<Self, ConstructionError> {
        if graph.is_empty() {
            return Err(ConstructionError::EmptyGraph);
        }
        let config = SimulationConfig::default();
        Ok(Self {
            forces: ForceRegistry::from_config(&config),
            cooling: Cooling::new(&config),
            config,
            graph,
            state: SimulationState::Idle,
            drag: DragTracker::default(),
            tick_count: 0,
            warning_count: 0,
            scratch: Scratch::default(),
            tick_listeners: Vec::new(),
            end_listeners: Vec::new(),
        })
    }

    pub fn with_config(graph: Graph, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut simulation = Self::new(graph)?;
        simulation.config = config;
        simulation.forces = ForceRegistry::from_config(&config);
        simulation.cooling = Cooling::new(&config);
        Ok(simulation)
    }

    pub fn from_document(document: &GraphDocument) -> std::result::Result<Self, ConstructionError> {
        Self::new(document.to_graph()?)
    }

    /// Applies `patch` on top of the current configuration. Nothing changes
    /// when any resulting field is invalid.
    pub fn configure(&mut self, patch: &ConfigPatch) -> std::result::Result<(), ConfigError> {
        let config = self.config.merged(patch)?;
        self.config = config;
        self.forces.apply_config(&config);
        self.cooling.apply_config(&config);
        debug!(?config, "Simulation reconfigured");
        Ok(())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn forces(&self) -> &ForceRegistry {
        &self.forces
    }

    /// Named forces may be added or removed between ticks.
    pub fn forces_mut(&mut self) -> &mut ForceRegistry {
        &mut self.forces
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn nodes(&self) -> &[Node] {
        self.graph.nodes()
    }

    pub fn links(&self) -> &[Link] {
        self.graph.links()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.node(id)
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn alpha(&self) -> f32 {
        self.cooling.alpha()
    }

    pub fn alpha_target(&self) -> f32 {
        self.cooling.alpha_target()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Total numeric warnings raised since construction.
    pub fn warning_count(&self) -> u64 {
        self.warning_count
    }

    /// Subscribes to every completed tick, including the one that converges.
    pub fn on_tick(&mut self, listener: impl FnMut(&TickSnapshot) + 'static) {
        self.tick_listeners.push(Box::new(listener));
    }

    /// Subscribes to the Running → Converged transition.
    pub fn on_end(&mut self, listener: impl FnMut(&TickSnapshot) + 'static) {
        self.end_listeners.push(Box::new(listener));
    }

    pub fn start(&mut self) {
        self.transition(SimulationState::Running, "start");
    }

    /// Halts ticking without touching alpha.
    pub fn stop(&mut self) {
        if self.state == SimulationState::Running {
            self.transition(SimulationState::Idle, "stop");
        }
    }

    /// Runs again from full energy, whatever the current alpha.
    pub fn restart(&mut self) {
        self.cooling.set_alpha(1.0);
        self.transition(SimulationState::Running, "restart");
    }

    /// Raises the alpha target and resumes ticking if stopped or converged.
    pub fn reheat(&mut self, target: f32) -> std::result::Result<(), ConfigError> {
        unit_interval("alphaTarget", target)?;
        self.heat(target);
        Ok(())
    }

    /// Returns the alpha target to zero so the layout settles.
    pub fn cool(&mut self) {
        self.cooling.set_target(0.0);
        debug!(alpha = self.cooling.alpha(), "Cooling");
    }

    pub fn set_alpha(&mut self, alpha: f32) -> std::result::Result<(), ConfigError> {
        unit_interval("alpha", alpha)?;
        self.cooling.set_alpha(alpha);
        Ok(())
    }

    pub(crate) fn heat(&mut self, target: f32) {
        self.cooling.set_target(target);
        debug!(alpha_target = target, alpha = self.cooling.alpha(), "Reheating");
        self.transition(SimulationState::Running, "reheat");
    }

    fn transition(&mut self, next: SimulationState, cause: &str) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, cause, "Simulation state changed");
            self.state = next;
        }
    }

    /// Frame signal: executes one tick while Running and returns the state
    /// afterwards.
    pub fn tick(&mut self) -> SimulationState {
        if self.state != SimulationState::Running {
            return self.state;
        }

        let warnings = self.step();
        let converged = self.cooling.is_settled();
        if converged {
            info!(
                ticks = self.tick_count,
                alpha = self.cooling.alpha(),
                "Layout converged"
            );
            self.state = SimulationState::Converged;
        }
        self.notify(warnings, converged);
        self.state
    }

    /// Ticks until the layout converges or `max_ticks` frames have run;
    /// returns the number of ticks executed.
    pub fn run_until_converged(&mut self, max_ticks: usize) -> usize {
        self.start();
        let mut ticks = 0;
        while ticks < max_ticks && self.state == SimulationState::Running {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    fn step(&mut self) -> Vec<NumericWarning> {
        let node_count = self.graph.node_count();
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch
            .positions
            .extend(self.graph.nodes().iter().map(Node::position));
        scratch.forces.clear();
        scratch.forces.resize(node_count, Vec2::ZERO);

        let input = ForceInput {
            positions: &scratch.positions,
            links: self.graph.links(),
            degree: self.graph.degrees(),
        };
        self.forces.accumulate(&input, &mut scratch.forces);

        let alpha = self.cooling.alpha();
        let warnings = integrate(
            self.graph.nodes_mut(),
            &scratch.forces,
            alpha,
            self.config.velocity_decay,
        );
        for warning in &warnings {
            warn!(
                node = %warning.node_id,
                quantity = ?warning.quantity,
                "Non-finite update discarded"
            );
        }
        self.warning_count += warnings.len() as u64;

        self.cooling.step();
        self.tick_count += 1;
        trace!(tick = self.tick_count, alpha = self.cooling.alpha(), "Tick");
        warnings
    }

    fn notify(&mut self, warnings: Vec<NumericWarning>, converged: bool) {
        let wants_end = converged && !self.end_listeners.is_empty();
        if self.tick_listeners.is_empty() && !wants_end {
            return;
        }

        let snapshot = self.snapshot_with(warnings);
        for listener in &mut self.tick_listeners {
            listener(&snapshot);
        }
        if converged {
            for listener in &mut self.end_listeners {
                listener(&snapshot);
            }
        }
    }

    /// Current positions without advancing the simulation.
    pub fn snapshot(&self) -> TickSnapshot {
        self.snapshot_with(Vec::new())
    }

    fn snapshot_with(&self, warnings: Vec<NumericWarning>) -> TickSnapshot {
        let nodes = self.graph.nodes();
        TickSnapshot {
            tick: self.tick_count,
            alpha: self.cooling.alpha(),
            state: self.state,
            nodes: nodes
                .iter()
                .map(|node| NodeState {
                    position: node.position(),
                    velocity: node.velocity(),
                    fixed: node.fixed().is_some(),
                })
                .collect(),
            links: self
                .graph
                .links()
                .iter()
                .map(|link| LinkSegment {
                    source: nodes[link.source].position(),
                    target: nodes[link.target].position(),
                })
                .collect(),
            warnings,
        }
    }

    /// Regions of the spatial index built from the current positions.
    pub fn quadtree_cells(&self) -> Vec<QuadtreeCell> {
        let positions = self
            .graph
            .nodes()
            .iter()
            .map(Node::position)
            .collect::<Vec<_>>();
        let mut cells = Vec::new();
        if let Some(quadtree) = QuadNode::build(&positions) {
            collect_quadtree_cells(&quadtree, 0, &mut cells);
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use eframe::egui::vec2;

    use super::*;
    use crate::graph::{LinkSpec, NodeSpec};

    fn pair() -> Graph {
        let mut graph = Graph::new();
        graph
            .add_nodes([
                NodeSpec::new("a").at(-10.0, 0.0),
                NodeSpec::new("b").at(10.0, 0.0),
            ])
            .unwrap();
        graph.add_links([LinkSpec::new("a", "b")]).unwrap();
        graph
    }

    #[test]
    fn test_empty_graph_rejected() {
        assert!(matches!(
            Simulation::new(Graph::new()),
            Err(ConstructionError::EmptyGraph)
        ));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = SimulationConfig {
            theta: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::with_config(pair(), config),
            Err(crate::error::Error::Config(_))
        ));
    }

    #[test]
    fn test_tick_is_noop_unless_running() {
        let mut sim = Simulation::new(pair()).unwrap();
        assert_eq!(sim.tick(), SimulationState::Idle);
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.alpha(), 1.0);

        sim.start();
        assert_eq!(sim.tick(), SimulationState::Running);
        assert_eq!(sim.tick_count(), 1);
        assert!(sim.alpha() < 1.0);
    }

    #[test]
    fn test_stop_keeps_alpha() {
        let mut sim = Simulation::new(pair()).unwrap();
        sim.start();
        sim.tick();
        let alpha = sim.alpha();
        sim.stop();
        assert_eq!(sim.state(), SimulationState::Idle);
        sim.tick();
        assert_eq!(sim.alpha(), alpha);
    }

    #[test]
    fn test_converges_and_restarts() {
        let mut sim = Simulation::new(pair()).unwrap();
        let ticks = sim.run_until_converged(10_000);
        assert_eq!(sim.state(), SimulationState::Converged);
        assert!(ticks > 0 && ticks <= 302, "ticks {ticks}");
        assert_eq!(ticks as u64, sim.tick_count());

        sim.restart();
        assert_eq!(sim.state(), SimulationState::Running);
        assert_eq!(sim.alpha(), 1.0);
    }

    #[test]
    fn test_reheat_resumes_converged() {
        let mut sim = Simulation::new(pair()).unwrap();
        sim.run_until_converged(10_000);
        sim.reheat(0.3).unwrap();
        assert_eq!(sim.state(), SimulationState::Running);
        assert_eq!(sim.alpha_target(), 0.3);

        sim.cool();
        assert_eq!(sim.alpha_target(), 0.0);
        assert_eq!(sim.state(), SimulationState::Running);
    }

    #[test]
    fn test_reheat_rejects_out_of_range() {
        let mut sim = Simulation::new(pair()).unwrap();
        assert!(sim.reheat(1.5).is_err());
        assert!(sim.set_alpha(-0.5).is_err());
        assert_eq!(sim.state(), SimulationState::Idle);
    }

    #[test]
    fn test_configure_is_atomic() {
        let mut sim = Simulation::new(pair()).unwrap();
        let before = *sim.config();
        let patch = ConfigPatch {
            link_distance: Some(20.0),
            velocity_decay: Some(2.0),
            ..Default::default()
        };
        assert!(sim.configure(&patch).is_err());
        assert_eq!(*sim.config(), before);

        let patch = ConfigPatch {
            link_distance: Some(20.0),
            ..Default::default()
        };
        sim.configure(&patch).unwrap();
        assert_eq!(sim.config().link_distance, 20.0);
        assert!(matches!(
            sim.forces().get(forces::LINK),
            Some(forces::Force::Link(spring)) if spring.distance == 20.0
        ));
    }

    #[test]
    fn test_listeners_see_every_tick_and_the_end() {
        let mut sim = Simulation::new(pair()).unwrap();
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let ends = Rc::new(RefCell::new(0));

        let seen = Rc::clone(&ticks);
        sim.on_tick(move |snapshot| seen.borrow_mut().push((snapshot.tick, snapshot.state)));
        let ended = Rc::clone(&ends);
        sim.on_end(move |_| *ended.borrow_mut() += 1);

        sim.run_until_converged(10_000);

        let ticks = ticks.borrow();
        assert_eq!(ticks.len() as u64, sim.tick_count());
        assert_eq!(ticks[0].0, 1);
        assert_eq!(ticks.last().unwrap().1, SimulationState::Converged);
        assert!(ticks[..ticks.len() - 1]
            .iter()
            .all(|(_, state)| *state == SimulationState::Running));
        assert_eq!(*ends.borrow(), 1);
    }

    #[test]
    fn test_snapshot_links_follow_nodes() {
        let mut sim = Simulation::new(pair()).unwrap();
        sim.fix_node("a", 1.0, 2.0).unwrap();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.nodes.len(), 2);
        assert!(snapshot.nodes[0].fixed);
        assert_eq!(snapshot.links[0].source, vec2(1.0, 2.0));
        assert_eq!(snapshot.links[0].target, vec2(10.0, 0.0));
    }

    #[test]
    fn test_pathological_config_reports_warnings() {
        let mut graph = Graph::new();
        graph
            .add_nodes([
                NodeSpec::new("a").at(0.0, 0.0),
                NodeSpec::new("b").at(0.5, 0.0),
            ])
            .unwrap();
        let config = SimulationConfig {
            repulsion_strength: -f32::MAX,
            velocity_decay: 1.0,
            center_strength: 0.0,
            ..Default::default()
        };
        let mut sim = Simulation::with_config(graph, config).unwrap();
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&warnings);
        sim.on_tick(move |snapshot| seen.borrow_mut().extend(snapshot.warnings.clone()));

        sim.start();
        for _ in 0..5 {
            sim.tick();
        }

        assert!(!warnings.borrow().is_empty());
        assert_eq!(sim.warning_count(), warnings.borrow().len() as u64);
        for node in sim.nodes() {
            assert!(node.position().x.is_finite() && node.position().y.is_finite());
        }
        assert_eq!(sim.state(), SimulationState::Running);
    }

    #[test]
    fn test_quadtree_cells_cover_nodes() {
        let sim = Simulation::new(pair()).unwrap();
        let cells = sim.quadtree_cells();
        assert_eq!(cells[0].mass, 2.0);
        assert_eq!(cells.iter().filter(|cell| cell.is_leaf).count(), 2);
    }
}
