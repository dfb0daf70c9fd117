//! Named force terms summed into a per-node accumulator each tick.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::config::{SimulationConfig, at_least, finite, unit_interval};
use crate::error::ConfigError;
use super::quadtree::QuadNode;
use crate::graph::Link;

pub const CHARGE: &str = "charge";
pub const LINK: &str = "link";
pub const CENTER: &str = "center";

/// Separation given to two bodies that share a position.
const JITTER: f32 = f32::EPSILON * 8.0;

/// Many-body term, approximated with a Barnes–Hut partition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManyBody {
    /// Negative repels.
    pub strength: f32,
    pub theta: f32,
    pub distance_min: f32,
}

/// Spring along every link toward its ideal distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkSpring {
    /// Ideal distance for links that carry none.
    pub distance: f32,
    /// Multiplier on each link's own stiffness.
    pub strength: f32,
}

/// Linear pull of every node toward `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Center {
    pub target: Vec2,
    pub strength: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Force {
    ManyBody(ManyBody),
    Link(LinkSpring),
    Center(Center),
}

/// Read-only view of the previous tick's state.
pub(crate) struct ForceInput<'a> {
    pub(crate) positions: &'a [Vec2],
    pub(crate) links: &'a [Link],
    pub(crate) degree: &'a [usize],
}

impl Force {
    /// Applies the same bounds `configure` enforces on the built-in forces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::ManyBody(params) => {
                finite("strength", params.strength)?;
                unit_interval("theta", params.theta)?;
                at_least("distanceMin", params.distance_min, 0.0, "[0, inf)")
            }
            Self::Link(params) => {
                at_least("distance", params.distance, 0.0, "[0, inf)")?;
                at_least("strength", params.strength, 0.0, "[0, inf)")
            }
            Self::Center(params) => {
                finite("target", params.target.x)?;
                finite("target", params.target.y)?;
                finite("strength", params.strength)
            }
        }
    }

    pub(crate) fn accumulate(&self, input: &ForceInput<'_>, forces: &mut [Vec2]) {
        match self {
            Self::ManyBody(params) => accumulate_many_body(params, input.positions, forces),
            Self::Link(params) => accumulate_links(params, input, forces),
            Self::Center(params) => accumulate_center(params, input.positions, forces),
        }
    }
}

/// Forces keyed by name, evaluated in name order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForceRegistry {
    forces: BTreeMap<String, Force>,
}

impl ForceRegistry {
    /// `charge`, `link` and `center` built from `config`.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let forces = [
            (CHARGE, Force::ManyBody(many_body_from(config))),
            (LINK, Force::Link(link_from(config))),
            (CENTER, Force::Center(center_from(config))),
        ];
        Self {
            forces: forces
                .into_iter()
                .map(|(name, force)| (name.to_owned(), force))
                .collect(),
        }
    }

    /// Replaces the parameters of the default-named forces that are still
    /// registered; custom entries are left alone.
    pub fn apply_config(&mut self, config: &SimulationConfig) {
        if let Some(Force::ManyBody(params)) = self.forces.get_mut(CHARGE) {
            *params = many_body_from(config);
        }
        if let Some(Force::Link(params)) = self.forces.get_mut(LINK) {
            *params = link_from(config);
        }
        if let Some(Force::Center(params)) = self.forces.get_mut(CENTER) {
            *params = center_from(config);
        }
    }

    /// Registers `force` under `name`, returning the force it replaces. An
    /// invalid force is rejected and the registry is left unchanged.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        force: Force,
    ) -> Result<Option<Force>, ConfigError> {
        force.validate()?;
        Ok(self.forces.insert(name.into(), force))
    }

    pub fn remove(&mut self, name: &str) -> Option<Force> {
        self.forces.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Force> {
        self.forces.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.forces.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// Sums every force into `forces`, which must be zeroed and sized to the
    /// node count.
    pub(crate) fn accumulate(&self, input: &ForceInput<'_>, forces: &mut [Vec2]) {
        for force in self.forces.values() {
            force.accumulate(input, forces);
        }
    }
}

fn many_body_from(config: &SimulationConfig) -> ManyBody {
    ManyBody {
        strength: config.repulsion_strength,
        theta: config.theta,
        distance_min: config.distance_min,
    }
}

fn link_from(config: &SimulationConfig) -> LinkSpring {
    LinkSpring {
        distance: config.link_distance,
        strength: config.link_strength,
    }
}

fn center_from(config: &SimulationConfig) -> Center {
    Center {
        target: config.center_target,
        strength: config.center_strength,
    }
}

/// Deterministic tiny offset for the pair `(from, to)`; swapping the pair
/// flips the sign, so the two bodies are pushed apart symmetrically.
pub(crate) fn jitter(from: usize, to: usize) -> Vec2 {
    let (low, high, sign) = if from < to {
        (from, to, 1.0)
    } else {
        (to, from, -1.0)
    };
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * TAU;
    vec2(angle.cos(), angle.sin()) * (JITTER * sign)
}

/// Contribution on a body at the origin of `delta` from a body of `mass` at
/// `delta`.
fn pairwise(delta: Vec2, mass: f32, strength: f32, distance_min_sq: f32) -> Vec2 {
    let mut distance_sq = delta.length_sq();
    if distance_sq < distance_min_sq {
        distance_sq = (distance_min_sq * distance_sq).sqrt();
    }
    delta * (strength * mass / distance_sq)
}

fn accumulate_many_body(params: &ManyBody, positions: &[Vec2], forces: &mut [Vec2]) {
    if positions.len() < 2 || params.strength == 0.0 {
        return;
    }
    let Some(quadtree) = QuadNode::build(positions) else {
        return;
    };

    for (index, force) in forces.iter_mut().enumerate() {
        accumulate_repulsion_for_node(&quadtree, index, positions, params, force);
    }
}

pub(crate) fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: &ManyBody,
    force: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];
    let distance_min_sq = params.distance_min * params.distance_min;

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let mut delta = positions[other_index] - point;
            if delta == Vec2::ZERO {
                delta = jitter(index, other_index);
            }
            *force += pairwise(delta, 1.0, params.strength, distance_min_sq);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance = delta.length();
    let can_approximate = !node.bounds.contains(point)
        && distance > 0.0
        && (node.bounds.side_length() / distance) < params.theta;

    if can_approximate {
        *force += pairwise(delta, node.mass, params.strength, distance_min_sq);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion_for_node(child, index, positions, params, force);
    }
}

fn accumulate_links(params: &LinkSpring, input: &ForceInput<'_>, forces: &mut [Vec2]) {
    for link in input.links {
        let (source, target) = (link.source, link.target);
        if source == target {
            continue;
        }

        let mut delta = input.positions[target] - input.positions[source];
        if delta == Vec2::ZERO {
            delta = jitter(source, target);
        }
        let distance = delta.length();
        let ideal = link.distance.unwrap_or(params.distance);
        let stiffness = link.strength * params.strength;
        let correction = delta * ((distance - ideal) / distance * stiffness);

        let source_degree = input.degree[source] as f32;
        let target_degree = input.degree[target] as f32;
        let bias = source_degree / (source_degree + target_degree);

        forces[target] -= correction * bias;
        forces[source] += correction * (1.0 - bias);
    }
}

fn accumulate_center(params: &Center, positions: &[Vec2], forces: &mut [Vec2]) {
    if params.strength == 0.0 {
        return;
    }
    for (force, position) in forces.iter_mut().zip(positions) {
        *force += (params.target - *position) * params.strength;
    }
}
