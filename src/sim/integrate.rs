use eframe::egui::Vec2;
use serde::Serialize;

use crate::graph::Node;

/// Which quantity of a node stopped being finite during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Quantity {
    Velocity,
    Position,
}

/// A node whose update was discarded because it would have produced a
/// non-finite value. The node keeps its previous position and its velocity
/// is zeroed for that tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericWarning {
    pub index: usize,
    pub node_id: String,
    pub quantity: Quantity,
}

fn is_finite(value: Vec2) -> bool {
    value.x.is_finite() && value.y.is_finite()
}

/// Applies one tick of accumulated `forces` to every node.
///
/// Pinned nodes are moved onto their pin and lose their velocity; free nodes
/// get `v = (v + f * alpha) * velocity_decay` and `p += v`.
pub(crate) fn integrate(
    nodes: &mut [Node],
    forces: &[Vec2],
    alpha: f32,
    velocity_decay: f32,
) -> Vec<NumericWarning> {
    let mut warnings = Vec::new();

    for (index, (node, force)) in nodes.iter_mut().zip(forces).enumerate() {
        if let Some(fixed) = node.fixed {
            node.position = fixed;
            node.velocity = Vec2::ZERO;
            continue;
        }

        let velocity = (node.velocity + *force * alpha) * velocity_decay;
        let quantity = if !is_finite(velocity) {
            Some(Quantity::Velocity)
        } else if !is_finite(node.position + velocity) {
            Some(Quantity::Position)
        } else {
            None
        };

        if let Some(quantity) = quantity {
            node.velocity = Vec2::ZERO;
            warnings.push(NumericWarning {
                index,
                node_id: node.id().to_owned(),
                quantity,
            });
            continue;
        }

        node.velocity = velocity;
        node.position += velocity;
    }

    warnings
}
