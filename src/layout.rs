use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};

const INITIAL_RADIUS: f32 = 10.0;

/// Starting position for the node at `index` when the dataset gives none.
///
/// Nodes are laid out on a phyllotaxis spiral around the origin, so that
/// consecutive indices never coincide and the initial density is uniform.
pub fn initial_position(index: usize) -> Vec2 {
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * golden_angle;
    vec2(angle.cos(), angle.sin()) * radius
}
