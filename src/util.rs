use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use eframe::egui::Color32;

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// A colour that stays the same for a node across runs.
pub fn node_color(id: &str) -> Color32 {
    let (hue, shade) = stable_pair(id);
    let hue = (hue + 1.0) * 0.5;
    let shade = 0.55 + (shade + 1.0) * 0.15;
    let r = 90.0 + 150.0 * hue;
    let g = 210.0 - 120.0 * hue;
    let b = 120.0 + 110.0 * (1.0 - hue);
    Color32::from_rgb(
        (r * shade) as u8,
        (g * shade) as u8,
        (b * shade).min(255.0) as u8,
    )
}

pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_owned();
    }
    let mut truncated = label.chars().take(max_chars.saturating_sub(1)).collect::<String>();
    truncated.push('…');
    truncated
}
