use eframe::egui::{Vec2, vec2};
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_ALPHA_MIN: f32 = 0.001;
/// Ticks a full-energy run takes to reach the default `alpha_min`.
pub const DEFAULT_ITERATIONS: f32 = 300.0;

/// Every tunable of the simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Many-body coefficient; negative values repel.
    pub repulsion_strength: f32,
    pub link_distance: f32,
    /// Stiffness for links that do not carry their own.
    pub link_strength: f32,
    pub center_target: Vec2,
    pub center_strength: f32,
    /// Fraction of velocity kept after each tick.
    pub velocity_decay: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    /// Barnes–Hut accuracy; 0 evaluates every pair exactly.
    pub theta: f32,
    /// Distances below this are softened in the many-body term.
    pub distance_min: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            repulsion_strength: -100.0,
            link_distance: 60.0,
            link_strength: 1.0,
            center_target: Vec2::ZERO,
            center_strength: 0.07,
            velocity_decay: 0.6,
            alpha_decay: alpha_decay_for(DEFAULT_ALPHA_MIN, DEFAULT_ITERATIONS),
            alpha_min: DEFAULT_ALPHA_MIN,
            theta: 0.9,
            distance_min: 1.0,
        }
    }
}

/// Per-tick decay that takes alpha from 1 to `alpha_min` in `iterations` ticks.
pub fn alpha_decay_for(alpha_min: f32, iterations: f32) -> f32 {
    1.0 - alpha_min.powf(1.0 / iterations)
}

/// Partial configuration; absent fields keep their current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigPatch {
    pub repulsion_strength: Option<f32>,
    pub link_distance: Option<f32>,
    pub link_strength: Option<f32>,
    pub center_target: Option<[f32; 2]>,
    pub center_strength: Option<f32>,
    pub velocity_decay: Option<f32>,
    pub alpha_decay: Option<f32>,
    pub alpha_min: Option<f32>,
    pub theta: Option<f32>,
    pub distance_min: Option<f32>,
}

impl SimulationConfig {
    /// Returns the patched configuration, or the first invalid field.
    pub fn merged(&self, patch: &ConfigPatch) -> Result<Self, ConfigError> {
        let merged = Self {
            repulsion_strength: patch.repulsion_strength.unwrap_or(self.repulsion_strength),
            link_distance: patch.link_distance.unwrap_or(self.link_distance),
            link_strength: patch.link_strength.unwrap_or(self.link_strength),
            center_target: patch
                .center_target
                .map(|[x, y]| vec2(x, y))
                .unwrap_or(self.center_target),
            center_strength: patch.center_strength.unwrap_or(self.center_strength),
            velocity_decay: patch.velocity_decay.unwrap_or(self.velocity_decay),
            alpha_decay: patch.alpha_decay.unwrap_or(self.alpha_decay),
            alpha_min: patch.alpha_min.unwrap_or(self.alpha_min),
            theta: patch.theta.unwrap_or(self.theta),
            distance_min: patch.distance_min.unwrap_or(self.distance_min),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("repulsionStrength", self.repulsion_strength)?;
        finite("centerTarget", self.center_target.x)?;
        finite("centerTarget", self.center_target.y)?;
        finite("centerStrength", self.center_strength)?;
        at_least("linkDistance", self.link_distance, 0.0, "[0, inf)")?;
        at_least("linkStrength", self.link_strength, 0.0, "[0, inf)")?;
        at_least("distanceMin", self.distance_min, 0.0, "[0, inf)")?;
        unit_interval("velocityDecay", self.velocity_decay)?;
        unit_interval("alphaDecay", self.alpha_decay)?;
        unit_interval("alphaMin", self.alpha_min)?;
        unit_interval("theta", self.theta)?;
        Ok(())
    }
}

pub(crate) fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

pub(crate) fn at_least(
    field: &'static str,
    value: f32,
    min: f32,
    expected: &'static str,
) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < min {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            expected,
        });
    }
    Ok(())
}

pub(crate) fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "[0, 1]",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.alpha_decay - 0.0228).abs() < 0.0005);
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let config = SimulationConfig::default();
        let patch = ConfigPatch {
            link_distance: Some(30.0),
            center_target: Some([500.0, 500.0]),
            ..Default::default()
        };
        let merged = config.merged(&patch).unwrap();
        assert_eq!(merged.link_distance, 30.0);
        assert_eq!(merged.center_target, vec2(500.0, 500.0));
        assert_eq!(merged.repulsion_strength, config.repulsion_strength);
        assert_eq!(merged.alpha_decay, config.alpha_decay);
    }

    #[test]
    fn test_negative_alpha_min_rejected() {
        let patch = ConfigPatch {
            alpha_min: Some(-0.1),
            ..Default::default()
        };
        let err = SimulationConfig::default().merged(&patch).unwrap_err();
        assert_eq!(
            err,
            ConfigError::OutOfRange {
                field: "alphaMin",
                value: -0.1,
                expected: "[0, 1]",
            }
        );
    }

    #[test]
    fn test_theta_outside_unit_interval_rejected() {
        let patch = ConfigPatch {
            theta: Some(1.5),
            ..Default::default()
        };
        assert!(SimulationConfig::default().merged(&patch).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let patch = ConfigPatch {
            repulsion_strength: Some(f32::NAN),
            ..Default::default()
        };
        assert_eq!(
            SimulationConfig::default().merged(&patch),
            Err(ConfigError::NonFinite {
                field: "repulsionStrength"
            })
        );
    }

    #[test]
    fn test_patch_from_json() {
        let patch: ConfigPatch =
            serde_json::from_str(r#"{ "repulsionStrength": -30, "centerTarget": [500, 500] }"#)
                .unwrap();
        assert_eq!(patch.repulsion_strength, Some(-30.0));
        assert_eq!(patch.center_target, Some([500.0, 500.0]));
        assert_eq!(patch.theta, None);
    }

    #[test]
    fn test_patch_rejects_unknown_keys() {
        let result = serde_json::from_str::<ConfigPatch>(r#"{ "charge": -30 }"#);
        assert!(result.is_err());
    }
}
