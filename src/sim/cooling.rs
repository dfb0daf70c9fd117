use super::config::SimulationConfig;

/// Energy schedule: alpha moves toward `alpha_target` by a fixed fraction
/// per tick and the run is settled once alpha drops below `alpha_min`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cooling {
    alpha: f32,
    alpha_target: f32,
    alpha_min: f32,
    alpha_decay: f32,
}

impl Cooling {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            alpha: 1.0,
            alpha_target: 0.0,
            alpha_min: config.alpha_min,
            alpha_decay: config.alpha_decay,
        }
    }

    pub fn apply_config(&mut self, config: &SimulationConfig) {
        self.alpha_min = config.alpha_min;
        self.alpha_decay = config.alpha_decay;
    }

    /// Advances one tick and returns the new alpha.
    pub fn step(&mut self) -> f32 {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        self.alpha = self.alpha.clamp(0.0, 1.0);
        self.alpha
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.alpha_min
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    /// Callers validate `alpha` to [0, 1].
    pub(crate) fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    /// Callers validate `target` to [0, 1].
    pub(crate) fn set_target(&mut self, target: f32) {
        self.alpha_target = target;
    }
}
