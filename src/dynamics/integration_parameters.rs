//! The world's settings object: every numerical tolerance and iteration
//! count named in spec.md §5, gathered into one struct rather than the
//! scattered constants a naive port would leave behind.

use crate::math::Real;

/// How aggressively continuous collision detection runs.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContinuousDetectionMode {
    /// CCD never runs.
    None,
    /// CCD runs only for bodies flagged `Bullet`.
    Bullets,
    /// CCD runs for every dynamic body.
    All,
}

/// The settings object threaded through every pipeline stage.
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct IntegrationParameters {
    /// The simulation step size, `1 / step_frequency`.
    pub dt: Real,
    /// Maximum linear speed a body's velocity is clamped to.
    pub max_velocity: Real,
    /// Maximum angular speed a body's velocity is clamped to.
    pub max_angular_velocity: Real,
    /// Whether bodies are allowed to fall asleep.
    pub sleep_enabled: bool,
    /// Linear speed below which a body is considered "at rest" for sleep
    /// purposes.
    pub sleep_linear_threshold: Real,
    /// Angular speed below which a body is considered "at rest" for sleep
    /// purposes.
    pub sleep_angular_threshold: Real,
    /// How long an island must stay below the sleep thresholds before it is
    /// put to sleep.
    pub time_to_sleep: Real,
    /// Sequential-impulse velocity-solver iteration count.
    pub velocity_iterations: u32,
    /// Baumgarte position-correction iteration count.
    pub position_iterations: u32,
    /// Distance (not squared) within which a `Distance`-sentinel contact
    /// point is still matched to its predecessor for warm-starting.
    pub warm_start_distance: Real,
    /// Relative approach speed below which restitution is not applied (to
    /// avoid jitter from resolving resting contact as a bounce).
    pub restitution_velocity: Real,
    /// Penetration slop subtracted before Baumgarte correction.
    pub linear_tolerance: Real,
    /// Maximum per-iteration positional correction.
    pub max_linear_correction: Real,
    /// Baumgarte stabilisation coefficient, β.
    pub baumgarte: Real,
    /// AABB fattening margin used by the broad phase.
    pub expansion: Real,
    /// CCD root-finding convergence tolerance.
    pub ccd_tolerance: Real,
    /// CCD root-finding iteration cap.
    pub ccd_max_iterations: u32,
    /// Which bodies CCD runs for.
    pub continuous_detection_mode: ContinuousDetectionMode,
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        IntegrationParameters {
            dt: 1.0 / 60.0,
            max_velocity: 200.0,
            max_angular_velocity: 4.36,
            sleep_enabled: true,
            sleep_linear_threshold: 0.01,
            sleep_angular_threshold: 0.035,
            time_to_sleep: 0.5,
            velocity_iterations: 10,
            position_iterations: 10,
            warm_start_distance: 1e-2,
            restitution_velocity: 1.0,
            linear_tolerance: 0.005,
            max_linear_correction: 0.2,
            baumgarte: 0.2,
            expansion: 0.2,
            ccd_tolerance: 1e-3,
            ccd_max_iterations: 30,
            continuous_detection_mode: ContinuousDetectionMode::Bullets,
        }
    }
}

impl IntegrationParameters {
    /// `warm_start_distance`, squared — the unit the narrow phase actually
    /// compares against.
    pub fn warm_start_distance_squared(&self) -> Real {
        self.warm_start_distance * self.warm_start_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let p = IntegrationParameters::default();
        assert!((p.dt - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(p.velocity_iterations, 10);
        assert_eq!(p.position_iterations, 10);
        assert_eq!(p.baumgarte, 0.2);
        assert_eq!(p.ccd_max_iterations, 30);
    }

    #[test]
    fn warm_start_distance_is_stored_unsquared_but_compared_squared() {
        let p = IntegrationParameters::default();
        assert!((p.warm_start_distance_squared() - 1e-4).abs() < 1e-8);
    }
}
