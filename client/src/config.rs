use shared::{PLAYER_SPEED, TICK_SECONDS};
use std::time::Duration;

/// How many seconds one prediction tick advances the controlled player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeStep {
    /// Same step every frame regardless of how long the frame took.
    Fixed(f32),
    /// Real frame time, capped so a stalled frame cannot teleport the player.
    Measured { max: f32 },
}

impl TimeStep {
    pub fn seconds(&self, elapsed: Duration) -> f32 {
        match *self {
            Self::Fixed(step) => step,
            Self::Measured { max } => elapsed.as_secs_f32().min(max),
        }
    }
}

impl Default for TimeStep {
    fn default() -> Self {
        Self::Fixed(TICK_SECONDS)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub player_speed: f32,
    pub time_step: TimeStep,
    /// How long an explosion burst stays on screen.
    pub burst_lifetime: Duration,
    pub hit_shake_intensity: f32,
    pub hit_shake_duration: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            player_speed: PLAYER_SPEED,
            time_step: TimeStep::default(),
            burst_lifetime: Duration::from_millis(800),
            hit_shake_intensity: 0.008,
            hit_shake_duration: Duration::from_millis(150),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_step_ignores_frame_time() {
        let step = TimeStep::default();
        assert_eq!(step.seconds(Duration::from_millis(250)), TICK_SECONDS);
        assert_eq!(step.seconds(Duration::ZERO), TICK_SECONDS);
    }

    #[test]
    fn test_measured_step_is_capped() {
        let step = TimeStep::Measured { max: 0.05 };
        assert!((step.seconds(Duration::from_millis(20)) - 0.02).abs() < 1e-6);
        assert_eq!(step.seconds(Duration::from_secs(3)), 0.05);
    }
}
