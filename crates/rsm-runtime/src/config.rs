//! [`ControllerConfig`] – settings the controller is built from.

use std::time::Duration;

use rsm_types::ExplorationModePolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Control-loop tick rate.
    pub loop_rate_hz: u32,
    /// Radius (m) within which two goal poses are considered the same.
    pub goal_tolerance: f64,
    pub exploration_mode: ExplorationModePolicy,
    /// Initial state of reverse driving.
    pub reverse_mode: bool,
    pub bus_capacity: usize,
    pub sensor_joint_id: String,
    /// Home position (rad) the sensor reset drives to.
    pub sensor_home_position: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            loop_rate_hz: 20,
            goal_tolerance: 0.5,
            exploration_mode: ExplorationModePolicy::CompleteGoal,
            reverse_mode: false,
            bus_capacity: 256,
            sensor_joint_id: "sensor_tilt".to_string(),
            sensor_home_position: 0.0,
        }
    }
}

impl ControllerConfig {
    /// Interval between ticks. A zero rate is treated as 1 Hz.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.loop_rate_hz.max(1)))
    }
}
