//! `rsm-additions` – Side services around the mode state machine
//!
//! Small, independent services the mission controller exposes next to the
//! mode core. None of them touch the active mode.
//!
//! # Modules
//!
//! - [`reverse_bridge`] – [`ReverseMotionBridge`][reverse_bridge::ReverseMotionBridge]:
//!   optionally flips the sign of the navigation executor's linear velocity
//!   so forward-only plans can be driven backwards.
//! - [`goal_relay`] – [`GoalRelay`][goal_relay::GoalRelay]: acknowledges goals
//!   from an external exploration client immediately, for protocol
//!   compatibility only.
//! - [`actuator`] – the [`Actuator`][actuator::Actuator] seam for
//!   position-controlled joints, plus an in-process [`SimActuator`][actuator::SimActuator].
//! - [`sensor_reset`] – [`SensorPoseReset`][sensor_reset::SensorPoseReset]:
//!   drives the auxiliary sensor joint back to its home position.

pub mod actuator;
pub mod goal_relay;
pub mod reverse_bridge;
pub mod sensor_reset;

pub use actuator::{Actuator, SimActuator};
pub use goal_relay::{GoalRelay, RelayedGoal};
pub use reverse_bridge::ReverseMotionBridge;
pub use sensor_reset::SensorPoseReset;
