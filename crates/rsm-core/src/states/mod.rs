//! Built-in behaviour records for the five modes.
//!
//! [`default_table`] returns them in [`Mode::ALL`] order, ready for
//! [`StateInterface::register_state`][crate::StateInterface::register_state].

pub mod emergency_stop;
pub mod exploration;
pub mod idle;
pub mod teleoperation;
pub mod waypoint_following;

use rsm_types::Mode;

use crate::state::StateBehavior;

pub fn default_table() -> [(Mode, StateBehavior); 5] {
    [
        (Mode::Idle, idle::behavior()),
        (Mode::Exploration, exploration::behavior()),
        (Mode::WaypointFollowing, waypoint_following::behavior()),
        (Mode::Teleoperation, teleoperation::behavior()),
        (Mode::EmergencyStop, emergency_stop::behavior()),
    ]
}
