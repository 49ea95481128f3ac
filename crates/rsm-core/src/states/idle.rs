//! Idle: nothing drives the robot; operator commands start the other modes.

use rsm_types::{Mode, ModeCommand};

use crate::context::ControllerContext;
use crate::state::{CommandOutcome, StateBehavior, no_exit, no_interrupt, no_step};

pub fn behavior() -> StateBehavior {
    StateBehavior {
        on_entry,
        on_active: no_step,
        on_exit: no_exit,
        on_interrupt: no_interrupt,
        on_command,
    }
}

fn on_entry(ctx: &mut ControllerContext) {
    ctx.halt_motion();
}

fn on_command(ctx: &mut ControllerContext, command: ModeCommand) -> CommandOutcome {
    match command {
        ModeCommand::StartExploration => {
            CommandOutcome::transition(Mode::Exploration, "Exploration started")
        }
        ModeCommand::StartWaypointFollowing if ctx.waypoints.is_empty() => {
            CommandOutcome::reject("No waypoints set")
        }
        ModeCommand::StartWaypointFollowing => {
            CommandOutcome::transition(Mode::WaypointFollowing, "Waypoint following started")
        }
        ModeCommand::StopExploration => CommandOutcome::reject("Exploration is not running"),
        ModeCommand::StopWaypointFollowing => {
            CommandOutcome::reject("Waypoint following is not running")
        }
    }
}
