//! Waypoint following: drive through the operator's waypoint queue in order.
//!
//! Failed or obsolete waypoints are skipped. A repeated
//! `StartWaypointFollowing` toggles pause. The queue position survives
//! preemption; stopping or finishing rewinds it.

use rsm_types::{GoalStatus, Mode, ModeCommand};
use tracing::{info, warn};

use crate::context::{ControllerContext, WaypointPhase};
use crate::state::{CommandOutcome, ExitReason, StateBehavior, StepOutcome, no_interrupt};

pub fn behavior() -> StateBehavior {
    StateBehavior {
        on_entry,
        on_active,
        on_exit,
        on_interrupt: no_interrupt,
        on_command,
    }
}

fn on_entry(ctx: &mut ControllerContext) {
    ctx.clear_goal_status();
    if ctx.waypoints.phase != WaypointPhase::Paused {
        ctx.waypoints.phase = WaypointPhase::Dispatching;
    }
}

fn on_active(ctx: &mut ControllerContext) -> StepOutcome {
    match ctx.waypoints.phase {
        WaypointPhase::Paused => StepOutcome::Continue,
        WaypointPhase::Dispatching => match ctx.waypoints.current() {
            Some(waypoint) => {
                info!(index = ctx.waypoints.next, goal = ?waypoint.position, "driving to waypoint");
                ctx.navigate_to(waypoint);
                ctx.waypoints.phase = WaypointPhase::AwaitingGoalResult;
                StepOutcome::Continue
            }
            None => {
                info!(
                    reached = ctx.waypoints.reached,
                    skipped = ctx.waypoints.skipped,
                    "waypoint queue finished"
                );
                StepOutcome::TransitionTo(Mode::Idle)
            }
        },
        WaypointPhase::AwaitingGoalResult => {
            let Some(waypoint) = ctx.waypoints.current() else {
                ctx.waypoints.phase = WaypointPhase::Dispatching;
                return StepOutcome::Continue;
            };
            match ctx.take_goal_status_for(&waypoint) {
                None | Some(GoalStatus::InProgress) => {}
                Some(GoalStatus::Reached) => {
                    ctx.waypoints.reached += 1;
                    ctx.waypoints.next += 1;
                    ctx.waypoints.phase = WaypointPhase::Dispatching;
                }
                Some(status @ (GoalStatus::Failed | GoalStatus::Obsolete)) => {
                    warn!(index = ctx.waypoints.next, ?status, "skipping waypoint");
                    ctx.waypoints.skipped += 1;
                    ctx.waypoints.next += 1;
                    ctx.waypoints.phase = WaypointPhase::Dispatching;
                }
            }
            StepOutcome::Continue
        }
    }
}

fn on_exit(ctx: &mut ControllerContext, reason: ExitReason) {
    match reason {
        ExitReason::Preempted(_) => ctx.halt_motion(),
        ExitReason::Finished | ExitReason::Resumed => {
            if ctx.waypoints.phase == WaypointPhase::AwaitingGoalResult {
                ctx.cancel_navigation();
            }
            ctx.waypoints.rewind();
        }
    }
}

fn on_command(ctx: &mut ControllerContext, command: ModeCommand) -> CommandOutcome {
    match command {
        ModeCommand::StartWaypointFollowing if ctx.waypoints.phase == WaypointPhase::Paused => {
            ctx.waypoints.phase = WaypointPhase::Dispatching;
            CommandOutcome::ok("Waypoint following resumed")
        }
        ModeCommand::StartWaypointFollowing => {
            if ctx.waypoints.phase == WaypointPhase::AwaitingGoalResult {
                ctx.halt_motion();
            }
            ctx.waypoints.phase = WaypointPhase::Paused;
            CommandOutcome::ok("Waypoint following paused")
        }
        ModeCommand::StopWaypointFollowing => {
            CommandOutcome::transition(Mode::Idle, "Waypoint following stopped")
        }
        ModeCommand::StartExploration => {
            CommandOutcome::transition(Mode::Exploration, "Exploration started")
        }
        ModeCommand::StopExploration => CommandOutcome::reject("Exploration is not running"),
    }
}
