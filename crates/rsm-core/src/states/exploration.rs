//! Exploration: drive to frontier goals handed out by the
//! [`GoalArbiter`][crate::goal_arbiter::GoalArbiter] until none are left.
//!
//! Sub-states (see [`ExplorationPhase`]):
//!
//! - `AwaitingFrontiers` – no usable frontier batch yet, or the last goal was
//!   reached and perception has not reported since.
//! - `SelectingGoal` – pick the first live goal that has not failed before.
//! - `AwaitingGoalResult` – poll the executor's status for the current goal
//!   and the arbiter's obsolete flag.
//!
//! A preempted exploration keeps its current goal and re-dispatches it on
//! re-entry. Stopping, switching away, or finishing cancels it.

use rsm_types::{GoalStatus, Interrupt, Mode, ModeCommand};
use tracing::{info, warn};

use crate::context::{ControllerContext, ExplorationPhase, ExplorationProgress};
use crate::state::{CommandOutcome, ExitReason, StateBehavior, StepOutcome};

pub fn behavior() -> StateBehavior {
    StateBehavior {
        on_entry,
        on_active,
        on_exit,
        on_interrupt,
        on_command,
    }
}

fn on_entry(ctx: &mut ControllerContext) {
    ctx.clear_goal_status();
    match ctx.arbiter.current_goal() {
        Some(goal) if !ctx.arbiter.is_goal_obsolete() => {
            info!(goal = ?goal.position, "resuming preserved exploration goal");
            ctx.navigate_to(goal);
            ctx.exploration.phase = ExplorationPhase::AwaitingGoalResult;
        }
        Some(_) => {
            ctx.arbiter.set_current_goal(None);
            ctx.exploration.phase = ExplorationPhase::SelectingGoal;
        }
        // A reached goal stays listed until perception reports again.
        None => {
            let fresh = ctx.arbiter.frontier_batches() > ctx.exploration.frontier_batch_seen;
            ctx.exploration.phase = if fresh {
                ExplorationPhase::SelectingGoal
            } else {
                ExplorationPhase::AwaitingFrontiers
            };
        }
    }
}

fn on_active(ctx: &mut ControllerContext) -> StepOutcome {
    match ctx.exploration.phase {
        ExplorationPhase::AwaitingFrontiers => {
            if ctx.arbiter.frontier_batches() > ctx.exploration.frontier_batch_seen {
                select_goal(ctx)
            } else {
                StepOutcome::Continue
            }
        }
        ExplorationPhase::SelectingGoal => select_goal(ctx),
        ExplorationPhase::AwaitingGoalResult => poll_goal(ctx),
    }
}

fn poll_goal(ctx: &mut ControllerContext) -> StepOutcome {
    let Some(goal) = ctx.arbiter.current_goal() else {
        return select_goal(ctx);
    };

    if ctx.arbiter.is_goal_obsolete() {
        info!(goal = ?goal.position, "exploration goal obsolete, aborting");
        ctx.cancel_navigation();
        ctx.arbiter.set_current_goal(None);
        return select_goal(ctx);
    }

    match ctx.take_goal_status_for(&goal) {
        None | Some(GoalStatus::InProgress) => StepOutcome::Continue,
        Some(GoalStatus::Reached) => {
            ctx.exploration.goals_reached += 1;
            info!(goal = ?goal.position, reached = ctx.exploration.goals_reached, "exploration goal reached");
            ctx.arbiter.set_current_goal(None);
            // The reached frontier is still listed until perception reports again.
            ctx.exploration.frontier_batch_seen = ctx.arbiter.frontier_batches();
            ctx.exploration.phase = ExplorationPhase::AwaitingFrontiers;
            StepOutcome::Continue
        }
        Some(GoalStatus::Failed) => {
            warn!(goal = ?goal.position, "exploration goal failed");
            ctx.arbiter.report_failed(goal);
            ctx.arbiter.set_current_goal(None);
            select_goal(ctx)
        }
        Some(GoalStatus::Obsolete) => {
            info!(goal = ?goal.position, "executor reported goal obsolete");
            ctx.cancel_navigation();
            ctx.arbiter.set_current_goal(None);
            select_goal(ctx)
        }
    }
}

fn select_goal(ctx: &mut ControllerContext) -> StepOutcome {
    if !ctx.arbiter.has_frontiers() {
        ctx.exploration.phase = ExplorationPhase::AwaitingFrontiers;
        return StepOutcome::Continue;
    }
    match ctx.arbiter.next_candidate() {
        Some(goal) => {
            info!(goal = ?goal.position, "new exploration goal");
            ctx.arbiter.set_current_goal(Some(goal));
            ctx.navigate_to(goal);
            ctx.exploration.phase = ExplorationPhase::AwaitingGoalResult;
            StepOutcome::Continue
        }
        None => {
            info!(
                reached = ctx.exploration.goals_reached,
                failed = ctx.arbiter.failed_goals().len(),
                "no exploration goals left, exploration finished"
            );
            StepOutcome::TransitionTo(Mode::Idle)
        }
    }
}

fn on_exit(ctx: &mut ControllerContext, reason: ExitReason) {
    match reason {
        ExitReason::Preempted(_) => ctx.halt_motion(),
        ExitReason::Finished | ExitReason::Resumed => {
            if ctx.arbiter.current_goal().is_some() {
                ctx.cancel_navigation();
            }
            ctx.arbiter.set_current_goal(None);
            ctx.exploration = ExplorationProgress {
                frontier_batch_seen: ctx.exploration.frontier_batch_seen,
                ..ExplorationProgress::default()
            };
        }
    }
}

fn on_interrupt(ctx: &mut ControllerContext, interrupt: Interrupt) {
    info!(%interrupt, goal = ?ctx.arbiter.current_goal().map(|g| g.position), "exploration preempted, goal kept");
}

fn on_command(ctx: &mut ControllerContext, command: ModeCommand) -> CommandOutcome {
    match command {
        ModeCommand::StartExploration => CommandOutcome::reject("Exploration is already running"),
        ModeCommand::StopExploration => CommandOutcome::transition(Mode::Idle, "Exploration stopped"),
        ModeCommand::StartWaypointFollowing if ctx.waypoints.is_empty() => {
            CommandOutcome::reject("No waypoints set")
        }
        ModeCommand::StartWaypointFollowing => {
            CommandOutcome::transition(Mode::WaypointFollowing, "Waypoint following started")
        }
        ModeCommand::StopWaypointFollowing => {
            CommandOutcome::reject("Waypoint following is not running")
        }
    }
}
