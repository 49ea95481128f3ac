//! Teleoperation: a human drives; the autonomous executor is held.
//!
//! Left only through a teleoperation release (or an emergency stop on top).

use rsm_types::{Interrupt, ModeCommand};
use tracing::info;

use crate::context::ControllerContext;
use crate::state::{CommandOutcome, StateBehavior, no_exit, no_step};

pub fn behavior() -> StateBehavior {
    StateBehavior {
        on_entry,
        on_active: no_step,
        on_exit: no_exit,
        on_interrupt,
        on_command,
    }
}

fn on_entry(ctx: &mut ControllerContext) {
    ctx.halt_motion();
    info!("operator has manual control");
}

fn on_interrupt(_ctx: &mut ControllerContext, interrupt: Interrupt) {
    info!(%interrupt, "teleoperation preempted");
}

fn on_command(_ctx: &mut ControllerContext, _command: ModeCommand) -> CommandOutcome {
    CommandOutcome::reject("Not available during teleoperation")
}
