//! Emergency stop: halt everything and wait for an operator-confirmed resume.

use rsm_types::{Interrupt, ModeCommand, Twist};
use tracing::warn;

use crate::context::{ControllerContext, Outgoing};
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
    ctx.emit(Outgoing::Drive(Twist::zero()));
    warn!("emergency stop engaged, all motion halted");
}

fn on_interrupt(_ctx: &mut ControllerContext, interrupt: Interrupt) {
    warn!(%interrupt, "interrupt received during emergency stop");
}

fn on_command(_ctx: &mut ControllerContext, _command: ModeCommand) -> CommandOutcome {
    CommandOutcome::reject("Emergency stop active")
}
