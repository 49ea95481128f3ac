//! [`StateBehavior`] – the behaviour record registered for each mode.
//!
//! The mode set is closed, so instead of trait objects each mode is a table
//! row of plain function pointers operating on the shared
//! [`ControllerContext`]. Per-mode data lives in the context.
//!
//! Every hook must return promptly. A mode that waits on an external result
//! records a sub-state in the context and checks it again on the next
//! [`on_active`][StateBehavior::on_active] tick.

use rsm_types::{Interrupt, Mode, ModeCommand, RsmError};

use crate::context::ControllerContext;

/// What the active mode wants after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// Leave the mode on its own accord (goal queue exhausted and similar).
    TransitionTo(Mode),
}

/// How the active mode answers an operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Handled in place.
    Reply(Result<String, RsmError>),
    /// Ask the state interface for a transition; `message` is the reply if
    /// the transition is honoured.
    Transition { target: Mode, message: String },
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::Reply(Ok(message.into()))
    }

    pub fn reject(message: impl Into<String>) -> Self {
        Self::Reply(Err(RsmError::CommandRejected(message.into())))
    }

    pub fn transition(target: Mode, message: impl Into<String>) -> Self {
        Self::Transition {
            target,
            message: message.into(),
        }
    }
}

/// Why a mode is being left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Preempted by an interrupt; in-progress work must be kept for resume.
    Preempted(Interrupt),
    /// Stopped, switched away from, or finished; in-progress work is dropped.
    Finished,
    /// Left through an explicit resume.
    Resumed,
}

/// Lifecycle hooks for one mode.
#[derive(Debug, Clone, Copy)]
pub struct StateBehavior {
    pub on_entry: fn(&mut ControllerContext),
    pub on_active: fn(&mut ControllerContext) -> StepOutcome,
    pub on_exit: fn(&mut ControllerContext, ExitReason),
    pub on_interrupt: fn(&mut ControllerContext, Interrupt),
    pub on_command: fn(&mut ControllerContext, ModeCommand) -> CommandOutcome,
}

/// Hook that does nothing; handy for rows that only care about a few events.
pub fn no_entry(_: &mut ControllerContext) {}

pub fn no_step(_: &mut ControllerContext) -> StepOutcome {
    StepOutcome::Continue
}

pub fn no_exit(_: &mut ControllerContext, _: ExitReason) {}

pub fn no_interrupt(_: &mut ControllerContext, _: Interrupt) {}
