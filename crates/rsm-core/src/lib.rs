//! `rsm-core` – Mode arbitration & goal bookkeeping
//!
//! The decision layer of the mission controller. It selects and supervises
//! exactly one autonomy [`Mode`][rsm_types::Mode] at a time and keeps the
//! exploration goal lists consistent with navigation feedback.
//!
//! # Modules
//!
//! - [`goal_arbiter`] – [`GoalArbiter`][goal_arbiter::GoalArbiter]:
//!   live exploration goals, failed goals, the obsolescence flag for the goal
//!   being navigated, and the exploration-mode policy. Lists are immutable
//!   snapshots swapped wholesale on update.
//! - [`context`] – [`ControllerContext`][context::ControllerContext]: the one
//!   process-scoped bundle of shared state handed to every mode hook, plus
//!   the outbox of commands the hooks emit.
//! - [`state`] – [`StateBehavior`][state::StateBehavior]: the behaviour record
//!   (entry/step/exit/interrupt/command hooks) registered per mode.
//! - [`states`] – the five built-in behaviour records.
//! - [`state_interface`] – [`StateInterface`][state_interface::StateInterface]:
//!   owns the active mode, enforces the transition rules, routes interrupts,
//!   commands and resumes, and ticks the active mode once per control cycle.
//!
//! Nothing in this crate blocks. Hooks that need an external result poll the
//! context on later ticks.

pub mod context;
pub mod goal_arbiter;
pub mod state;
pub mod state_interface;
pub mod states;

pub use context::{ControllerContext, Outgoing};
pub use goal_arbiter::{FrontierUpdate, GoalArbiter, GoalSnapshot};
pub use state::{CommandOutcome, ExitReason, StateBehavior, StepOutcome};
pub use state_interface::{StateInterface, TransitionError};
