//! [`StateInterface`] – owner of the active mode.
//!
//! Holds the registered [`StateBehavior`] table and exactly one active
//! [`Mode`]. Every change of mode goes through the same sequence: the
//! outgoing mode's `on_exit`, the swap itself (logged and announced through
//! [`Outgoing::ModeChanged`]), then the incoming mode's `on_entry`.
//!
//! # Transition rules
//!
//! | From | To | Via |
//! |---|---|---|
//! | Idle | Exploration, WaypointFollowing, Teleoperation | request |
//! | Exploration | WaypointFollowing (and back) | request |
//! | any non-interrupt mode | Idle | request or step |
//! | Idle, Exploration, WaypointFollowing | Teleoperation | `TeleoperationInterrupt` |
//! | any | EmergencyStop | `EmergencyStop` interrupt |
//! | Teleoperation, EmergencyStop | the preempted mode | [`resume`][StateInterface::resume] |
//!
//! While an interrupt holds the controller every request is rejected.
//! Preemptions nest: the interrupted modes are kept on a stack and `resume`
//! pops one level at a time.

use std::collections::HashMap;

use rsm_types::{Interrupt, Mode, ModeCommand, RsmError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::{ControllerContext, Outgoing};
use crate::state::{CommandOutcome, ExitReason, StateBehavior, StepOutcome};
use crate::states;

// ────────────────────────────────────────────────────────────────────────────
// TransitionError
// ────────────────────────────────────────────────────────────────────────────

/// Why [`StateInterface::request_transition`] refused a target.
///
/// A rejection never mutates the state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{0} is already active")]
    AlreadyActive(Mode),

    #[error("{0} was never registered")]
    Unregistered(Mode),

    #[error("{interrupt} is holding {active}; resume first")]
    Suppressed {
        active: Mode,
        target: Mode,
        interrupt: Interrupt,
    },

    #[error("{to} is entered only by interrupt")]
    InterruptOnly { from: Mode, to: Mode },

    #[error("{from} cannot switch to {to}")]
    NotAllowed { from: Mode, to: Mode },

    #[error("state interface has not been started")]
    NotStarted,
}

impl From<TransitionError> for RsmError {
    fn from(err: TransitionError) -> Self {
        let reason = err.to_string();
        match err {
            TransitionError::AlreadyActive(mode) => RsmError::TransitionRejected {
                from: mode,
                to: mode,
                reason,
            },
            TransitionError::Unregistered(mode) => RsmError::UnregisteredMode(mode),
            TransitionError::Suppressed { active, target, .. } => RsmError::TransitionRejected {
                from: active,
                to: target,
                reason,
            },
            TransitionError::InterruptOnly { from, to } | TransitionError::NotAllowed { from, to } => {
                RsmError::TransitionRejected { from, to, reason }
            }
            TransitionError::NotStarted => RsmError::Config(reason),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// StateInterface
// ────────────────────────────────────────────────────────────────────────────

/// A mode set aside by an interrupt, together with the suppression it was
/// running under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Preempted {
    mode: Mode,
    suppressed_by: Option<Interrupt>,
}

/// The mode state machine.
///
/// # Example
///
/// ```
/// use rsm_core::{ControllerContext, GoalArbiter, StateInterface};
/// use rsm_types::{ExplorationModePolicy, Interrupt, Mode};
///
/// let mut ctx = ControllerContext::new(GoalArbiter::new(0.5, ExplorationModePolicy::CompleteGoal));
/// let mut fsm = StateInterface::with_default_states();
/// fsm.start(&mut ctx).unwrap();
///
/// fsm.request_transition(&mut ctx, Mode::Exploration).unwrap();
/// fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop).unwrap();
/// assert_eq!(fsm.active(), Mode::EmergencyStop);
///
/// // Still asserted: resume is refused.
/// assert!(fsm.resume(&mut ctx, Interrupt::EmergencyStop).is_err());
/// ctx.emergency_stop_asserted = false;
/// assert_eq!(fsm.resume(&mut ctx, Interrupt::EmergencyStop).unwrap(), Mode::Exploration);
/// ```
#[derive(Debug, Default)]
pub struct StateInterface {
    table: HashMap<Mode, StateBehavior>,
    active: Mode,
    suppressed_by: Option<Interrupt>,
    preempted: Vec<Preempted>,
    started: bool,
}

impl StateInterface {
    /// An empty interface; register every mode before [`start`][Self::start].
    pub fn new() -> Self {
        Self::default()
    }

    /// An interface with the five built-in behaviours already registered.
    pub fn with_default_states() -> Self {
        Self {
            table: states::default_table().into_iter().collect(),
            ..Self::default()
        }
    }

    /// Register the behaviour for `mode`. Fails on a second registration of
    /// the same mode or once the interface has started.
    pub fn register_state(&mut self, mode: Mode, behavior: StateBehavior) -> Result<(), RsmError> {
        if self.started {
            return Err(RsmError::Config(format!(
                "cannot register {mode} after the controller has started"
            )));
        }
        if self.table.contains_key(&mode) {
            return Err(RsmError::DuplicateMode(mode));
        }
        self.table.insert(mode, behavior);
        debug!(%mode, "mode registered");
        Ok(())
    }

    /// Activate Idle. Idle and EmergencyStop must be registered; a missing
    /// one is a setup error reported before any tick runs.
    pub fn start(&mut self, ctx: &mut ControllerContext) -> Result<(), RsmError> {
        for required in [Mode::Idle, Mode::EmergencyStop] {
            if !self.table.contains_key(&required) {
                return Err(RsmError::UnregisteredMode(required));
            }
        }
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.active = Mode::Idle;
        if let Some(idle) = self.table.get(&Mode::Idle).copied() {
            (idle.on_entry)(ctx);
        }
        info!(registered = self.table.len(), "state interface started in Idle");
        Ok(())
    }

    pub fn active(&self) -> Mode {
        self.active
    }

    /// The interrupt currently holding the controller, if any.
    pub fn suppressing_interrupt(&self) -> Option<Interrupt> {
        self.suppressed_by
    }

    /// Modes waiting to be resumed, oldest first.
    pub fn preempted_modes(&self) -> Vec<Mode> {
        self.preempted.iter().map(|p| p.mode).collect()
    }

    pub fn is_registered(&self, mode: Mode) -> bool {
        self.table.contains_key(&mode)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Switch to `target` if the transition rules allow it.
    pub fn request_transition(
        &mut self,
        ctx: &mut ControllerContext,
        target: Mode,
    ) -> Result<(), TransitionError> {
        if let Err(err) = self.check_transition(target) {
            warn!(from = %self.active, to = %target, %err, "transition rejected");
            return Err(err);
        }

        if target == Mode::Teleoperation {
            self.preempt(ctx, Interrupt::TeleoperationInterrupt, Mode::Teleoperation)
        } else {
            self.swap(ctx, target, ExitReason::Finished)
        }
    }

    fn check_transition(&self, target: Mode) -> Result<(), TransitionError> {
        let from = self.active;
        if !self.started {
            return Err(TransitionError::NotStarted);
        }
        if target == from {
            return Err(TransitionError::AlreadyActive(target));
        }
        if !self.table.contains_key(&target) {
            return Err(TransitionError::Unregistered(target));
        }
        if let Some(interrupt) = self.suppressed_by {
            return Err(TransitionError::Suppressed {
                active: from,
                target,
                interrupt,
            });
        }
        match target {
            Mode::EmergencyStop => Err(TransitionError::InterruptOnly { from, to: target }),
            Mode::Teleoperation if from != Mode::Idle => {
                Err(TransitionError::NotAllowed { from, to: target })
            }
            _ if from == Mode::Idle
                || target == Mode::Idle
                || (from.is_autonomous() && target.is_autonomous()) =>
            {
                Ok(())
            }
            _ => Err(TransitionError::NotAllowed { from, to: target }),
        }
    }

    /// Preempt the active mode.
    ///
    /// `EmergencyStop` always wins once started and is idempotent; it also
    /// latches `ctx.emergency_stop_asserted`. `TeleoperationInterrupt` is ignored
    /// during an emergency stop and idempotent during teleoperation.
    pub fn deliver_interrupt(
        &mut self,
        ctx: &mut ControllerContext,
        interrupt: Interrupt,
    ) -> Result<String, RsmError> {
        if !self.started {
            warn!(%interrupt, "interrupt before start");
            return Err(TransitionError::NotStarted.into());
        }
        if interrupt == Interrupt::EmergencyStop {
            ctx.emergency_stop_asserted = true;
        }
        if let Some(current) = self.table.get(&self.active).copied() {
            (current.on_interrupt)(ctx, interrupt);
        }

        match (interrupt, self.active) {
            (Interrupt::EmergencyStop, Mode::EmergencyStop) => {
                Ok("Emergency stop already active".to_string())
            }
            (Interrupt::EmergencyStop, _) => {
                self.preempt(ctx, interrupt, Mode::EmergencyStop)?;
                Ok("Emergency stop engaged".to_string())
            }
            (Interrupt::TeleoperationInterrupt, Mode::EmergencyStop) => {
                warn!("teleoperation ignored during emergency stop");
                Err(RsmError::InterruptIgnored {
                    interrupt,
                    active: Mode::EmergencyStop,
                })
            }
            (Interrupt::TeleoperationInterrupt, Mode::Teleoperation) => {
                Ok("Teleoperation already active".to_string())
            }
            (Interrupt::TeleoperationInterrupt, _) => {
                self.preempt(ctx, interrupt, Mode::Teleoperation)?;
                Ok("Teleoperation engaged".to_string())
            }
        }
    }

    /// Leave the mode entered through `from` and return to the mode it
    /// preempted.
    ///
    /// Rejected unless `from` is the interrupt currently holding the
    /// controller. Leaving an emergency stop additionally requires the stop
    /// to have been cleared.
    pub fn resume(
        &mut self,
        ctx: &mut ControllerContext,
        from: Interrupt,
    ) -> Result<Mode, RsmError> {
        if self.suppressed_by != Some(from) {
            return Err(RsmError::ResumeRejected(format!(
                "{from} is not holding the controller (active mode {})",
                self.active
            )));
        }
        if from == Interrupt::EmergencyStop && ctx.emergency_stop_asserted {
            return Err(RsmError::ResumeRejected(
                "emergency stop is still asserted".to_string(),
            ));
        }

        let previous = self.preempted.last().copied().unwrap_or(Preempted {
            mode: Mode::Idle,
            suppressed_by: None,
        });
        self.swap(ctx, previous.mode, ExitReason::Resumed)?;
        self.preempted.pop();
        self.suppressed_by = previous.suppressed_by;
        info!(mode = %previous.mode, %from, "resumed");
        Ok(previous.mode)
    }

    /// Withdraw the hold of `from`.
    ///
    /// When `from` is the active hold this is [`resume`][Self::resume].
    /// When a later interrupt sits on top of it (teleoperation released during
    /// an emergency stop), the mode `from` entered is dropped from the stack
    /// and the later resume returns past it.
    pub fn release(
        &mut self,
        ctx: &mut ControllerContext,
        from: Interrupt,
    ) -> Result<String, RsmError> {
        if self.suppressed_by == Some(from) {
            let mode = self.resume(ctx, from)?;
            return Ok(format!("Resumed {mode}"));
        }
        let Some(index) = self
            .preempted
            .iter()
            .rposition(|p| p.suppressed_by == Some(from))
        else {
            return Err(RsmError::ResumeRejected(format!(
                "{from} is not holding the controller (active mode {})",
                self.active
            )));
        };
        let released = self.preempted.remove(index);
        let returns_to = self.preempted.last().map_or(Mode::Idle, |p| p.mode);
        info!(mode = %released.mode, %from, "released under a later interrupt");
        Ok(format!("{} released; resume returns to {returns_to}", released.mode))
    }

    /// Route an operator command through the active mode.
    pub fn handle_command(
        &mut self,
        ctx: &mut ControllerContext,
        command: ModeCommand,
    ) -> Result<String, RsmError> {
        if !self.started {
            return Err(TransitionError::NotStarted.into());
        }
        let behavior = self
            .table
            .get(&self.active)
            .copied()
            .ok_or(RsmError::UnregisteredMode(self.active))?;

        match (behavior.on_command)(ctx, command) {
            CommandOutcome::Reply(reply) => reply,
            CommandOutcome::Transition { target, message } => {
                self.request_transition(ctx, target)?;
                Ok(message)
            }
        }
    }

    /// Run one non-blocking tick of the active mode.
    pub fn step(&mut self, ctx: &mut ControllerContext) {
        if !self.started {
            return;
        }
        let Some(behavior) = self.table.get(&self.active).copied() else {
            return;
        };
        if let StepOutcome::TransitionTo(target) = (behavior.on_active)(ctx)
            && let Err(err) = self.request_transition(ctx, target)
        {
            debug!(%err, "mode-initiated transition dropped");
        }
    }

    // ── internals ───────────────────────────────────────────────────────────

    /// Set the active mode aside and enter `target` under `interrupt`.
    fn preempt(
        &mut self,
        ctx: &mut ControllerContext,
        interrupt: Interrupt,
        target: Mode,
    ) -> Result<(), TransitionError> {
        let set_aside = Preempted {
            mode: self.active,
            suppressed_by: self.suppressed_by,
        };
        self.swap(ctx, target, ExitReason::Preempted(interrupt))?;
        self.preempted.push(set_aside);
        self.suppressed_by = Some(interrupt);
        Ok(())
    }

    /// exit hook -> swap -> entry hook.
    fn swap(
        &mut self,
        ctx: &mut ControllerContext,
        target: Mode,
        reason: ExitReason,
    ) -> Result<(), TransitionError> {
        let incoming = self
            .table
            .get(&target)
            .copied()
            .ok_or(TransitionError::Unregistered(target))?;
        if let Some(outgoing) = self.table.get(&self.active).copied() {
            (outgoing.on_exit)(ctx, reason);
        }

        let from = std::mem::replace(&mut self.active, target);
        info!(%from, to = %target, ?reason, "mode transition");
        ctx.emit(Outgoing::ModeChanged { from, to: target });

        (incoming.on_entry)(ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal_arbiter::GoalArbiter;
    use crate::state::{no_entry, no_exit, no_interrupt, no_step};
    use rsm_types::{
        ExplorationModePolicy, Frontier, GoalStatus, GoalStatusReport, NavigationCommand, Point,
        Pose,
    };

    fn ctx() -> ControllerContext {
        ControllerContext::new(GoalArbiter::new(0.5, ExplorationModePolicy::CompleteGoal))
    }

    fn started() -> (StateInterface, ControllerContext) {
        let mut ctx = ctx();
        let mut fsm = StateInterface::with_default_states();
        fsm.start(&mut ctx).unwrap();
        ctx.drain_outgoing();
        (fsm, ctx)
    }

    fn frontier(x: f64, y: f64) -> Frontier {
        let nearest = Point::new(x, y, 0.0);
        Frontier {
            cluster: vec![nearest],
            nearest,
        }
    }

    fn silent(_: &mut ControllerContext, _: ModeCommand) -> CommandOutcome {
        CommandOutcome::reject("silent")
    }

    fn silent_behavior() -> StateBehavior {
        StateBehavior {
            on_entry: no_entry,
            on_active: no_step,
            on_exit: no_exit,
            on_interrupt: no_interrupt,
            on_command: silent,
        }
    }

    fn mode_changes(ctx: &mut ControllerContext) -> Vec<(Mode, Mode)> {
        ctx.drain_outgoing()
            .into_iter()
            .filter_map(|o| match o {
                Outgoing::ModeChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    // ── registration ────────────────────────────────────────────────────────

    #[test]
    fn duplicate_registration_fails() {
        let mut fsm = StateInterface::new();
        fsm.register_state(Mode::Idle, silent_behavior()).unwrap();
        assert_eq!(
            fsm.register_state(Mode::Idle, silent_behavior()),
            Err(RsmError::DuplicateMode(Mode::Idle))
        );
    }

    #[test]
    fn start_fails_fast_without_emergency_stop() {
        let mut ctx = ctx();
        let mut fsm = StateInterface::new();
        fsm.register_state(Mode::Idle, silent_behavior()).unwrap();
        assert_eq!(
            fsm.start(&mut ctx),
            Err(RsmError::UnregisteredMode(Mode::EmergencyStop))
        );
        assert!(!fsm.is_started());
    }

    #[test]
    fn registration_is_closed_after_start() {
        let (mut fsm, _ctx) = started();
        assert!(matches!(
            fsm.register_state(Mode::Exploration, silent_behavior()),
            Err(RsmError::Config(_))
        ));
    }

    #[test]
    fn unregistered_target_is_rejected() {
        let mut ctx = ctx();
        let mut fsm = StateInterface::new();
        fsm.register_state(Mode::Idle, silent_behavior()).unwrap();
        fsm.register_state(Mode::EmergencyStop, silent_behavior()).unwrap();
        fsm.start(&mut ctx).unwrap();
        assert_eq!(
            fsm.request_transition(&mut ctx, Mode::Exploration),
            Err(TransitionError::Unregistered(Mode::Exploration))
        );
        assert_eq!(fsm.active(), Mode::Idle);
    }

    #[test]
    fn requests_before_start_are_rejected() {
        let mut ctx = ctx();
        let mut fsm = StateInterface::with_default_states();
        assert_eq!(
            fsm.request_transition(&mut ctx, Mode::Exploration),
            Err(TransitionError::NotStarted)
        );
    }

    #[test]
    fn interrupts_before_start_are_rejected() {
        let mut ctx = ctx();
        let mut fsm = StateInterface::with_default_states();
        assert_eq!(
            fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop),
            Err(RsmError::from(TransitionError::NotStarted))
        );
        assert!(!ctx.emergency_stop_asserted);

        fsm.start(&mut ctx).unwrap();
        assert_eq!(fsm.active(), Mode::Idle);
        assert_eq!(fsm.suppressing_interrupt(), None);
    }

    // ── request_transition ──────────────────────────────────────────────────

    #[test]
    fn idle_starts_autonomous_modes() {
        let (mut fsm, mut ctx) = started();
        fsm.request_transition(&mut ctx, Mode::Exploration).unwrap();
        assert_eq!(fsm.active(), Mode::Exploration);
        fsm.request_transition(&mut ctx, Mode::WaypointFollowing).unwrap();
        assert_eq!(fsm.active(), Mode::WaypointFollowing);
        fsm.request_transition(&mut ctx, Mode::Idle).unwrap();
        assert_eq!(
            mode_changes(&mut ctx),
            vec![
                (Mode::Idle, Mode::Exploration),
                (Mode::Exploration, Mode::WaypointFollowing),
                (Mode::WaypointFollowing, Mode::Idle),
            ]
        );
    }

    #[test]
    fn already_active_target_is_rejected() {
        let (mut fsm, mut ctx) = started();
        assert_eq!(
            fsm.request_transition(&mut ctx, Mode::Idle),
            Err(TransitionError::AlreadyActive(Mode::Idle))
        );
        assert!(ctx.drain_outgoing().is_empty());
    }

    #[test]
    fn emergency_stop_cannot_be_requested() {
        let (mut fsm, mut ctx) = started();
        assert_eq!(
            fsm.request_transition(&mut ctx, Mode::EmergencyStop),
            Err(TransitionError::InterruptOnly {
                from: Mode::Idle,
                to: Mode::EmergencyStop
            })
        );
    }

    #[test]
    fn teleoperation_requested_only_from_idle() {
        let (mut fsm, mut ctx) = started();
        fsm.request_transition(&mut ctx, Mode::Exploration).unwrap();
        assert_eq!(
            fsm.request_transition(&mut ctx, Mode::Teleoperation),
            Err(TransitionError::NotAllowed {
                from: Mode::Exploration,
                to: Mode::Teleoperation
            })
        );

        fsm.request_transition(&mut ctx, Mode::Idle).unwrap();
        fsm.request_transition(&mut ctx, Mode::Teleoperation).unwrap();
        assert_eq!(
            fsm.suppressing_interrupt(),
            Some(Interrupt::TeleoperationInterrupt)
        );
        assert_eq!(
            fsm.resume(&mut ctx, Interrupt::TeleoperationInterrupt).unwrap(),
            Mode::Idle
        );
    }

    #[test]
    fn requests_are_suppressed_while_interrupted() {
        let (mut fsm, mut ctx) = started();
        fsm.request_transition(&mut ctx, Mode::Exploration).unwrap();
        fsm.deliver_interrupt(&mut ctx, Interrupt::TeleoperationInterrupt)
            .unwrap();
        assert_eq!(
            fsm.request_transition(&mut ctx, Mode::Idle),
            Err(TransitionError::Suppressed {
                active: Mode::Teleoperation,
                target: Mode::Idle,
                interrupt: Interrupt::TeleoperationInterrupt,
            })
        );
        assert_eq!(fsm.active(), Mode::Teleoperation);
    }

    #[test]
    fn transition_error_converts_to_rsm_error() {
        let err: RsmError = TransitionError::NotAllowed {
            from: Mode::Exploration,
            to: Mode::Teleoperation,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Transition Exploration -> Teleoperation rejected: Exploration cannot switch to Teleoperation"
        );
    }

    // ── interrupts ──────────────────────────────────────────────────────────

    #[test]
    fn emergency_stop_preempts_every_mode() {
        for mode in Mode::ALL {
            let (mut fsm, mut ctx) = started();
            ctx.waypoints.set_queue(vec![Pose::from_xy(1.0, 0.0)]);
            match mode {
                Mode::Idle => {}
                Mode::Teleoperation => {
                    fsm.deliver_interrupt(&mut ctx, Interrupt::TeleoperationInterrupt)
                        .unwrap();
                }
                Mode::EmergencyStop => {
                    fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop)
                        .unwrap();
                }
                autonomous => fsm.request_transition(&mut ctx, autonomous).unwrap(),
            }
            assert_eq!(fsm.active(), mode);

            fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop)
                .unwrap();
            assert_eq!(fsm.active(), Mode::EmergencyStop, "from {mode}");
        }
    }

    #[test]
    fn emergency_stop_is_idempotent() {
        let (mut fsm, mut ctx) = started();
        fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop)
            .unwrap();
        ctx.drain_outgoing();

        let reply = fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop);
        assert!(reply.is_ok());
        assert_eq!(fsm.active(), Mode::EmergencyStop);
        assert_eq!(fsm.preempted_modes(), vec![Mode::Idle]);
        assert!(mode_changes(&mut ctx).is_empty());
    }

    #[test]
    fn teleoperation_does_not_preempt_emergency_stop() {
        let (mut fsm, mut ctx) = started();
        fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop)
            .unwrap();
        assert_eq!(
            fsm.deliver_interrupt(&mut ctx, Interrupt::TeleoperationInterrupt),
            Err(RsmError::InterruptIgnored {
                interrupt: Interrupt::TeleoperationInterrupt,
                active: Mode::EmergencyStop,
            })
        );
        assert_eq!(fsm.active(), Mode::EmergencyStop);
    }

    #[test]
    fn teleoperation_preserves_exploration_goal() {
        let (mut fsm, mut ctx) = started();
        ctx.arbiter.update_frontiers(&[frontier(3.0, 0.0)]);
        fsm.request_transition(&mut ctx, Mode::Exploration).unwrap();
        fsm.step(&mut ctx);
        assert_eq!(ctx.arbiter.current_goal(), Some(Pose::from_xy(3.0, 0.0)));
        ctx.drain_outgoing();

        fsm.deliver_interrupt(&mut ctx, Interrupt::TeleoperationInterrupt)
            .unwrap();
        let out = ctx.drain_outgoing();
        assert!(!out.contains(&Outgoing::Navigation(NavigationCommand::CancelNavigation)));
        assert_eq!(ctx.arbiter.current_goal(), Some(Pose::from_xy(3.0, 0.0)));

        fsm.resume(&mut ctx, Interrupt::TeleoperationInterrupt)
            .unwrap();
        assert_eq!(fsm.active(), Mode::Exploration);
        assert!(ctx.drain_outgoing().contains(&Outgoing::Navigation(
            NavigationCommand::NavigateTo(Pose::from_xy(3.0, 0.0))
        )));
    }

    // ── resume ──────────────────────────────────────────────────────────────

    #[test]
    fn emergency_resume_needs_clear_and_explicit_resume() {
        let (mut fsm, mut ctx) = started();
        fsm.request_transition(&mut ctx, Mode::Exploration).unwrap();
        fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop)
            .unwrap();

        assert!(matches!(
            fsm.resume(&mut ctx, Interrupt::EmergencyStop),
            Err(RsmError::ResumeRejected(_))
        ));

        ctx.emergency_stop_asserted = false;
        for _ in 0..3 {
            fsm.step(&mut ctx);
        }
        assert_eq!(fsm.active(), Mode::EmergencyStop);

        assert_eq!(
            fsm.resume(&mut ctx, Interrupt::EmergencyStop).unwrap(),
            Mode::Exploration
        );
        assert_eq!(fsm.suppressing_interrupt(), None);
    }

    #[test]
    fn nested_preemptions_resume_one_level_at_a_time() {
        let (mut fsm, mut ctx) = started();
        fsm.request_transition(&mut ctx, Mode::Exploration).unwrap();
        fsm.deliver_interrupt(&mut ctx, Interrupt::TeleoperationInterrupt)
            .unwrap();
        fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop)
            .unwrap();
        assert_eq!(
            fsm.preempted_modes(),
            vec![Mode::Exploration, Mode::Teleoperation]
        );

        // Releasing teleop while the stop holds the controller does nothing.
        assert!(fsm
            .resume(&mut ctx, Interrupt::TeleoperationInterrupt)
            .is_err());

        ctx.emergency_stop_asserted = false;
        assert_eq!(
            fsm.resume(&mut ctx, Interrupt::EmergencyStop).unwrap(),
            Mode::Teleoperation
        );
        assert_eq!(
            fsm.suppressing_interrupt(),
            Some(Interrupt::TeleoperationInterrupt)
        );
        assert_eq!(
            fsm.resume(&mut ctx, Interrupt::TeleoperationInterrupt).unwrap(),
            Mode::Exploration
        );
        assert!(fsm.preempted_modes().is_empty());
    }

    #[test]
    fn teleoperation_released_during_emergency_stop_is_skipped_on_resume() {
        let (mut fsm, mut ctx) = started();
        fsm.request_transition(&mut ctx, Mode::Exploration).unwrap();
        fsm.deliver_interrupt(&mut ctx, Interrupt::TeleoperationInterrupt)
            .unwrap();
        fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop)
            .unwrap();

        assert_eq!(
            fsm.release(&mut ctx, Interrupt::TeleoperationInterrupt),
            Ok("Teleoperation released; resume returns to Exploration".to_string())
        );
        assert_eq!(fsm.active(), Mode::EmergencyStop);
        assert_eq!(fsm.preempted_modes(), vec![Mode::Exploration]);

        ctx.emergency_stop_asserted = false;
        assert_eq!(
            fsm.resume(&mut ctx, Interrupt::EmergencyStop).unwrap(),
            Mode::Exploration
        );
        assert_eq!(fsm.suppressing_interrupt(), None);
        assert!(fsm.preempted_modes().is_empty());
    }

    #[test]
    fn release_of_active_hold_resumes_and_unknown_hold_is_rejected() {
        let (mut fsm, mut ctx) = started();
        assert!(matches!(
            fsm.release(&mut ctx, Interrupt::TeleoperationInterrupt),
            Err(RsmError::ResumeRejected(_))
        ));

        fsm.deliver_interrupt(&mut ctx, Interrupt::TeleoperationInterrupt)
            .unwrap();
        assert_eq!(
            fsm.release(&mut ctx, Interrupt::TeleoperationInterrupt),
            Ok("Resumed Idle".to_string())
        );
        assert_eq!(fsm.active(), Mode::Idle);
    }

    #[test]
    fn resumed_exploration_does_not_revisit_reached_goal() {
        let (mut fsm, mut ctx) = started();
        ctx.arbiter
            .update_frontiers(&[frontier(2.0, 0.0), frontier(6.0, 0.0)]);
        fsm.request_transition(&mut ctx, Mode::Exploration).unwrap();
        fsm.step(&mut ctx);
        ctx.record_goal_status(GoalStatusReport {
            goal: Pose::from_xy(2.0, 0.0),
            status: GoalStatus::Reached,
        });
        fsm.step(&mut ctx);

        fsm.deliver_interrupt(&mut ctx, Interrupt::TeleoperationInterrupt)
            .unwrap();
        fsm.resume(&mut ctx, Interrupt::TeleoperationInterrupt)
            .unwrap();
        ctx.drain_outgoing();
        fsm.step(&mut ctx);

        let dispatched: Vec<Pose> = ctx
            .drain_outgoing()
            .into_iter()
            .filter_map(|o| match o {
                Outgoing::Navigation(NavigationCommand::NavigateTo(goal)) => Some(goal),
                _ => None,
            })
            .collect();
        assert!(dispatched.is_empty(), "{dispatched:?}");
        assert_eq!(fsm.active(), Mode::Exploration);

        ctx.arbiter.update_frontiers(&[frontier(6.0, 0.0)]);
        fsm.step(&mut ctx);
        assert!(ctx.drain_outgoing().contains(&Outgoing::Navigation(
            NavigationCommand::NavigateTo(Pose::from_xy(6.0, 0.0))
        )));
    }

    #[test]
    fn resume_without_interrupt_is_rejected() {
        let (mut fsm, mut ctx) = started();
        assert!(matches!(
            fsm.resume(&mut ctx, Interrupt::EmergencyStop),
            Err(RsmError::ResumeRejected(_))
        ));
        assert_eq!(fsm.active(), Mode::Idle);
    }

    // ── commands and steps ──────────────────────────────────────────────────

    #[test]
    fn commands_route_through_active_mode() {
        let (mut fsm, mut ctx) = started();
        assert_eq!(
            fsm.handle_command(&mut ctx, ModeCommand::StartExploration),
            Ok("Exploration started".to_string())
        );
        assert_eq!(fsm.active(), Mode::Exploration);
        assert!(fsm
            .handle_command(&mut ctx, ModeCommand::StartExploration)
            .is_err());
        assert_eq!(
            fsm.handle_command(&mut ctx, ModeCommand::StopExploration),
            Ok("Exploration stopped".to_string())
        );
        assert_eq!(fsm.active(), Mode::Idle);
    }

    #[test]
    fn commands_are_rejected_during_emergency_stop() {
        let (mut fsm, mut ctx) = started();
        fsm.deliver_interrupt(&mut ctx, Interrupt::EmergencyStop)
            .unwrap();
        for command in [
            ModeCommand::StartExploration,
            ModeCommand::StopExploration,
            ModeCommand::StartWaypointFollowing,
            ModeCommand::StopWaypointFollowing,
        ] {
            assert!(fsm.handle_command(&mut ctx, command).is_err());
        }
        assert_eq!(fsm.active(), Mode::EmergencyStop);
    }

    #[test]
    fn exhausted_waypoint_queue_returns_to_idle() {
        let (mut fsm, mut ctx) = started();
        ctx.waypoints.set_queue(vec![Pose::from_xy(1.0, 0.0)]);
        fsm.handle_command(&mut ctx, ModeCommand::StartWaypointFollowing)
            .unwrap();

        fsm.step(&mut ctx);
        ctx.record_goal_status(GoalStatusReport {
            goal: Pose::from_xy(1.0, 0.0),
            status: GoalStatus::Reached,
        });
        fsm.step(&mut ctx);
        fsm.step(&mut ctx);
        assert_eq!(fsm.active(), Mode::Idle);
    }

    #[derive(Debug, Clone, Copy)]
    enum Scripted {
        Request(Mode),
        Interrupt(Interrupt),
        ClearEmergencyStop,
        Resume(Interrupt),
        Command(ModeCommand),
        Tick,
    }

    fn apply(fsm: &mut StateInterface, ctx: &mut ControllerContext, event: Scripted) {
        match event {
            Scripted::Request(mode) => {
                let _ = fsm.request_transition(ctx, mode);
            }
            Scripted::Interrupt(interrupt) => {
                let _ = fsm.deliver_interrupt(ctx, interrupt);
            }
            Scripted::ClearEmergencyStop => ctx.emergency_stop_asserted = false,
            Scripted::Resume(interrupt) => {
                let _ = fsm.resume(ctx, interrupt);
            }
            Scripted::Command(command) => {
                let _ = fsm.handle_command(ctx, command);
            }
            Scripted::Tick => fsm.step(ctx),
        }
    }

    #[test]
    fn exactly_one_mode_after_every_event() {
        let (mut fsm, mut ctx) = started();
        ctx.waypoints.set_queue(vec![Pose::from_xy(1.0, 0.0)]);
        let mut active = fsm.active();

        let script = [
            Scripted::Request(Mode::Exploration),
            Scripted::Interrupt(Interrupt::TeleoperationInterrupt),
            Scripted::Request(Mode::Idle),
            Scripted::Interrupt(Interrupt::EmergencyStop),
            Scripted::Interrupt(Interrupt::TeleoperationInterrupt),
            Scripted::ClearEmergencyStop,
            Scripted::Resume(Interrupt::EmergencyStop),
            Scripted::Resume(Interrupt::TeleoperationInterrupt),
            Scripted::Command(ModeCommand::StartWaypointFollowing),
            Scripted::Tick,
            Scripted::Command(ModeCommand::StopWaypointFollowing),
        ];

        for event in script {
            apply(&mut fsm, &mut ctx, event);
            // Each announced change must start from the mode that was active.
            for (from, to) in mode_changes(&mut ctx) {
                assert_eq!(from, active, "after {event:?}");
                active = to;
            }
            assert_eq!(fsm.active(), active);
        }
        assert_eq!(fsm.active(), Mode::Idle);
    }
}
