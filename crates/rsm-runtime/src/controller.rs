//! [`MissionController`] – the mode core wired to the event bus.
//!
//! Every inbound event, service request and tick runs to completion against
//! the owned [`StateInterface`] and [`ControllerContext`], then
//! [`flush`][MissionController::flush] publishes whatever the mode hooks
//! emitted plus fresh goal snapshots when the arbiter changed.
//!
//! # Routing
//!
//! | Inbound payload | Effect |
//! |---|---|
//! | `FrontiersDetected` | `GoalArbiter::update_frontiers` |
//! | `GoalStatus` | recorded for the active mode to poll |
//! | `ExplorationModeChanged` | policy setter |
//! | `Interrupt` | preempt, clear, or resume |
//! | `AutonomyVelocity` | through the reverse bridge, autonomous modes only |
//! | `RelayGoalSubmitted` | answered `Succeeded` by the goal relay |

use std::fmt;

use rsm_additions::{Actuator, GoalRelay, ReverseMotionBridge, SensorPoseReset};
use rsm_core::{ControllerContext, GoalArbiter, Outgoing, StateInterface};
use rsm_middleware::{EventBus, Topic};
use rsm_types::{
    Event, EventPayload, ExplorationModePolicy, Interrupt, InterruptSignal, Mode, ModeCommand,
    Pose, RsmError, ServiceResponse, Twist,
};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::ControllerConfig;

/// `source` stamped on every event the controller publishes.
pub const SOURCE: &str = "rsm-runtime::controller";

// ────────────────────────────────────────────────────────────────────────────
// Service requests
// ────────────────────────────────────────────────────────────────────────────

/// Request/response operations. Each is answered with a [`ServiceResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequest {
    Command(ModeCommand),
    /// Leave whichever interrupt mode currently holds the controller.
    Resume,
    SetReverseMode(bool),
    ResetSensorPose,
    SetWaypoints(Vec<Pose>),
    SetExplorationMode(ExplorationModePolicy),
    Status,
}

/// Point-in-time summary for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerStatus {
    pub mode: Mode,
    pub suppressed_by: Option<Interrupt>,
    pub preempted: Vec<Mode>,
    pub emergency_stop_asserted: bool,
    pub reverse_mode: bool,
    pub exploration_mode: ExplorationModePolicy,
    pub current_goal: Option<Pose>,
    pub goal_obsolete: bool,
    pub exploration_goals: usize,
    pub failed_goals: usize,
    pub waypoints: usize,
    pub next_waypoint: usize,
    pub relayed_goals: u64,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode={}", self.mode)?;
        if let Some(interrupt) = self.suppressed_by {
            write!(f, " held_by={interrupt}")?;
        }
        if !self.preempted.is_empty() {
            let stack: Vec<&str> = self.preempted.iter().map(|m| m.name()).collect();
            write!(f, " preempted=[{}]", stack.join(","))?;
        }
        write!(
            f,
            " estop={} reverse={} policy={}",
            self.emergency_stop_asserted, self.reverse_mode, self.exploration_mode
        )?;
        match self.current_goal {
            Some(goal) => write!(
                f,
                " goal=({:.2},{:.2}){}",
                goal.position.x,
                goal.position.y,
                if self.goal_obsolete { " obsolete" } else { "" }
            )?,
            None => write!(f, " goal=none")?,
        }
        write!(
            f,
            " frontiers={} failed={} waypoints={}/{} relayed={}",
            self.exploration_goals,
            self.failed_goals,
            self.next_waypoint,
            self.waypoints,
            self.relayed_goals
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MissionController
// ────────────────────────────────────────────────────────────────────────────

pub struct MissionController {
    fsm: StateInterface,
    ctx: ControllerContext,
    bridge: ReverseMotionBridge,
    relay: GoalRelay,
    sensor: SensorPoseReset,
    bus: EventBus,
    published_revision: Option<u64>,
}

impl MissionController {
    /// Build the controller with the built-in mode table and start it in
    /// Idle. `sensor_joint` is the actuator the sensor reset drives.
    pub fn new(
        config: &ControllerConfig,
        bus: EventBus,
        sensor_joint: Box<dyn Actuator>,
    ) -> Result<Self, RsmError> {
        Self::with_state_interface(config, bus, sensor_joint, StateInterface::with_default_states())
    }

    /// Build around a caller-populated state interface; fails fast if a
    /// required mode is missing.
    pub fn with_state_interface(
        config: &ControllerConfig,
        bus: EventBus,
        sensor_joint: Box<dyn Actuator>,
        mut fsm: StateInterface,
    ) -> Result<Self, RsmError> {
        let arbiter = GoalArbiter::new(config.goal_tolerance, config.exploration_mode);
        let mut ctx = ControllerContext::new(arbiter);
        fsm.start(&mut ctx)?;

        let mut controller = Self {
            fsm,
            ctx,
            bridge: ReverseMotionBridge::with_reverse(config.reverse_mode),
            relay: GoalRelay::new(),
            sensor: SensorPoseReset::new(sensor_joint, config.sensor_home_position),
            bus,
            published_revision: None,
        };
        controller.flush();
        info!(
            tolerance = config.goal_tolerance,
            policy = %config.exploration_mode,
            reverse = config.reverse_mode,
            "mission controller ready"
        );
        Ok(controller)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn active_mode(&self) -> Mode {
        self.fsm.active()
    }

    pub fn context(&self) -> &ControllerContext {
        &self.ctx
    }

    pub fn status(&self) -> ControllerStatus {
        let arbiter = &self.ctx.arbiter;
        ControllerStatus {
            mode: self.fsm.active(),
            suppressed_by: self.fsm.suppressing_interrupt(),
            preempted: self.fsm.preempted_modes(),
            emergency_stop_asserted: self.ctx.emergency_stop_asserted,
            reverse_mode: self.bridge.is_reverse(),
            exploration_mode: arbiter.exploration_mode_policy(),
            current_goal: arbiter.current_goal(),
            goal_obsolete: arbiter.is_goal_obsolete(),
            exploration_goals: arbiter.exploration_goals().len(),
            failed_goals: arbiter.failed_goals().len(),
            waypoints: self.ctx.waypoints.queue.len(),
            next_waypoint: self.ctx.waypoints.next,
            relayed_goals: self.relay.relayed_count(),
        }
    }

    // ── inbound ─────────────────────────────────────────────────────────────

    /// Apply one bus event and publish the consequences.
    pub fn handle_event(&mut self, event: &Event) {
        match &event.payload {
            EventPayload::FrontiersDetected(frontiers) => {
                let update = self.ctx.arbiter.update_frontiers(frontiers);
                debug!(
                    goals = update.goal_count,
                    obsolete = update.obsolete_raised,
                    "frontier batch applied"
                );
            }
            EventPayload::GoalStatus(report) => {
                debug!(goal = ?report.goal.position, status = ?report.status, "goal status");
                self.ctx.record_goal_status(*report);
            }
            EventPayload::ExplorationModeChanged(policy) => {
                self.set_exploration_mode(*policy);
            }
            EventPayload::Interrupt(signal) => {
                match self.handle_interrupt_signal(*signal) {
                    Ok(message) => info!(?signal, %message, "interrupt signal handled"),
                    Err(e) => warn!(?signal, error = %e, "interrupt signal not applied"),
                }
            }
            EventPayload::AutonomyVelocity(velocity) => self.relay_velocity(*velocity),
            EventPayload::RelayGoalSubmitted { goal_id, target } => {
                let status = self.relay.on_goal_submitted(*goal_id, *target);
                self.publish(
                    Topic::Snapshots,
                    EventPayload::RelayGoalResult {
                        goal_id: *goal_id,
                        status,
                    },
                );
            }
            outbound => trace!(source = %event.source, ?outbound, "outbound payload ignored"),
        }
        self.flush();
    }

    /// Answer one request/response operation.
    pub fn handle_service(&mut self, request: ServiceRequest) -> ServiceResponse {
        let response = match request {
            ServiceRequest::Command(command) => {
                ServiceResponse::from(self.fsm.handle_command(&mut self.ctx, command))
            }
            ServiceRequest::Resume => ServiceResponse::from(self.resume()),
            ServiceRequest::SetReverseMode(enable) => self.bridge.set_reverse_mode(enable),
            ServiceRequest::ResetSensorPose => self.sensor.reset(),
            ServiceRequest::SetWaypoints(waypoints) => {
                ServiceResponse::from(self.set_waypoints(waypoints))
            }
            ServiceRequest::SetExplorationMode(policy) => {
                self.set_exploration_mode(policy);
                ServiceResponse::ok(format!("Exploration mode set to {policy}"))
            }
            ServiceRequest::Status => ServiceResponse::ok(self.status().to_string()),
        };
        if !response.success {
            debug!(message = %response.message, "service request rejected");
        }
        self.flush();
        response
    }

    /// One control-loop tick of the active mode.
    pub fn tick(&mut self) {
        self.fsm.step(&mut self.ctx);
        self.flush();
    }

    fn handle_interrupt_signal(&mut self, signal: InterruptSignal) -> Result<String, RsmError> {
        match signal {
            InterruptSignal::EmergencyStopAsserted => {
                self.fsm.deliver_interrupt(&mut self.ctx, Interrupt::EmergencyStop)
            }
            InterruptSignal::EmergencyStopCleared => {
                self.ctx.emergency_stop_asserted = false;
                Ok("Emergency stop cleared; resume to continue".to_string())
            }
            InterruptSignal::TeleoperationEngaged => self
                .fsm
                .deliver_interrupt(&mut self.ctx, Interrupt::TeleoperationInterrupt),
            // Released under an emergency stop, teleoperation is skipped when
            // the stop is resumed.
            InterruptSignal::TeleoperationDisengaged => self
                .fsm
                .release(&mut self.ctx, Interrupt::TeleoperationInterrupt),
        }
    }

    fn resume(&mut self) -> Result<String, RsmError> {
        let interrupt = self
            .fsm
            .suppressing_interrupt()
            .ok_or_else(|| RsmError::ResumeRejected("no interrupt is active".to_string()))?;
        let mode = self.fsm.resume(&mut self.ctx, interrupt)?;
        Ok(format!("Resumed {mode}"))
    }

    fn set_waypoints(&mut self, waypoints: Vec<Pose>) -> Result<String, RsmError> {
        let in_use = self.fsm.active() == Mode::WaypointFollowing
            || self.fsm.preempted_modes().contains(&Mode::WaypointFollowing);
        if in_use {
            return Err(RsmError::CommandRejected(
                "Stop waypoint following before replacing the queue".to_string(),
            ));
        }
        let count = waypoints.len();
        self.ctx.waypoints.set_queue(waypoints);
        info!(count, "waypoint queue replaced");
        Ok(format!("{count} waypoints set"))
    }

    fn set_exploration_mode(&mut self, policy: ExplorationModePolicy) {
        self.ctx.arbiter.set_exploration_mode_policy(policy);
        info!(%policy, "exploration mode policy changed");
    }

    /// Only an autonomous mode may drive through the executor's velocity
    /// stream; anything else is dropped.
    fn relay_velocity(&mut self, velocity: Twist) {
        if !self.fsm.active().is_autonomous() {
            trace!(mode = %self.fsm.active(), "autonomy velocity dropped");
            return;
        }
        let effective = self.bridge.on_autonomy_command(velocity);
        self.publish(Topic::DriveCommands, EventPayload::DriveVelocity(effective));
    }

    // ── outbound ────────────────────────────────────────────────────────────

    /// Publish the outbox, then the goal snapshots if they changed since the
    /// last publish.
    pub fn flush(&mut self) {
        for outgoing in self.ctx.drain_outgoing() {
            let (topic, payload) = match outgoing {
                Outgoing::Navigation(command) => {
                    (Topic::DriveCommands, EventPayload::Navigation(command))
                }
                Outgoing::Drive(twist) => (Topic::DriveCommands, EventPayload::DriveVelocity(twist)),
                Outgoing::ModeChanged { from, to } => {
                    (Topic::Snapshots, EventPayload::ModeChanged { from, to })
                }
            };
            self.publish(topic, payload);
        }

        let revision = self.ctx.arbiter.revision();
        if self.published_revision == Some(revision) {
            return;
        }
        let snapshot = self.ctx.arbiter.snapshot();
        self.publish(
            Topic::Snapshots,
            EventPayload::ExplorationGoals(snapshot.exploration_goals.to_vec()),
        );
        self.publish(
            Topic::Snapshots,
            EventPayload::FailedGoals(snapshot.failed_goals.to_vec()),
        );
        self.publish(Topic::Snapshots, EventPayload::GoalObsolete(snapshot.goal_obsolete));
        self.published_revision = Some(revision);
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        if let Err(e) = self.bus.publish_to(topic, Event::new(SOURCE, payload)) {
            warn!(?topic, error = %e, "publish failed");
        }
    }
}
