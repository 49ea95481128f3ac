//! [`ControllerContext`] – the shared state every mode hook operates on.
//!
//! Bundles the goal arbiter, the latest navigation feedback, per-mode
//! progress records, the emergency-stop latch, and an outbox. Hooks never
//! talk to the outside world directly: they push [`Outgoing`] commands which
//! the runtime drains and publishes after each event or tick.

use rsm_types::{GoalStatus, GoalStatusReport, Mode, NavigationCommand, Pose, Twist};
use tracing::debug;

use crate::goal_arbiter::GoalArbiter;

/// Something a hook wants sent once the current event has been processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outgoing {
    Navigation(NavigationCommand),
    Drive(Twist),
    ModeChanged { from: Mode, to: Mode },
}

// ────────────────────────────────────────────────────────────────────────────
// Per-mode progress
// ────────────────────────────────────────────────────────────────────────────

/// Poll-based sub-states of exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplorationPhase {
    /// Waiting for a frontier batch newer than `frontier_batch_seen`.
    #[default]
    AwaitingFrontiers,
    SelectingGoal,
    AwaitingGoalResult,
}

#[derive(Debug, Clone, Default)]
pub struct ExplorationProgress {
    pub phase: ExplorationPhase,
    /// Frontier batch count at the moment the last goal was reached.
    pub frontier_batch_seen: u64,
    pub goals_reached: u32,
}

/// Poll-based sub-states of waypoint following.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaypointPhase {
    #[default]
    Dispatching,
    AwaitingGoalResult,
    Paused,
}

#[derive(Debug, Clone, Default)]
pub struct WaypointProgress {
    pub queue: Vec<Pose>,
    /// Index of the waypoint being driven to.
    pub next: usize,
    pub phase: WaypointPhase,
    pub reached: u32,
    pub skipped: u32,
}

impl WaypointProgress {
    /// Replace the queue and rewind.
    pub fn set_queue(&mut self, queue: Vec<Pose>) {
        *self = Self {
            queue,
            ..Self::default()
        };
    }

    /// Rewind to the first waypoint, keeping the queue.
    pub fn rewind(&mut self) {
        self.next = 0;
        self.phase = WaypointPhase::Dispatching;
    }

    pub fn current(&self) -> Option<Pose> {
        self.queue.get(self.next).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ControllerContext
// ────────────────────────────────────────────────────────────────────────────

/// Process-scoped controller state, created once and passed by `&mut` to
/// every mode hook.
#[derive(Debug)]
pub struct ControllerContext {
    pub arbiter: GoalArbiter,
    pub exploration: ExplorationProgress,
    pub waypoints: WaypointProgress,
    /// Latched by `EmergencyStopAsserted`, lowered by `EmergencyStopCleared`.
    pub emergency_stop_asserted: bool,
    goal_status: Option<GoalStatusReport>,
    outbox: Vec<Outgoing>,
}

impl ControllerContext {
    pub fn new(arbiter: GoalArbiter) -> Self {
        Self {
            arbiter,
            exploration: ExplorationProgress::default(),
            waypoints: WaypointProgress::default(),
            emergency_stop_asserted: false,
            goal_status: None,
            outbox: Vec::new(),
        }
    }

    // ── navigation feedback ─────────────────────────────────────────────────

    /// Store the executor's latest status; a newer report replaces an
    /// unconsumed older one.
    pub fn record_goal_status(&mut self, report: GoalStatusReport) {
        self.goal_status = Some(report);
    }

    /// Discard any unconsumed status report.
    pub fn clear_goal_status(&mut self) {
        self.goal_status = None;
    }

    /// Consume the pending status if it refers to `goal` (within the arbiter
    /// tolerance). Reports for any other pose are stale and dropped.
    pub fn take_goal_status_for(&mut self, goal: &Pose) -> Option<GoalStatus> {
        let report = self.goal_status.take()?;
        if report.goal.distance_to(goal) <= self.arbiter.tolerance() {
            Some(report.status)
        } else {
            debug!(reported = ?report.goal.position, expected = ?goal.position, "stale goal status dropped");
            None
        }
    }

    // ── outbox ──────────────────────────────────────────────────────────────

    pub fn emit(&mut self, outgoing: Outgoing) {
        self.outbox.push(outgoing);
    }

    pub fn navigate_to(&mut self, goal: Pose) {
        self.emit(Outgoing::Navigation(NavigationCommand::NavigateTo(goal)));
    }

    pub fn cancel_navigation(&mut self) {
        self.emit(Outgoing::Navigation(NavigationCommand::CancelNavigation));
    }

    pub fn halt_motion(&mut self) {
        self.emit(Outgoing::Navigation(NavigationCommand::HaltMotion));
    }

    /// Take everything emitted since the last drain, in emission order.
    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }
}
