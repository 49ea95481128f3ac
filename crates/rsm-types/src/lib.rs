use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Modes and interrupts
// ────────────────────────────────────────────────────────────────────────────

/// Mutually exclusive autonomy behaviours. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Waiting for operator input; nothing drives the robot.
    #[default]
    Idle,
    /// Frontier-based autonomous exploration.
    Exploration,
    /// Following an operator-supplied waypoint queue.
    WaypointFollowing,
    /// Manual control by a human operator.
    Teleoperation,
    /// All motion halted until an operator resumes.
    EmergencyStop,
}

impl Mode {
    /// Every mode, in declaration order.
    pub const ALL: [Mode; 5] = [
        Mode::Idle,
        Mode::Exploration,
        Mode::WaypointFollowing,
        Mode::Teleoperation,
        Mode::EmergencyStop,
    ];

    /// `true` for the modes that drive the navigation executor on their own.
    pub fn is_autonomous(self) -> bool {
        matches!(self, Mode::Exploration | Mode::WaypointFollowing)
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Idle => "Idle",
            Mode::Exploration => "Exploration",
            Mode::WaypointFollowing => "WaypointFollowing",
            Mode::Teleoperation => "Teleoperation",
            Mode::EmergencyStop => "EmergencyStop",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Process-wide preemption signals. Delivered to whichever mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interrupt {
    EmergencyStop,
    TeleoperationInterrupt,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::EmergencyStop => f.write_str("EmergencyStop"),
            Interrupt::TeleoperationInterrupt => f.write_str("TeleoperationInterrupt"),
        }
    }
}

/// Raw operator/safety signals as they arrive from the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptSignal {
    EmergencyStopAsserted,
    EmergencyStopCleared,
    TeleoperationEngaged,
    TeleoperationDisengaged,
}

/// Operator mode-change commands. Each one is answered with a
/// [`ServiceResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeCommand {
    StartExploration,
    StopExploration,
    StartWaypointFollowing,
    StopWaypointFollowing,
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// A position in the map frame (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Orientation as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position plus orientation. Goals have no ID; identity is proximity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

impl Pose {
    /// A pose at `position` with identity orientation.
    pub fn at(position: Point) -> Self {
        Self {
            position,
            orientation: Quaternion::IDENTITY,
        }
    }

    /// Planar shorthand for [`Pose::at`].
    pub fn from_xy(x: f64, y: f64) -> Self {
        Self::at(Point::new(x, y, 0.0))
    }

    /// Euclidean distance between the two positions; orientation is ignored.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        self.position.distance_to(&other.position)
    }
}

/// A detected frontier region: the clustered boundary points and the
/// representative point nearest to the robot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frontier {
    pub cluster: Vec<Point>,
    pub nearest: Point,
}

/// Differential drive velocity command.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    /// Forward velocity in m/s.
    pub linear: f64,
    /// Yaw rate in rad/s.
    pub angular: f64,
}

impl Twist {
    pub fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Goals and navigation
// ────────────────────────────────────────────────────────────────────────────

/// Whether an in-flight exploration goal is finished when its frontier
/// disappears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationModePolicy {
    /// Finish navigating even if the frontier vanished.
    #[default]
    CompleteGoal,
    /// Abort as soon as the goal is no longer a live frontier.
    InterruptOnVanish,
}

impl ExplorationModePolicy {
    /// Map the boolean wire flag (`false` = complete, `true` = interrupt).
    pub fn from_flag(interrupt: bool) -> Self {
        if interrupt {
            Self::InterruptOnVanish
        } else {
            Self::CompleteGoal
        }
    }
}

impl fmt::Display for ExplorationModePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompleteGoal => f.write_str("complete_goal"),
            Self::InterruptOnVanish => f.write_str("interrupt_on_vanish"),
        }
    }
}

/// Status reported by the navigation executor for the goal it is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    InProgress,
    Reached,
    Failed,
    Obsolete,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalStatusReport {
    pub goal: Pose,
    pub status: GoalStatus,
}

/// Instructions for the external navigation executor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "goal")]
pub enum NavigationCommand {
    /// Start driving towards the pose.
    NavigateTo(Pose),
    /// Abandon the current goal.
    CancelNavigation,
    /// Stop moving but keep the goal; a later `NavigateTo` resumes it.
    HaltMotion,
}

/// Status answered to an external goal-submission client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayStatus {
    Pending,
    Active,
    Succeeded,
    Aborted,
}

// ────────────────────────────────────────────────────────────────────────────
// Service replies
// ────────────────────────────────────────────────────────────────────────────

/// `(success, message)` reply returned by every request/response operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    pub message: String,
}

impl ServiceResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Result<String, RsmError>> for ServiceResponse {
    fn from(result: Result<String, RsmError>) -> Self {
        match result {
            Ok(message) => Self::ok(message),
            Err(e) => Self::rejected(e.to_string()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Bus events
// ────────────────────────────────────────────────────────────────────────────

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "rsm-runtime::controller"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh ID and the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // inbound
    FrontiersDetected(Vec<Frontier>),
    GoalStatus(GoalStatusReport),
    ExplorationModeChanged(ExplorationModePolicy),
    Interrupt(InterruptSignal),
    AutonomyVelocity(Twist),
    RelayGoalSubmitted { goal_id: Uuid, target: Pose },

    // outbound
    DriveVelocity(Twist),
    Navigation(NavigationCommand),
    ModeChanged { from: Mode, to: Mode },
    ExplorationGoals(Vec<Pose>),
    FailedGoals(Vec<Pose>),
    GoalObsolete(bool),
    RelayGoalResult { goal_id: Uuid, status: RelayStatus },
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared by every crate in the workspace.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RsmError {
    #[error("Mode {0} registered twice")]
    DuplicateMode(Mode),

    #[error("Mode {0} was never registered")]
    UnregisteredMode(Mode),

    #[error("Transition {from} -> {to} rejected: {reason}")]
    TransitionRejected { from: Mode, to: Mode, reason: String },

    #[error("Interrupt {interrupt} ignored while {active} is active")]
    InterruptIgnored { interrupt: Interrupt, active: Mode },

    #[error("Resume rejected: {0}")]
    ResumeRejected(String),

    #[error("{0}")]
    CommandRejected(String),

    #[error("Hardware Fault on {component}: {details}")]
    Hardware { component: String, details: String },

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}
