//! [`GoalArbiter`] – exploration goal bookkeeping.
//!
//! Each frontier batch from perception replaces the list of live exploration
//! goals with one pose per frontier (the frontier's nearest point, identity
//! orientation). Failed goals accumulate for the whole session. While the
//! policy is [`ExplorationModePolicy::InterruptOnVanish`] every update checks
//! whether the goal currently being navigated is still among the live goals
//! and latches the obsolete flag when it is not.
//!
//! Lists are held as `Arc<[Pose]>` and replaced, never edited in place, so a
//! snapshot taken before an update keeps showing the old list in full.
//!
//! # Example
//!
//! ```
//! use rsm_core::goal_arbiter::GoalArbiter;
//! use rsm_types::{ExplorationModePolicy, Frontier, Point, Pose};
//!
//! let mut arbiter = GoalArbiter::new(0.5, ExplorationModePolicy::InterruptOnVanish);
//! arbiter.set_current_goal(Some(Pose::from_xy(2.0, 0.0)));
//!
//! let update = arbiter.update_frontiers(&[]);
//! assert!(update.obsolete_raised);
//! assert!(arbiter.is_goal_obsolete());
//! ```

use std::sync::Arc;

use rsm_types::{ExplorationModePolicy, Frontier, Pose};
use tracing::{debug, info};

/// Result of a single [`GoalArbiter::update_frontiers`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierUpdate {
    /// Number of exploration goals now live.
    pub goal_count: usize,
    /// `true` when this update made the current goal obsolete.
    pub obsolete_raised: bool,
}

/// Point-in-time view of everything the arbiter publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalSnapshot {
    pub exploration_goals: Arc<[Pose]>,
    pub failed_goals: Arc<[Pose]>,
    pub goal_obsolete: bool,
}

/// Owns the exploration goal lists and decides whether the in-flight goal
/// is still worth pursuing.
#[derive(Debug, Clone)]
pub struct GoalArbiter {
    exploration_goals: Arc<[Pose]>,
    failed_goals: Arc<[Pose]>,
    current_goal: Option<Pose>,
    goal_obsolete: bool,
    policy: ExplorationModePolicy,
    tolerance: f64,
    frontier_batches: u64,
    revision: u64,
}

impl GoalArbiter {
    /// Create an arbiter with no goals. `tolerance` is the Euclidean radius
    /// (metres) within which two poses are treated as the same goal.
    pub fn new(tolerance: f64, policy: ExplorationModePolicy) -> Self {
        Self {
            exploration_goals: Arc::from(Vec::new()),
            failed_goals: Arc::from(Vec::new()),
            current_goal: None,
            goal_obsolete: false,
            policy,
            tolerance,
            frontier_batches: 0,
            revision: 0,
        }
    }

    /// Replace the exploration goals with one pose per frontier and
    /// re-evaluate the current goal.
    ///
    /// Frontiers are stored as given; duplicates are not merged.
    pub fn update_frontiers(&mut self, frontiers: &[Frontier]) -> FrontierUpdate {
        let goals: Vec<Pose> = frontiers.iter().map(|f| Pose::at(f.nearest)).collect();
        self.exploration_goals = Arc::from(goals);
        self.frontier_batches += 1;
        self.revision += 1;

        let mut obsolete_raised = false;
        if self.policy == ExplorationModePolicy::InterruptOnVanish
            && !self.goal_obsolete
            && let Some(goal) = self.current_goal
            && !self.is_current_goal_live(&goal, self.tolerance)
        {
            self.goal_obsolete = true;
            obsolete_raised = true;
            info!(goal = ?goal.position, "current goal vanished from frontiers, marked obsolete");
        }

        debug!(
            goals = self.exploration_goals.len(),
            batch = self.frontier_batches,
            "frontier batch applied"
        );
        FrontierUpdate {
            goal_count: self.exploration_goals.len(),
            obsolete_raised,
        }
    }

    /// `true` iff some live exploration goal lies within `tolerance` of
    /// `pose`. Any match counts; the first one found wins.
    pub fn is_current_goal_live(&self, pose: &Pose, tolerance: f64) -> bool {
        self.exploration_goals
            .iter()
            .any(|goal| goal.distance_to(pose) <= tolerance)
    }

    /// Record a goal the navigation executor failed to reach. The pose stays
    /// in the exploration goals if perception still reports it.
    pub fn report_failed(&mut self, pose: Pose) {
        let mut failed = self.failed_goals.to_vec();
        failed.push(pose);
        self.failed_goals = Arc::from(failed);
        self.revision += 1;
        info!(goal = ?pose.position, total = self.failed_goals.len(), "goal recorded as failed");
    }

    /// Takes effect on the next [`update_frontiers`][Self::update_frontiers].
    pub fn set_exploration_mode_policy(&mut self, policy: ExplorationModePolicy) {
        self.policy = policy;
    }

    pub fn exploration_mode_policy(&self) -> ExplorationModePolicy {
        self.policy
    }

    /// Set (or clear) the goal being navigated. Always resets the obsolete
    /// flag.
    pub fn set_current_goal(&mut self, goal: Option<Pose>) {
        if self.goal_obsolete {
            self.revision += 1;
        }
        self.current_goal = goal;
        self.goal_obsolete = false;
    }

    pub fn current_goal(&self) -> Option<Pose> {
        self.current_goal
    }

    pub fn is_goal_obsolete(&self) -> bool {
        self.goal_obsolete
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// `true` once at least one frontier batch has arrived.
    pub fn has_frontiers(&self) -> bool {
        self.frontier_batches > 0
    }

    /// Number of frontier batches applied so far.
    pub fn frontier_batches(&self) -> u64 {
        self.frontier_batches
    }

    /// Monotonic counter bumped whenever a published value changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The first live goal (in detection order) that is not within
    /// tolerance of a previously failed goal.
    pub fn next_candidate(&self) -> Option<Pose> {
        self.exploration_goals
            .iter()
            .find(|goal| {
                !self
                    .failed_goals
                    .iter()
                    .any(|failed| failed.distance_to(goal) <= self.tolerance)
            })
            .copied()
    }

    pub fn exploration_goals(&self) -> Arc<[Pose]> {
        Arc::clone(&self.exploration_goals)
    }

    pub fn failed_goals(&self) -> Arc<[Pose]> {
        Arc::clone(&self.failed_goals)
    }

    pub fn snapshot(&self) -> GoalSnapshot {
        GoalSnapshot {
            exploration_goals: self.exploration_goals(),
            failed_goals: self.failed_goals(),
            goal_obsolete: self.goal_obsolete,
        }
    }
}
