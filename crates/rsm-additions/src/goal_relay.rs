//! [`GoalRelay`] – instant acknowledgement for an external exploration client.
//!
//! The client expects to hand a goal to a navigation executor and wait for it
//! to finish. Real navigation for that goal already runs through the
//! exploration mode, so the relay answers `Succeeded` straight away and does
//! no navigation of its own.

use chrono::{DateTime, Utc};
use rsm_types::{Pose, RelayStatus};
use tracing::debug;
use uuid::Uuid;

/// The most recent goal the relay acknowledged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelayedGoal {
    pub goal_id: Uuid,
    pub target: Pose,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct GoalRelay {
    relayed: u64,
    last: Option<RelayedGoal>,
}

impl GoalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledge a goal submitted under the client's own `goal_id`.
    pub fn on_goal_submitted(&mut self, goal_id: Uuid, target: Pose) -> RelayStatus {
        self.relayed += 1;
        self.last = Some(RelayedGoal {
            goal_id,
            target,
            received_at: Utc::now(),
        });
        debug!(%goal_id, goal = ?target.position, "relayed goal acknowledged");
        RelayStatus::Succeeded
    }

    /// Acknowledge a goal that arrived without an ID; one is assigned.
    pub fn submit(&mut self, target: Pose) -> (Uuid, RelayStatus) {
        let goal_id = Uuid::new_v4();
        (goal_id, self.on_goal_submitted(goal_id, target))
    }

    pub fn relayed_count(&self) -> u64 {
        self.relayed
    }

    pub fn last_goal(&self) -> Option<&RelayedGoal> {
        self.last.as_ref()
    }
}
