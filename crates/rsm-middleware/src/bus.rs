//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Perception`] | Frontier marker batches |
//! | [`Topic::NavigationFeedback`] | Goal status, raw executor velocity, relayed goal submissions |
//! | [`Topic::Operator`] | Exploration-mode policy changes |
//! | [`Topic::SystemAlerts`] | Emergency stop and teleoperation signals |
//! | [`Topic::DriveCommands`] | Effective drive velocity and navigation commands |
//! | [`Topic::Snapshots`] | Goal lists, obsolete flag, mode changes, relay results |

use rsm_types::{Event, RsmError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// All first-class routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Frontier batches from the exploration/perception pipeline.
    Perception,
    /// Status and velocity output of the navigation executor.
    NavigationFeedback,
    /// Operator-side configuration changes.
    Operator,
    /// Safety-critical preemption signals.
    SystemAlerts,
    /// Everything the controller sends towards the drive base and executor.
    DriveCommands,
    /// Full-replace state snapshots for visualisation and diagnostics.
    Snapshots,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    perception: broadcast::Sender<Event>,
    navigation_feedback: broadcast::Sender<Event>,
    operator: broadcast::Sender<Event>,
    system_alerts: broadcast::Sender<Event>,
    drive_commands: broadcast::Sender<Event>,
    snapshots: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently. A
    /// zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (perception, _) = broadcast::channel(capacity);
        let (navigation_feedback, _) = broadcast::channel(capacity);
        let (operator, _) = broadcast::channel(capacity);
        let (system_alerts, _) = broadcast::channel(capacity);
        let (drive_commands, _) = broadcast::channel(capacity);
        let (snapshots, _) = broadcast::channel(capacity);
        Self {
            perception,
            navigation_feedback,
            operator,
            system_alerts,
            drive_commands,
            snapshots,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    /// Returns `Ok(0)` when nobody is listening on the topic; that is a
    /// normal condition for snapshot traffic.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, RsmError> {
        let sender = self.topic_sender(topic);
        if sender.receiver_count() == 0 {
            return Ok(0);
        }
        sender
            .send(event)
            .map_err(|e| RsmError::Channel(format!("send on {topic:?} failed: {e}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Perception => &self.perception,
            Topic::NavigationFeedback => &self.navigation_feedback,
            Topic::Operator => &self.operator,
            Topic::SystemAlerts => &self.system_alerts,
            Topic::DriveCommands => &self.drive_commands,
            Topic::Snapshots => &self.snapshots,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Lagged receivers skip the dropped events with a warning and keep
    /// reading; `None` means the bus has shut down.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`][Self::recv]. Returns `None` when the
    /// channel is currently empty or closed.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}
