//! `rsm-middleware` – message plumbing
//!
//! Routes asynchronous traffic between perception, the navigation executor,
//! operators, and the mission controller without caring about its meaning.
//!
//! # Modules
//!
//! - [`bus`] – Headless, topic-partitioned publish/subscribe event bus built
//!   on Tokio broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
