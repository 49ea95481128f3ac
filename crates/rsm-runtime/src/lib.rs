//! `rsm-runtime` – Mission controller wiring and control loop
//!
//! Connects the mode core to the outside world. Inbound bus traffic and
//! service calls are applied to one [`MissionController`], whose outbox is
//! published back onto the bus after every event and tick.
//!
//! # Modules
//!
//! - [`controller`] – [`MissionController`][controller::MissionController]:
//!   owns the [`StateInterface`][rsm_core::StateInterface], the
//!   [`ControllerContext`][rsm_core::ControllerContext] and the side services
//!   from `rsm-additions`; translates events and
//!   [`ServiceRequest`][controller::ServiceRequest]s into calls on them.
//! - [`control_loop`] – [`run_control_loop`][control_loop::run_control_loop]:
//!   the single-task async loop. Safety alerts are always served first, then
//!   service calls, then sensor feedback, then the periodic tick.
//!   [`ControllerHandle`][control_loop::ControllerHandle] is the client side.
//! - [`config`] – [`ControllerConfig`][config::ControllerConfig]: the
//!   in-process settings bundle.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP export.

pub mod config;
pub mod control_loop;
pub mod controller;
pub mod telemetry;

pub use config::ControllerConfig;
pub use control_loop::{ControllerHandle, ServiceCall, run_control_loop, spawn_control_loop};
pub use controller::{ControllerStatus, MissionController, ServiceRequest};
pub use telemetry::{TracerProviderGuard, init_tracing};
