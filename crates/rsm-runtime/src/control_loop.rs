//! The single-task control loop.
//!
//! All controller state lives inside one Tokio task, so every event handler
//! runs to completion before the next one starts and no locks are needed.
//! Inputs are drained in a fixed priority order on every wake-up:
//!
//! 1. `SystemAlerts` (emergency stop, teleoperation): always first, so an
//!    interrupt that arrives alongside a transition request wins.
//! 2. Service calls from [`ControllerHandle`]s.
//! 3. Perception, navigation feedback and operator topics.
//! 4. The periodic tick.
//!
//! The loop exits when the shutdown flag is set or every handle is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rsm_middleware::Topic;
use rsm_types::{ExplorationModePolicy, ModeCommand, Pose, RsmError, ServiceResponse};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::controller::{MissionController, ServiceRequest};

/// Pending service calls buffered before callers start waiting.
const REQUEST_QUEUE_DEPTH: usize = 32;

/// A service request paired with its reply slot.
#[derive(Debug)]
pub struct ServiceCall {
    pub request: ServiceRequest,
    pub reply: oneshot::Sender<ServiceResponse>,
}

/// Async client for the controller's request/response operations.
/// Clone freely; the loop stops once every clone is gone.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    requests: mpsc::Sender<ServiceCall>,
}

impl ControllerHandle {
    /// Create a handle and the receiving end to pass to
    /// [`run_control_loop`].
    pub fn channel() -> (Self, mpsc::Receiver<ServiceCall>) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        (Self { requests: tx }, rx)
    }

    pub async fn call(&self, request: ServiceRequest) -> Result<ServiceResponse, RsmError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(ServiceCall { request, reply })
            .await
            .map_err(|_| RsmError::Channel("control loop is not running".to_string()))?;
        response
            .await
            .map_err(|_| RsmError::Channel("control loop dropped the request".to_string()))
    }

    pub async fn command(&self, command: ModeCommand) -> Result<ServiceResponse, RsmError> {
        self.call(ServiceRequest::Command(command)).await
    }

    pub async fn resume(&self) -> Result<ServiceResponse, RsmError> {
        self.call(ServiceRequest::Resume).await
    }

    pub async fn set_reverse_mode(&self, enable: bool) -> Result<ServiceResponse, RsmError> {
        self.call(ServiceRequest::SetReverseMode(enable)).await
    }

    pub async fn reset_sensor_pose(&self) -> Result<ServiceResponse, RsmError> {
        self.call(ServiceRequest::ResetSensorPose).await
    }

    pub async fn set_waypoints(&self, waypoints: Vec<Pose>) -> Result<ServiceResponse, RsmError> {
        self.call(ServiceRequest::SetWaypoints(waypoints)).await
    }

    pub async fn set_exploration_mode(
        &self,
        policy: ExplorationModePolicy,
    ) -> Result<ServiceResponse, RsmError> {
        self.call(ServiceRequest::SetExplorationMode(policy)).await
    }

    pub async fn status(&self) -> Result<ServiceResponse, RsmError> {
        self.call(ServiceRequest::Status).await
    }
}

/// Drive `controller` until shutdown. Returns the controller so callers can
/// inspect its final state.
pub async fn run_control_loop(
    mut controller: MissionController,
    mut requests: mpsc::Receiver<ServiceCall>,
    tick_period: Duration,
    shutdown: Arc<AtomicBool>,
) -> MissionController {
    let bus = controller.bus().clone();
    let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
    let mut perception = bus.subscribe_to(Topic::Perception);
    let mut feedback = bus.subscribe_to(Topic::NavigationFeedback);
    let mut operator = bus.subscribe_to(Topic::Operator);

    let mut ticker = tokio::time::interval(tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(period_ms = tick_period.as_millis() as u64, "control loop running");

    while !shutdown.load(Ordering::SeqCst) {
        tokio::select! {
            biased;

            Some(event) = alerts.recv() => controller.handle_event(&event),

            call = requests.recv() => {
                let Some(ServiceCall { request, reply }) = call else {
                    debug!("all controller handles dropped");
                    break;
                };
                let response = controller.handle_service(request);
                // The caller may have given up waiting; nothing to do then.
                let _ = reply.send(response);
            }

            Some(event) = perception.recv() => controller.handle_event(&event),
            Some(event) = feedback.recv() => controller.handle_event(&event),
            Some(event) = operator.recv() => controller.handle_event(&event),

            _ = ticker.tick() => controller.tick(),
        }
    }

    info!(mode = %controller.active_mode(), "control loop stopped");
    controller
}

/// Spawn [`run_control_loop`] on the current Tokio runtime.
pub fn spawn_control_loop(
    controller: MissionController,
    tick_period: Duration,
    shutdown: Arc<AtomicBool>,
) -> (ControllerHandle, JoinHandle<MissionController>) {
    let (handle, requests) = ControllerHandle::channel();
    let task = tokio::spawn(run_control_loop(controller, requests, tick_period, shutdown));
    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use rsm_additions::SimActuator;
    use rsm_middleware::EventBus;
    use rsm_types::{Event, EventPayload, InterruptSignal, Mode};

    fn controller(bus: EventBus) -> MissionController {
        MissionController::new(
            &ControllerConfig::default(),
            bus,
            Box::new(SimActuator::new("sensor_tilt")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn service_calls_are_answered() {
        let bus = EventBus::default();
        let shutdown = Arc::new(AtomicBool::new(false));
        let (handle, task) = spawn_control_loop(
            controller(bus),
            Duration::from_millis(5),
            Arc::clone(&shutdown),
        );

        let started = handle.command(ModeCommand::StartExploration).await.unwrap();
        assert!(started.success);
        let again = handle.command(ModeCommand::StartExploration).await.unwrap();
        assert!(!again.success);
        assert_eq!(again.message, "Exploration is already running");

        drop(handle);
        let controller = task.await.unwrap();
        assert_eq!(controller.active_mode(), Mode::Exploration);
    }

    #[tokio::test]
    async fn alert_on_bus_preempts_running_mode() {
        let bus = EventBus::default();
        let shutdown = Arc::new(AtomicBool::new(false));
        let (handle, task) = spawn_control_loop(
            controller(bus.clone()),
            Duration::from_millis(5),
            Arc::clone(&shutdown),
        );

        handle.command(ModeCommand::StartExploration).await.unwrap();
        bus.publish_to(
            Topic::SystemAlerts,
            Event::new("test", EventPayload::Interrupt(InterruptSignal::EmergencyStopAsserted)),
        )
        .unwrap();

        // Alerts are served before the next request.
        let status = handle.status().await.unwrap();
        assert!(status.message.starts_with("mode=EmergencyStop"), "{}", status.message);

        let refused = handle.command(ModeCommand::StopExploration).await.unwrap();
        assert!(!refused.success);

        shutdown.store(true, Ordering::SeqCst);
        let controller = task.await.unwrap();
        assert_eq!(controller.active_mode(), Mode::EmergencyStop);
    }

    #[tokio::test]
    async fn calls_after_shutdown_report_channel_error() {
        let shutdown = Arc::new(AtomicBool::new(true));
        let (handle, task) = spawn_control_loop(
            controller(EventBus::default()),
            Duration::from_millis(5),
            shutdown,
        );
        task.await.unwrap();
        assert!(matches!(handle.status().await, Err(RsmError::Channel(_))));
    }
}
