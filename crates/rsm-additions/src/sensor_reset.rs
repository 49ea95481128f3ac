//! [`SensorPoseReset`] – recovery trigger for the auxiliary sensor joint.

use rsm_types::{RsmError, ServiceResponse};
use tracing::{info, warn};

use crate::actuator::Actuator;

/// Drives one joint back to a fixed home position on request.
pub struct SensorPoseReset {
    joint: Box<dyn Actuator>,
    home_rad: f64,
}

impl SensorPoseReset {
    pub fn new(joint: Box<dyn Actuator>, home_rad: f64) -> Self {
        Self { joint, home_rad }
    }

    pub fn joint_id(&self) -> &str {
        self.joint.id()
    }

    pub fn position(&self) -> f64 {
        self.joint.position()
    }

    /// Command the joint home. A driver fault is reported in the response.
    pub fn reset(&mut self) -> ServiceResponse {
        let result: Result<String, RsmError> = self
            .joint
            .set_position(self.home_rad)
            .map(|()| format!("{} returned to {:.3} rad", self.joint.id(), self.home_rad));
        match &result {
            Ok(_) => info!(joint = self.joint.id(), home = self.home_rad, "sensor pose reset"),
            Err(e) => warn!(joint = self.joint.id(), error = %e, "sensor pose reset failed"),
        }
        ServiceResponse::from(result)
    }
}
