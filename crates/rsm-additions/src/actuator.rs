//! `Actuator` trait for position-controlled joints.
//!
//! The sensor reset service only ever talks to this trait, so a real joint
//! driver can replace [`SimActuator`] without touching the controller.

use rsm_types::RsmError;

/// A position-controlled joint (pan/tilt head, sensor mast, …).
pub trait Actuator: Send + Sync {
    /// Stable identifier, e.g. `"sensor_tilt"`.
    fn id(&self) -> &str;

    /// Command the joint to `target_rad` radians from its zero position.
    ///
    /// # Errors
    ///
    /// Returns [`RsmError::Hardware`] if the command cannot be applied.
    fn set_position(&mut self, target_rad: f64) -> Result<(), RsmError>;

    /// Most recently known position in radians.
    fn position(&self) -> f64;
}

/// In-process joint that records the last commanded position. Always
/// succeeds; used when no hardware driver is configured.
#[derive(Debug)]
pub struct SimActuator {
    id: String,
    position: f64,
}

impl SimActuator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: 0.0,
        }
    }

    /// Start at `position` instead of zero.
    pub fn at(id: impl Into<String>, position: f64) -> Self {
        Self {
            id: id.into(),
            position,
        }
    }
}

impl Actuator for SimActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_position(&mut self, target_rad: f64) -> Result<(), RsmError> {
        self.position = target_rad;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.position
    }
}
