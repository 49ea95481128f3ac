//! [`ReverseMotionBridge`] – sign flip on the autonomy velocity stream.

use rsm_types::{ServiceResponse, Twist};
use tracing::info;

/// Sits between the navigation executor's raw velocity output and the drive
/// base. With reverse driving enabled the linear component is negated and the
/// angular component passes through untouched.
///
/// # Example
///
/// ```
/// use rsm_additions::ReverseMotionBridge;
/// use rsm_types::Twist;
///
/// let mut bridge = ReverseMotionBridge::new();
/// bridge.set_reverse_mode(true);
/// assert_eq!(bridge.on_autonomy_command(Twist::new(1.0, 0.3)), Twist::new(-1.0, 0.3));
/// ```
#[derive(Debug, Default)]
pub struct ReverseMotionBridge {
    reverse: bool,
}

impl ReverseMotionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reverse(reverse: bool) -> Self {
        Self { reverse }
    }

    /// Toggle reverse driving. Always succeeds.
    pub fn set_reverse_mode(&mut self, enable: bool) -> ServiceResponse {
        self.reverse = enable;
        info!(reverse = enable, "reverse driving toggled");
        if enable {
            ServiceResponse::ok("Reverse driving enabled")
        } else {
            ServiceResponse::ok("Reverse driving disabled")
        }
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Map a raw autonomy command to the effective drive command.
    pub fn on_autonomy_command(&self, velocity: Twist) -> Twist {
        if self.reverse {
            Twist {
                linear: -velocity.linear,
                angular: velocity.angular,
            }
        } else {
            velocity
        }
    }
}
