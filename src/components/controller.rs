use serde::{Deserialize, Serialize};

/// Driver control state, sent from the driving client to the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ControllerInput {
    /// Throttle in [0, 1]
    pub throttle: f32,
    /// Brake in [0, 1]
    pub brake: f32,
    /// Steering in [-1, 1], positive turns right
    pub steering: f32,
}

impl ControllerInput {
    pub fn new(throttle: f32, brake: f32, steering: f32) -> Self {
        Self {
            throttle,
            brake,
            steering,
        }
        .clamped()
    }

    /// Input with every axis clamped to its range; NaN becomes zero.
    pub fn clamped(self) -> Self {
        fn clamp(value: f32, min: f32, max: f32) -> f32 {
            if value.is_nan() {
                0.0
            } else {
                value.clamp(min, max)
            }
        }

        Self {
            throttle: clamp(self.throttle, 0.0, 1.0),
            brake: clamp(self.brake, 0.0, 1.0),
            steering: clamp(self.steering, -1.0, 1.0),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.throttle == 0.0 && self.brake == 0.0 && self.steering == 0.0
    }
}
