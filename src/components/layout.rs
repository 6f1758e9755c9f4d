use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::resources::ConfigError;

/// Declarative description of a vehicle's wheels, seats and doors.
///
/// Axles and wheels are built from the layout once when the vehicle is
/// constructed and never resized afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VehicleLayout {
    #[serde(default)]
    pub axles: Vec<AxleLayout>,
    /// Seat names in seat-index order; seat 0 is the driver
    #[serde(default)]
    pub seats: Vec<String>,
    /// Doors that must be closed before the vehicle can lock
    #[serde(default)]
    pub doors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxleLayout {
    pub name: String,
    pub wheels: Vec<WheelLayout>,
    /// Steering lock at full input [rad], zero for a fixed axle
    #[serde(default)]
    pub max_steering_angle: f64,
    /// Drive force at full throttle, shared across the axle's wheels [N]
    #[serde(default)]
    pub max_drive_force: f64,
    /// Brake force at full brake, shared across the axle's wheels [N]
    #[serde(default)]
    pub max_brake_force: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelLayout {
    pub name: String,
    /// Contact point relative to the body origin [m]
    pub position: Vector3<f64>,
    /// Tire radius [m]
    pub radius: f64,
}

impl AxleLayout {
    /// Single centred wheel, named `Center`.
    pub fn single(name: impl Into<String>, position: Vector3<f64>, radius: f64) -> Self {
        Self {
            name: name.into(),
            wheels: vec![WheelLayout {
                name: "Center".to_string(),
                position,
                radius,
            }],
            max_steering_angle: 0.0,
            max_drive_force: 0.0,
            max_brake_force: 0.0,
        }
    }

    /// Left/right wheel pair at `±track_half_width` along the body x axis.
    pub fn pair(
        name: impl Into<String>,
        track_half_width: f64,
        height: f64,
        offset: f64,
        radius: f64,
    ) -> Self {
        Self {
            name: name.into(),
            wheels: vec![
                WheelLayout {
                    name: "Left".to_string(),
                    position: Vector3::new(-track_half_width, height, offset),
                    radius,
                },
                WheelLayout {
                    name: "Right".to_string(),
                    position: Vector3::new(track_half_width, height, offset),
                    radius,
                },
            ],
            max_steering_angle: 0.0,
            max_drive_force: 0.0,
            max_brake_force: 0.0,
        }
    }

    pub fn steering(mut self, max_angle: f64) -> Self {
        self.max_steering_angle = max_angle;
        self
    }

    pub fn drive(mut self, max_force: f64) -> Self {
        self.max_drive_force = max_force;
        self
    }

    pub fn brakes(mut self, max_force: f64) -> Self {
        self.max_brake_force = max_force;
        self
    }
}

impl VehicleLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_axle(mut self, axle: AxleLayout) -> Self {
        self.axles.push(axle);
        self
    }

    pub fn with_seats<I, S>(mut self, seats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seats = seats.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_doors<I, S>(mut self, doors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doors = doors.into_iter().map(Into::into).collect();
        self
    }

    /// Two-axle car: steered front, driven and braked rear, four seats.
    pub fn sedan() -> Self {
        Self::new()
            .with_axle(
                AxleLayout::pair("Front", 0.8, -0.4, 1.4, 0.35)
                    .steering(0.6)
                    .brakes(4_000.0),
            )
            .with_axle(
                AxleLayout::pair("Rear", 0.8, -0.4, -1.3, 0.35)
                    .drive(6_000.0)
                    .brakes(3_000.0),
            )
            .with_seats(["Driver", "CoDriver", "RearLeft", "RearRight"])
            .with_doors(["DriverDoor", "CoDriverDoor", "RearLeftDoor", "RearRightDoor"])
    }

    pub fn wheel_count(&self) -> usize {
        self.axles.iter().map(|axle| axle.wheels.len()).sum()
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let layout: Self = serde_yaml::from_str(source)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for axle in &self.axles {
            if axle.wheels.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "axle '{}' has no wheels",
                    axle.name
                )));
            }
            for wheel in &axle.wheels {
                if !(wheel.radius.is_finite() && wheel.radius > 0.0) {
                    return Err(ConfigError::InvalidParameter {
                        name: format!("{}.{}.radius", axle.name, wheel.name),
                        value: wheel.radius.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
