use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use super::integrator::estimated_orientation;
use crate::components::{BodyTransform, ControllerInput};

/// Mass properties read once when physics is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    /// Mass [kg]
    pub mass: f64,
    /// Principal moments of inertia in body axes [kg·m²]
    pub inertia: Vector3<f64>,
    /// Centre of mass relative to the body origin [m]
    pub center_of_mass: Vector3<f64>,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 1_500.0,
            inertia: Vector3::new(2_000.0, 2_400.0, 800.0),
            center_of_mass: Vector3::new(0.0, -0.2, 0.0),
        }
    }
}

impl MassProperties {
    /// Inverse inertia tensor in body axes
    pub fn inverse_inertia(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&self.inertia.map(|i| if i > 0.0 { 1.0 / i } else { 0.0 }))
    }

    pub fn inverse_mass(&self) -> f64 {
        if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }
}

/// The external rigid-body solver for one dynamic body.
///
/// The vehicle reads state and pushes impulses through this contract; it never
/// integrates the body itself.
pub trait RigidBody {
    fn transform(&self) -> BodyTransform;
    fn set_transform(&mut self, transform: BodyTransform);

    /// World-space linear velocity [m/s]
    fn linear_velocity(&self) -> Vector3<f64>;
    fn set_linear_velocity(&mut self, velocity: Vector3<f64>);

    /// World-space angular velocity [rad/s]
    fn angular_velocity(&self) -> Vector3<f64>;
    fn set_angular_velocity(&mut self, velocity: Vector3<f64>);

    /// Linear impulse through the centre of mass, world space [N·s]
    fn apply_impulse(&mut self, impulse: Vector3<f64>);
    /// Angular impulse, world space [N·m·s]
    fn apply_torque_impulse(&mut self, impulse: Vector3<f64>);

    fn mass_properties(&self) -> MassProperties;

    /// Make the body dynamic and keep it from sleeping. Idempotent.
    fn wake(&mut self);
    fn set_gravity_enabled(&mut self, enabled: bool);

    /// Drive the body so it reaches `target` after `dt` seconds.
    fn move_in_time(&mut self, target: &BodyTransform, dt: f64);
}

/// Per-tick snapshot of the body handed to axle simulators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub transform: BodyTransform,
    /// World-space linear velocity [m/s]
    pub linear_velocity: Vector3<f64>,
    /// World-space angular velocity [rad/s]
    pub angular_velocity: Vector3<f64>,
    /// Body-space linear velocity [m/s]
    pub linear_velocity_ms: Vector3<f64>,
    /// Body-space angular velocity [rad/s]
    pub angular_velocity_ms: Vector3<f64>,
    pub mass: MassProperties,
    pub controls: ControllerInput,
}

impl BodyState {
    /// Read the body and derive body-space velocities from its basis.
    pub fn read(body: &dyn RigidBody, mass: MassProperties, controls: ControllerInput) -> Self {
        let transform = body.transform();
        let linear_velocity = body.linear_velocity();
        let angular_velocity = body.angular_velocity();

        Self {
            linear_velocity_ms: transform.to_body(&linear_velocity),
            angular_velocity_ms: transform.to_body(&angular_velocity),
            transform,
            linear_velocity,
            angular_velocity,
            mass,
            controls,
        }
    }

    /// Body-space velocity of a point at body-space offset `r` from the origin.
    pub fn model_velocity_at(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.linear_velocity_ms + self.angular_velocity_ms.cross(r)
    }

    /// World-space velocity of a point at body-space offset `r`.
    pub fn world_velocity_at(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.transform.to_world(&self.model_velocity_at(r))
    }

    /// Basis predicted `dt` seconds ahead from the current angular velocity.
    pub fn estimated_orientation(&self, dt: f64) -> Matrix3<f64> {
        estimated_orientation(&self.transform, &self.angular_velocity, dt)
    }
}
