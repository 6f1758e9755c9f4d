use bevy::prelude::*;
use nalgebra::Vector3;

use super::body::{MassProperties, RigidBody};
use super::integrator::{integrate_transform, relative_rotation};
use crate::components::BodyTransform;

/// Minimal single-body solver: impulses, gravity and kinematic moves.
///
/// Contacts and constraints are left to the host; wheels report their own
/// grounded state.
#[derive(Component, Debug, Clone)]
pub struct SimpleRigidBody {
    transform: BodyTransform,
    linear_velocity: Vector3<f64>,
    angular_velocity: Vector3<f64>,
    mass: MassProperties,
    dynamic: bool,
    always_active: bool,
    gravity_enabled: bool,
    kinematic_target: Option<BodyTransform>,
}

impl SimpleRigidBody {
    pub fn new(mass: MassProperties) -> Self {
        Self {
            transform: BodyTransform::default(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            mass,
            dynamic: false,
            always_active: false,
            gravity_enabled: false,
            kinematic_target: None,
        }
    }

    pub fn with_transform(mut self, transform: BodyTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn is_always_active(&self) -> bool {
        self.always_active
    }

    pub fn gravity_enabled(&self) -> bool {
        self.gravity_enabled
    }

    /// Advance the body by `dt` seconds.
    ///
    /// A pending kinematic target is reached exactly and consumed; otherwise a
    /// dynamic body integrates its velocities, with gravity when enabled.
    pub fn step(&mut self, dt: f64, gravity: &Vector3<f64>) {
        if let Some(target) = self.kinematic_target.take() {
            self.transform = target;
            return;
        }

        if !self.dynamic {
            return;
        }

        if self.gravity_enabled {
            self.linear_velocity += gravity * dt;
        }

        self.transform = integrate_transform(
            &self.transform,
            &self.linear_velocity,
            &self.angular_velocity,
            dt,
        );
    }
}

impl RigidBody for SimpleRigidBody {
    fn transform(&self) -> BodyTransform {
        self.transform
    }

    fn set_transform(&mut self, transform: BodyTransform) {
        self.transform = transform;
    }

    fn linear_velocity(&self) -> Vector3<f64> {
        self.linear_velocity
    }

    fn set_linear_velocity(&mut self, velocity: Vector3<f64>) {
        self.linear_velocity = velocity;
    }

    fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    fn set_angular_velocity(&mut self, velocity: Vector3<f64>) {
        self.angular_velocity = velocity;
    }

    fn apply_impulse(&mut self, impulse: Vector3<f64>) {
        self.linear_velocity += impulse * self.mass.inverse_mass();
    }

    fn apply_torque_impulse(&mut self, impulse: Vector3<f64>) {
        let basis = self.transform.basis;
        let inverse_inertia_world = basis * self.mass.inverse_inertia() * basis.transpose();
        self.angular_velocity += inverse_inertia_world * impulse;
    }

    fn mass_properties(&self) -> MassProperties {
        self.mass
    }

    fn wake(&mut self) {
        self.dynamic = true;
        self.always_active = true;
    }

    fn set_gravity_enabled(&mut self, enabled: bool) {
        self.gravity_enabled = enabled;
    }

    fn move_in_time(&mut self, target: &BodyTransform, dt: f64) {
        if dt > 0.0 {
            self.linear_velocity = (target.position - self.transform.position) / dt;
            self.angular_velocity = relative_rotation(&self.transform.basis, &target.basis) / dt;
        }
        self.kinematic_target = Some(*target);
    }
}
