use nalgebra::Vector3;
use std::fmt::Debug;

use super::body::BodyState;
use crate::components::AxleLayout;

/// Acceleration used to estimate tire load [m/s²]
const STANDARD_GRAVITY: f64 = 9.81;
/// Friction coefficient limiting lateral grip
const TIRE_GRIP: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct WheelState {
    pub name: String,
    /// Contact point relative to the body origin [m]
    pub position: Vector3<f64>,
    /// Tire radius [m]
    pub radius: f64,
    /// Set by the host's contact query
    pub grounded: bool,
    /// Gameplay drive force on top of controller input [N]
    pub engine_force: f64,
    /// Gameplay brake force on top of controller input [N]
    pub brake_force: f64,
    /// Gameplay steering angle on top of controller input [rad]
    pub steering: f64,
    /// Steering angle used this tick [rad]
    pub applied_steering: f64,
}

/// Per-axle force model driven by the vehicle tick.
///
/// Both calls happen once per authoritative tick, in axle declaration order:
/// every axle's `setup_simulation` first, then every axle's `simulate` with
/// the summed grounded wheel count. `simulate` adds its contribution to the
/// shared impulse accumulators and must not apply anything to the body.
pub trait AxleSimulator: Send + Sync + Debug {
    fn name(&self) -> &str;
    fn wheels(&self) -> &[WheelState];
    fn wheels_mut(&mut self) -> &mut [WheelState];

    /// Prepare this tick and return the number of grounded wheels.
    fn setup_simulation(&mut self, body: &BodyState, dt: f64) -> usize;

    /// Accumulate this axle's linear and angular impulse for the tick.
    fn simulate(
        &mut self,
        body: &BodyState,
        dt: f64,
        grounded_wheels: usize,
        impulse: &mut Vector3<f64>,
        torque_impulse: &mut Vector3<f64>,
    );
}

/// Reference axle: drive, brake and a grip-limited lateral force per wheel.
#[derive(Debug, Clone, PartialEq)]
pub struct Axle {
    name: String,
    wheels: Vec<WheelState>,
    max_steering_angle: f64,
    max_drive_force: f64,
    max_brake_force: f64,
}

impl Axle {
    pub fn from_layout(layout: &AxleLayout) -> Self {
        let wheels = layout
            .wheels
            .iter()
            .map(|wheel| WheelState {
                name: wheel.name.clone(),
                position: wheel.position,
                radius: wheel.radius,
                grounded: false,
                engine_force: 0.0,
                brake_force: 0.0,
                steering: 0.0,
                applied_steering: 0.0,
            })
            .collect();

        Self {
            name: layout.name.clone(),
            wheels,
            max_steering_angle: layout.max_steering_angle,
            max_drive_force: layout.max_drive_force,
            max_brake_force: layout.max_brake_force,
        }
    }

    /// Force on one grounded wheel in body axes.
    fn wheel_force(
        &self,
        wheel: &WheelState,
        body: &BodyState,
        dt: f64,
        grounded_wheels: usize,
    ) -> Vector3<f64> {
        let share = self.wheels.len().max(1) as f64;
        let mass_share = body.mass.mass / grounded_wheels.max(1) as f64;

        let (sin, cos) = wheel.applied_steering.sin_cos();
        let forward = Vector3::new(sin, 0.0, cos);
        let side = Vector3::new(cos, 0.0, -sin);

        let r = wheel.position - body.mass.center_of_mass;
        let velocity = body.model_velocity_at(&r);
        let longitudinal_speed = velocity.dot(&forward);
        let lateral_speed = velocity.dot(&side);

        let drive =
            wheel.engine_force + f64::from(body.controls.throttle) * self.max_drive_force / share;
        let brake =
            wheel.brake_force + f64::from(body.controls.brake) * self.max_brake_force / share;

        // Brakes stop the wheel but never push it backwards
        let stopping = longitudinal_speed.abs() * mass_share / dt;
        let brake_force = -longitudinal_speed.signum() * brake.min(stopping);

        let grip = TIRE_GRIP * mass_share * STANDARD_GRAVITY;
        let lateral_force = (-lateral_speed * mass_share / dt).clamp(-grip, grip);

        forward * (drive + brake_force) + side * lateral_force
    }
}

impl AxleSimulator for Axle {
    fn name(&self) -> &str {
        &self.name
    }

    fn wheels(&self) -> &[WheelState] {
        &self.wheels
    }

    fn wheels_mut(&mut self) -> &mut [WheelState] {
        &mut self.wheels
    }

    fn setup_simulation(&mut self, body: &BodyState, _dt: f64) -> usize {
        let steering = f64::from(body.controls.steering) * self.max_steering_angle;
        for wheel in &mut self.wheels {
            wheel.applied_steering = wheel.steering + steering;
        }
        self.wheels.iter().filter(|wheel| wheel.grounded).count()
    }

    fn simulate(
        &mut self,
        body: &BodyState,
        dt: f64,
        grounded_wheels: usize,
        impulse: &mut Vector3<f64>,
        torque_impulse: &mut Vector3<f64>,
    ) {
        if dt <= 0.0 {
            return;
        }

        for wheel in self.wheels.iter().filter(|wheel| wheel.grounded) {
            let force_body = self.wheel_force(wheel, body, dt, grounded_wheels);
            let force = body.transform.to_world(&force_body);
            let arm = body
                .transform
                .to_world(&(wheel.position - body.mass.center_of_mass));

            *impulse += force * dt;
            *torque_impulse += arm.cross(&force) * dt;
        }
    }
}
