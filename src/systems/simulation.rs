use bevy::prelude::*;
use nalgebra::Vector3;

use super::behaviour::{TickContext, TickReport, VehicleBehaviour};
use super::sync::synchronize_variables;
use crate::{
    components::{NetworkMode, Occupant, Vehicle},
    network::{
        resolve_authority, Authority, Delivery, NetworkOutbox, Recipients, ReplicationOutbox,
        SessionRole, VehicleRpc,
    },
    physics::{BodyState, RigidBody, SimpleRigidBody},
    resources::{MonotonicClock, SessionClock, SimulationConfig},
};

/// Prepare a freshly created body.
///
/// A server never runs dynamics for a `Client`-mode vehicle; the driving
/// client does. Everywhere else the body is woken with gravity, its mass
/// properties are cached for the vehicle's lifetime and stored velocities are
/// restored.
pub fn create_physics(vehicle: &mut Vehicle, role: SessionRole, body: &mut dyn RigidBody) -> bool {
    if vehicle.network_mode == NetworkMode::Client && role.is_server() {
        info!(
            "Vehicle {} follows client snapshots, no local dynamics",
            vehicle.id
        );
        vehicle.record_motion(body);
        return false;
    }

    body.wake();
    body.set_gravity_enabled(true);
    let mass = body.mass_properties();
    vehicle.mass = Some(mass);
    body.set_linear_velocity(vehicle.linear_velocity);
    body.set_angular_velocity(vehicle.angular_velocity);
    vehicle.record_motion(body);

    info!(
        "Vehicle {} physics created: mass {:.0} kg, {} wheels",
        vehicle.id,
        mass.mass,
        vehicle.wheel_count()
    );
    true
}

/// Run one tick for a vehicle.
///
/// Authority is resolved once here and holds for the whole tick. The
/// authoritative path steps the axles and applies a single accumulated
/// impulse; the other path moves the body toward the extrapolated snapshot.
///
/// # Arguments
/// - `vehicle`: The vehicle to step.
/// - `body`: Its rigid body in the external solver.
/// - `ctx`: Role, clock and outbound queues for this tick.
pub fn simulate_tick(
    vehicle: &mut Vehicle,
    body: &mut dyn RigidBody,
    ctx: &mut TickContext<'_>,
) -> TickReport {
    let authority = resolve_authority(ctx.role, vehicle.network_mode, vehicle.crew.driver());
    if vehicle.authority != Some(authority) {
        debug!("Vehicle {} authority: {:?}", vehicle.id, authority);
        vehicle.authority = Some(authority);
    }
    vehicle.ticks += 1;

    let report = match authority {
        Authority::Authoritative => simulate_authoritative(vehicle, body, ctx),
        Authority::NotAuthoritative => extrapolate(vehicle, body, ctx),
    };

    send_controller_input(vehicle, ctx);
    report
}

fn simulate_authoritative(
    vehicle: &mut Vehicle,
    body: &mut dyn RigidBody,
    ctx: &mut TickContext<'_>,
) -> TickReport {
    body.wake();
    body.set_gravity_enabled(true);

    let mass = *vehicle.mass.get_or_insert_with(|| body.mass_properties());
    let state = BodyState::read(body, mass, vehicle.controller);
    vehicle.record_motion(body);

    let mut grounded_wheels = 0;
    for axle in vehicle.axles.iter_mut() {
        grounded_wheels += axle.setup_simulation(&state, ctx.dt);
    }

    let mut impulse = Vector3::zeros();
    let mut torque_impulse = Vector3::zeros();
    for axle in vehicle.axles.iter_mut() {
        axle.simulate(&state, ctx.dt, grounded_wheels, &mut impulse, &mut torque_impulse);
    }

    body.apply_impulse(impulse);
    body.apply_torque_impulse(torque_impulse);

    if ctx.role.is_networked() {
        // Pose from the start of the tick, velocities after this tick's impulse
        vehicle.sync.publish(
            &state.transform,
            body.linear_velocity(),
            body.angular_velocity(),
        );
        synchronize_variables(vehicle, ctx);
    }

    TickReport {
        grounded_wheels,
        impulse,
        torque_impulse,
        ..TickReport::new(Authority::Authoritative)
    }
}

fn extrapolate(
    vehicle: &mut Vehicle,
    body: &mut dyn RigidBody,
    ctx: &mut TickContext<'_>,
) -> TickReport {
    vehicle.record_motion(body);

    let predicted = vehicle.sync.extrapolate(ctx.now_ms).filter(|target| {
        let finite = target.is_finite();
        if !finite {
            warn!("Vehicle {}: non-finite prediction, holding pose", vehicle.id);
        }
        finite
    });
    match predicted {
        Some(target) => body.move_in_time(&target, ctx.dt),
        // Nothing usable received yet: hold the current pose
        None => {
            let current = body.transform();
            body.move_in_time(&current, ctx.dt)
        }
    }
    ctx.replication.mark_dirty(vehicle.id);

    TickReport {
        predicted,
        ..TickReport::new(Authority::NotAuthoritative)
    }
}

fn send_controller_input(vehicle: &Vehicle, ctx: &mut TickContext<'_>) {
    let SessionRole::Client(local) = ctx.role else {
        return;
    };
    if vehicle.crew.driver() != Some(Occupant::Human(local)) {
        return;
    }
    if vehicle.ticks % u64::from(ctx.controller_send_interval.max(1)) != 0 {
        return;
    }

    ctx.outbox.send(
        vehicle.id,
        VehicleRpc::ControllerSync(vehicle.controller),
        Delivery::Reliable,
        Recipients::Server,
    );
}

/// Advance the session clock by one fixed step.
pub fn advance_clock_system(config: Res<SimulationConfig>, mut clock: ResMut<SessionClock>) {
    clock.advance(config.timestep);
}

/// Create physics for newly spawned vehicles, in the session's network mode.
pub fn create_physics_system<B: RigidBody + Component>(
    mut query: Query<(&mut Vehicle, &mut B), Added<Vehicle>>,
    config: Res<SimulationConfig>,
) {
    for (mut vehicle, mut body) in &mut query {
        if vehicle.network_mode != config.vehicle_sync {
            warn!(
                "Vehicle {} spawned as {:?}, session runs {:?}; using the session mode",
                vehicle.id, vehicle.network_mode, config.vehicle_sync
            );
            vehicle.network_mode = config.vehicle_sync;
        }
        vehicle.on_create_physics(config.role, &mut *body);
    }
}

/// Step every vehicle once.
pub fn vehicle_simulation_system<B: RigidBody + Component>(
    mut query: Query<(&mut Vehicle, &mut B)>,
    config: Res<SimulationConfig>,
    clock: Res<SessionClock>,
    mut outbox: ResMut<NetworkOutbox>,
    mut replication: ResMut<ReplicationOutbox>,
) {
    let mut ctx = TickContext::new(&config, clock.now_ms(), &mut outbox, &mut replication);

    for (mut vehicle, mut body) in &mut query {
        vehicle.on_tick(&mut ctx, &mut *body);
    }
}

/// Complete pending locks once doors are closed.
pub fn vehicle_post_simulate_system(
    mut query: Query<&mut Vehicle>,
    config: Res<SimulationConfig>,
    mut replication: ResMut<ReplicationOutbox>,
) {
    for mut vehicle in &mut query {
        vehicle.post_simulate(config.role, &mut replication);
    }
}

/// Advance the reference solver bodies.
pub fn simple_body_step_system(
    mut bodies: Query<&mut SimpleRigidBody>,
    config: Res<SimulationConfig>,
) {
    for mut body in &mut bodies {
        body.step(config.timestep, &config.gravity);
    }
}
