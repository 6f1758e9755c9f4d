use bevy::prelude::*;
use nalgebra::Vector3;

use super::behaviour::{IgnoreReason, RpcContext, RpcOutcome, TickContext, VehicleBehaviour};
use crate::{
    components::{LockState, NetworkMode, Occupant, ParticipantId, PersistentId, Vehicle},
    network::{
        ClientSyncMessage, Delivery, FieldUpdate, FieldValue, NetworkOutbox, OutboundMessage,
        Recipients, ReplicatedField, ReplicationBatch, ReplicationOutbox, VehicleRpc,
    },
    resources::{MonotonicClock, SessionClock, SimulationConfig},
};

/// Raw RPC delivered by the transport.
#[derive(Event, Debug, Clone)]
pub struct VehicleRpcReceived {
    pub vehicle: PersistentId,
    pub sender: ParticipantId,
    pub kind: u8,
    pub body: Vec<u8>,
}

/// Replicated field values delivered by the transport.
#[derive(Event, Debug, Clone)]
pub struct ReplicatedFieldsReceived {
    pub vehicle: PersistentId,
    pub updates: Vec<FieldUpdate>,
}

/// Host-replicated transform (engine-level position sync).
#[derive(Event, Debug, Clone)]
pub struct NetworkTransformReceived {
    pub vehicle: PersistentId,
    pub position: Vector3<f64>,
    /// Yaw/pitch/roll [rad]
    pub orientation: Vector3<f64>,
}

/// Replicated fields released by the flush policy, for the transport to send.
#[derive(Event, Debug, Clone)]
pub struct ReplicationBatchReady(pub ReplicationBatch);

/// One queued RPC, for the transport to send.
#[derive(Event, Debug, Clone)]
pub struct OutboundRpcReady(pub OutboundMessage);

/// Publish the authoritative state through the path for the vehicle's mode.
///
/// `ServerOnly` leaves the published velocities in the sync state for the
/// host's own low-rate replication. `Prediction` additionally stages the six
/// velocity scalars (host side only, clients predict locally). `Client` sends
/// an unreliable `ClientSync` snapshot to every other participant. The vehicle
/// is marked dirty in every mode.
pub fn synchronize_variables(vehicle: &mut Vehicle, ctx: &mut TickContext<'_>) {
    let id = vehicle.id;

    match vehicle.network_mode {
        NetworkMode::ServerOnly => {}
        NetworkMode::Prediction => {
            if ctx.role.is_host() {
                for (field, value) in ReplicatedField::VELOCITY
                    .into_iter()
                    .zip(vehicle.sync.velocity_fields())
                {
                    ctx.replication.stage(id, field, FieldValue::Float(value));
                }
            }
        }
        NetworkMode::Client => {
            let message = ClientSyncMessage::from_state(ctx.now_ms, &vehicle.sync);
            ctx.outbox.send(
                id,
                VehicleRpc::ClientSync(message),
                Delivery::Unreliable,
                Recipients::AllOthers,
            );
        }
    }

    ctx.replication.mark_dirty(id);
}

/// Apply a decoded RPC.
///
/// `ClientSync` is accepted only for `Client`-mode vehicles, never from this
/// node itself, and only when strictly newer than the stored snapshot.
/// `ControllerSync` is accepted by the server from the seated driver only.
/// `Explode` marks a client's copy as exploded.
pub fn handle_rpc(vehicle: &mut Vehicle, ctx: &RpcContext, rpc: &VehicleRpc) -> RpcOutcome {
    if ctx.role.local_participant() == Some(ctx.sender) {
        return RpcOutcome::Ignored(IgnoreReason::OwnMessage);
    }

    match rpc {
        VehicleRpc::ClientSync(message) => {
            if vehicle.network_mode != NetworkMode::Client {
                return RpcOutcome::Ignored(IgnoreReason::WrongMode);
            }
            if !vehicle.sync.apply_client_sync(message, ctx.now_ms) {
                return RpcOutcome::Ignored(IgnoreReason::Stale);
            }
            RpcOutcome::Applied
        }
        VehicleRpc::ControllerSync(input) => {
            if !ctx.role.is_server() {
                return RpcOutcome::Ignored(IgnoreReason::WrongRole);
            }
            if vehicle.crew.driver() != Some(Occupant::Human(ctx.sender)) {
                return RpcOutcome::Ignored(IgnoreReason::NotDriver);
            }
            vehicle.controller = input.clamped();
            RpcOutcome::Applied
        }
        VehicleRpc::Explode(_) => {
            if !ctx.role.is_client() {
                return RpcOutcome::Ignored(IgnoreReason::WrongRole);
            }
            if vehicle.status.exploded {
                return RpcOutcome::Ignored(IgnoreReason::Stale);
            }
            vehicle.status.exploded = true;
            vehicle.status.health = 0.0;
            RpcOutcome::Applied
        }
    }
}

/// Apply replicated field values received from the host.
///
/// Values of the wrong type and out-of-range id parts are logged and skipped.
pub fn apply_replicated_fields(vehicle: &mut Vehicle, updates: &[FieldUpdate]) {
    for update in updates {
        match update.field {
            ReplicatedField::LockState => {
                match update.value.as_i32().and_then(LockState::from_wire) {
                    Some(state) => {
                        vehicle.lock.apply_replicated(state);
                    }
                    None => warn_skipped(vehicle.id, update),
                }
            }
            ReplicatedField::EngineOn => match update.value.as_bool() {
                Some(on) => vehicle.status.engine_on = on,
                None => warn_skipped(vehicle.id, update),
            },
            ReplicatedField::Exploded => match update.value.as_bool() {
                Some(exploded) => vehicle.status.exploded = exploded,
                None => warn_skipped(vehicle.id, update),
            },
            ReplicatedField::PersistentIdPart(part) => {
                let applied = update
                    .value
                    .as_i32()
                    .is_some_and(|value| vehicle.id.set_part(usize::from(part), value as u32));
                if applied {
                    vehicle.lock.set_owner(vehicle.id);
                } else {
                    warn_skipped(vehicle.id, update);
                }
            }
            field => {
                let index = ReplicatedField::VELOCITY.iter().position(|f| *f == field);
                match (index, update.value.as_f32()) {
                    (Some(index), Some(value)) => vehicle.sync.set_velocity_field(index, value),
                    _ => warn_skipped(vehicle.id, update),
                }
            }
        }
    }
}

fn warn_skipped(vehicle: PersistentId, update: &FieldUpdate) {
    warn!(
        "Vehicle {}: skipping {:?} = {:?}",
        vehicle, update.field, update.value
    );
}

/// Handle the host's own transform replication.
///
/// In `Client` mode `ClientSync` carries the pose, so the host update is
/// always discarded. Otherwise the pose is recorded as a snapshot stamped
/// with the local clock; a vehicle that owns its physics keeps its local pose.
/// Returns `true` when the host must not apply the replicated transform.
pub fn on_network_transform_update(
    vehicle: &mut Vehicle,
    position: Vector3<f64>,
    orientation_radians: Vector3<f64>,
    now_ms: i32,
) -> bool {
    if vehicle.network_mode == NetworkMode::Client {
        return true;
    }

    vehicle.sync.apply_network_transform(
        position,
        orientation_radians.map(f64::to_degrees),
        now_ms,
    );

    if vehicle.is_physics_host() {
        let transform = vehicle.transform;
        let (linear, angular) = (vehicle.linear_velocity, vehicle.angular_velocity);
        vehicle.sync.publish(&transform, linear, angular);
        return true;
    }
    false
}

fn find_vehicle<'a>(
    vehicles: &'a mut Query<&mut Vehicle>,
    id: PersistentId,
) -> Option<Mut<'a, Vehicle>> {
    vehicles.iter_mut().find(|vehicle| vehicle.id() == id)
}

/// Decode and apply inbound vehicle RPCs.
pub fn receive_rpc_system(
    mut events: EventReader<VehicleRpcReceived>,
    mut vehicles: Query<&mut Vehicle>,
    config: Res<SimulationConfig>,
    clock: Res<SessionClock>,
) {
    for event in events.read() {
        let Some(mut vehicle) = find_vehicle(&mut vehicles, event.vehicle) else {
            trace!("RPC for unknown vehicle {}", event.vehicle);
            continue;
        };

        let rpc = match VehicleRpc::decode(event.kind, &event.body) {
            Ok(rpc) => rpc,
            Err(err) => {
                warn!(
                    "Discarding malformed RPC from {:?} for vehicle {}: {}",
                    event.sender, event.vehicle, err
                );
                continue;
            }
        };

        let ctx = RpcContext {
            role: config.role,
            now_ms: clock.now_ms(),
            sender: event.sender,
        };
        match vehicle.on_rpc(&ctx, &rpc) {
            RpcOutcome::Applied => trace!("Applied {:?} to vehicle {}", rpc.kind(), event.vehicle),
            RpcOutcome::Ignored(reason) => trace!(
                "Ignored {:?} for vehicle {}: {:?}",
                rpc.kind(),
                event.vehicle,
                reason
            ),
        }
    }
}

/// Apply replicated fields delivered by the transport.
pub fn receive_replicated_fields_system(
    mut events: EventReader<ReplicatedFieldsReceived>,
    mut vehicles: Query<&mut Vehicle>,
) {
    for event in events.read() {
        match find_vehicle(&mut vehicles, event.vehicle) {
            Some(mut vehicle) => vehicle.on_variables_synchronized(&event.updates),
            None => trace!("Fields for unknown vehicle {}", event.vehicle),
        }
    }
}

/// Record host-replicated transforms as snapshots.
pub fn receive_network_transform_system(
    mut events: EventReader<NetworkTransformReceived>,
    mut vehicles: Query<&mut Vehicle>,
    clock: Res<SessionClock>,
) {
    for event in events.read() {
        let Some(mut vehicle) = find_vehicle(&mut vehicles, event.vehicle) else {
            continue;
        };
        if on_network_transform_update(
            &mut vehicle,
            event.position,
            event.orientation,
            clock.now_ms(),
        ) {
            trace!("Vehicle {} keeps its local transform", event.vehicle);
        }
    }
}

/// Release staged fields when the replication policy says so.
pub fn flush_replication_system(
    mut replication: ResMut<ReplicationOutbox>,
    clock: Res<SessionClock>,
    mut batches: EventWriter<ReplicationBatchReady>,
) {
    if let Some(batch) = replication.flush(clock.tick()) {
        batches.send(ReplicationBatchReady(batch));
    }
}

/// Hand every queued RPC to the transport.
pub fn flush_outbox_system(
    mut outbox: ResMut<NetworkOutbox>,
    mut ready: EventWriter<OutboundRpcReady>,
) {
    for message in outbox.drain() {
        ready.send(OutboundRpcReady(message));
    }
}
