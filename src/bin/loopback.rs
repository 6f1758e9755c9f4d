use bevy::{log::LogPlugin, prelude::*};
use std::env;

use convoy::{
    components::{
        ControllerInput, NetworkMode, Occupant, ParticipantId, PersistentId, Vehicle,
        VehicleLayout, DRIVER_SEAT,
    },
    network::{ReplicationOutbox, SessionRole},
    physics::{MassProperties, RigidBody, SimpleRigidBody},
    plugins::{SimpleBodyPlugin, VehicleSyncPlugin},
    resources::SimulationConfig,
    systems::{
        OutboundRpcReady, ReplicatedFieldsReceived, ReplicationBatchReady, VehicleRpcReceived,
    },
};

const DRIVER: ParticipantId = ParticipantId(1);
const TICKS: u32 = 180;

fn parse_mode(arg: Option<String>) -> Result<NetworkMode, String> {
    match arg.as_deref() {
        None | Some("client") => Ok(NetworkMode::Client),
        Some("prediction") => Ok(NetworkMode::Prediction),
        Some("server_only") => Ok(NetworkMode::ServerOnly),
        Some(other) => Err(format!(
            "unknown mode '{}', expected client, prediction or server_only",
            other
        )),
    }
}

fn build_app(role: SessionRole, mode: NetworkMode, id: PersistentId, log: bool) -> App {
    let config = SimulationConfig {
        role,
        vehicle_sync: mode,
        controller_send_interval: 6,
        replication_interval: 6,
        ..Default::default()
    };

    let mut vehicle = Vehicle::from_config(id, &VehicleLayout::sedan(), &config);

    let mut app = App::new();
    if log {
        app.add_plugins(LogPlugin::default());
    }
    app.add_plugins((
        VehicleSyncPlugin::<SimpleRigidBody>::new(config),
        SimpleBodyPlugin,
    ));

    if let Err(err) = vehicle.crew_get_in(Occupant::Human(DRIVER), DRIVER_SEAT) {
        error!("Could not seat driver: {}", err);
    }
    if role.is_client() {
        vehicle.set_controller(ControllerInput::new(0.6, 0.0, 0.2));
    }
    app.world_mut().spawn((
        vehicle,
        SimpleRigidBody::new(MassProperties::default()),
        Name::new(format!("Vehicle {}", id)),
    ));
    app
}

/// Deliver queued RPCs from one app to the other.
fn forward_rpcs(from: &mut App, to: &mut App, sender: ParticipantId) {
    let messages: Vec<_> = from
        .world_mut()
        .resource_mut::<Events<OutboundRpcReady>>()
        .drain()
        .map(|OutboundRpcReady(message)| message)
        .collect();

    for message in messages {
        match message.encode() {
            Ok((kind, body)) => {
                to.world_mut().send_event(VehicleRpcReceived {
                    vehicle: message.vehicle,
                    sender,
                    kind,
                    body,
                });
            }
            Err(err) => warn!("Dropping {:?}: {}", message.rpc.kind(), err),
        }
    }
}

/// Deliver the server's replicated fields to the client.
fn forward_replication(server: &mut App, client: &mut App) {
    let batches: Vec<_> = server
        .world_mut()
        .resource_mut::<Events<ReplicationBatchReady>>()
        .drain()
        .collect();

    for ReplicationBatchReady(batch) in batches {
        for update in batch.updates {
            client.world_mut().send_event(ReplicatedFieldsReceived {
                vehicle: update.vehicle,
                updates: vec![update],
            });
        }
    }
}

fn log_positions(tick: u32, server: &mut App, client: &mut App) {
    for (label, app) in [("server", server), ("client", client)] {
        let world = app.world_mut();
        let mut query = world.query::<(&Vehicle, &SimpleRigidBody)>();
        for (vehicle, body) in query.iter(world) {
            let position = body.transform().position;
            info!(
                "tick {:>3} {:<6} {:?} authority {:?} at ({:.2}, {:.2}, {:.2})",
                tick,
                label,
                vehicle.network_mode(),
                vehicle.authority(),
                position.x,
                position.y,
                position.z
            );
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mode = parse_mode(env::args().nth(1))?;
    let id = PersistentId::generate();

    let mut server = build_app(SessionRole::Server, mode, id, true);
    let mut client = build_app(SessionRole::Client(DRIVER), mode, id, false);

    info!("Loopback session for vehicle {} in {:?} mode", id, mode);

    {
        let world = server.world_mut();
        let mut query = world.query::<&Vehicle>();
        let mut staged = ReplicationOutbox::default();
        for vehicle in query.iter(world) {
            vehicle.replicate_spawn_state(&mut staged);
        }
        let batch = staged.drain();
        info!("Spawn state: {} fields", batch.updates.len());
        client.world_mut().send_event(ReplicatedFieldsReceived {
            vehicle: id,
            updates: batch.updates,
        });
    }

    for tick in 1..=TICKS {
        client.world_mut().run_schedule(FixedUpdate);
        forward_rpcs(&mut client, &mut server, DRIVER);
        server.world_mut().run_schedule(FixedUpdate);
        forward_rpcs(&mut server, &mut client, ParticipantId::SERVER);
        forward_replication(&mut server, &mut client);

        if tick % 30 == 0 {
            log_positions(tick, &mut server, &mut client);
        }
    }

    Ok(())
}
