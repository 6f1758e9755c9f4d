use bevy::prelude::*;
use convoy::{
    components::{NetworkMode, ParticipantId, Vehicle},
    network::{OutboundMessage, ReplicationOutbox, SessionRole},
    physics::SimpleRigidBody,
    plugins::{SimpleBodyPlugin, VehicleSyncPlugin},
    resources::{SessionClock, SimulationConfig},
    systems::{
        OutboundRpcReady, ReplicatedFieldsReceived, ReplicationBatchReady, VehicleRpcReceived,
    },
};

use super::helpers::{create_test_body, create_test_config};

// Builder for creating a test application with customizable configuration
pub struct TestAppBuilder {
    role: SessionRole,
    mode: NetworkMode,
    config: Option<SimulationConfig>,
    vehicles: Vec<Vehicle>,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            role: SessionRole::Offline,
            mode: NetworkMode::ServerOnly,
            config: None,
            vehicles: Vec::new(),
        }
    }
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: SessionRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_mode(mut self, mode: NetworkMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_vehicle(mut self, vehicle: Vehicle) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    pub fn build(self) -> TestApp {
        let config = self
            .config
            .unwrap_or_else(|| create_test_config(self.role, self.mode));

        let mut app = App::new();
        app.add_plugins((
            VehicleSyncPlugin::<SimpleRigidBody>::new(config),
            SimpleBodyPlugin,
        ));

        let vehicles = self
            .vehicles
            .into_iter()
            .map(|vehicle| app.world_mut().spawn((vehicle, create_test_body())).id())
            .collect();

        TestApp { app, vehicles }
    }
}

/// Main test application wrapper
pub struct TestApp {
    pub app: App,
    pub vehicles: Vec<Entity>,
}

impl TestApp {
    /// Run `ticks` fixed steps without touching wall-clock time
    pub fn run_ticks(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    pub fn vehicle(&self) -> &Vehicle {
        self.app
            .world()
            .get::<Vehicle>(self.vehicles[0])
            .expect("vehicle spawned")
    }

    pub fn vehicle_mut(&mut self) -> Mut<Vehicle> {
        self.app
            .world_mut()
            .get_mut::<Vehicle>(self.vehicles[0])
            .expect("vehicle spawned")
    }

    pub fn body(&self) -> &SimpleRigidBody {
        self.app
            .world()
            .get::<SimpleRigidBody>(self.vehicles[0])
            .expect("body spawned")
    }

    pub fn body_mut(&mut self) -> Mut<SimpleRigidBody> {
        self.app
            .world_mut()
            .get_mut::<SimpleRigidBody>(self.vehicles[0])
            .expect("body spawned")
    }

    pub fn clock(&self) -> &SessionClock {
        self.app.world().resource::<SessionClock>()
    }

    pub fn replication_mut(&mut self) -> Mut<ReplicationOutbox> {
        self.app.world_mut().resource_mut::<ReplicationOutbox>()
    }

    /// Take every RPC queued so far
    pub fn drain_outbox(&mut self) -> Vec<OutboundMessage> {
        self.app
            .world_mut()
            .resource_mut::<Events<OutboundRpcReady>>()
            .drain()
            .map(|OutboundRpcReady(message)| message)
            .collect()
    }

    /// Take every replication batch flushed so far
    pub fn drain_batches(&mut self) -> Vec<ReplicationBatchReady> {
        self.app
            .world_mut()
            .resource_mut::<Events<ReplicationBatchReady>>()
            .drain()
            .collect()
    }

    pub fn deliver_rpc(&mut self, message: &OutboundMessage, sender: ParticipantId) {
        let (kind, body) = message.encode().expect("rpc encodes");
        self.app.world_mut().send_event(VehicleRpcReceived {
            vehicle: message.vehicle,
            sender,
            kind,
            body,
        });
    }

    pub fn query_single<T: Component>(&mut self) -> Option<&T> {
        let world = self.app.world_mut();
        let mut query = world.query::<&T>();
        query.get_single(world).ok()
    }
}

/// A server and one client, stepped in lockstep over an in-memory transport
pub struct TestSession {
    pub server: TestApp,
    pub client: TestApp,
    pub client_id: ParticipantId,
}

impl TestSession {
    pub fn new(server: TestApp, client: TestApp, client_id: ParticipantId) -> Self {
        Self {
            server,
            client,
            client_id,
        }
    }

    /// Client tick, client → server RPCs, server tick, server → client traffic
    pub fn run_ticks(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.client.run_ticks(1);
            for message in self.client.drain_outbox() {
                self.server.deliver_rpc(&message, self.client_id);
            }

            self.server.run_ticks(1);
            for message in self.server.drain_outbox() {
                self.client.deliver_rpc(&message, ParticipantId::SERVER);
            }
            for ReplicationBatchReady(batch) in self.server.drain_batches() {
                for update in batch.updates {
                    self.client
                        .app
                        .world_mut()
                        .send_event(ReplicatedFieldsReceived {
                            vehicle: update.vehicle,
                            updates: vec![update],
                        });
                }
            }
        }
    }
}
