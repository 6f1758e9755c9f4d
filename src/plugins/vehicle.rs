use bevy::prelude::*;
use std::marker::PhantomData;

use crate::network::{FixedInterval, NetworkOutbox, ReplicationOutbox};
use crate::physics::RigidBody;
use crate::resources::{SessionClock, SimulationConfig};
use crate::systems::{
    advance_clock_system, create_physics_system, flush_outbox_system, flush_replication_system,
    receive_network_transform_system, receive_replicated_fields_system, receive_rpc_system,
    simple_body_step_system, vehicle_post_simulate_system, vehicle_simulation_system,
    NetworkTransformReceived, OutboundRpcReady, ReplicatedFieldsReceived, ReplicationBatchReady,
    VehicleRpcReceived,
};

/// Fixed-step vehicle stages, run in order
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum VehicleSet {
    Clock,
    Receive,
    Simulate,
    Solve,
    PostSimulate,
}

/// Vehicle authority, simulation and sync for bodies of type `B`.
pub struct VehicleSyncPlugin<B> {
    config: SimulationConfig,
    _body: PhantomData<fn() -> B>,
}

impl<B> VehicleSyncPlugin<B> {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            _body: PhantomData,
        }
    }
}

impl<B: RigidBody + Component> Plugin for VehicleSyncPlugin<B> {
    fn build(&self, app: &mut App) {
        info!(
            "Vehicle sync as {:?}, mode {:?}, {:.1} Hz",
            self.config.role,
            self.config.vehicle_sync,
            1.0 / self.config.timestep
        );

        app.insert_resource(self.config.clone())
            .insert_resource(Time::<Fixed>::from_seconds(self.config.timestep))
            .init_resource::<SessionClock>()
            .init_resource::<NetworkOutbox>()
            .insert_resource(ReplicationOutbox::with_policy(FixedInterval::every(
                self.config.replication_interval,
            )));

        app.add_event::<VehicleRpcReceived>()
            .add_event::<ReplicatedFieldsReceived>()
            .add_event::<NetworkTransformReceived>()
            .add_event::<ReplicationBatchReady>()
            .add_event::<OutboundRpcReady>();

        app.configure_sets(
            FixedUpdate,
            (
                VehicleSet::Clock,
                VehicleSet::Receive,
                VehicleSet::Simulate,
                VehicleSet::Solve,
                VehicleSet::PostSimulate,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                advance_clock_system.in_set(VehicleSet::Clock),
                (
                    receive_rpc_system,
                    receive_replicated_fields_system,
                    receive_network_transform_system,
                )
                    .chain()
                    .in_set(VehicleSet::Receive),
                (create_physics_system::<B>, vehicle_simulation_system::<B>)
                    .chain()
                    .in_set(VehicleSet::Simulate),
                (
                    vehicle_post_simulate_system,
                    flush_replication_system,
                    flush_outbox_system,
                )
                    .chain()
                    .in_set(VehicleSet::PostSimulate),
            ),
        );
    }
}

/// Steps [`SimpleRigidBody`](crate::physics::SimpleRigidBody) after the
/// vehicles have applied their impulses.
pub struct SimpleBodyPlugin;

impl Plugin for SimpleBodyPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            simple_body_step_system.in_set(VehicleSet::Solve),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        NetworkMode, Occupant, ParticipantId, PersistentId, Vehicle, VehicleLayout,
    };
    use crate::network::{Authority, RpcKind, SessionRole};
    use crate::physics::{MassProperties, SimpleRigidBody};
    use crate::resources::MonotonicClock;

    fn app(role: SessionRole) -> App {
        app_with_mode(role, NetworkMode::ServerOnly)
    }

    fn app_with_mode(role: SessionRole, vehicle_sync: NetworkMode) -> App {
        let config = SimulationConfig {
            role,
            vehicle_sync,
            timestep: 0.01,
            ..Default::default()
        };
        let mut app = App::new();
        app.add_plugins((
            VehicleSyncPlugin::<SimpleRigidBody>::new(config),
            SimpleBodyPlugin,
        ));
        app
    }

    #[test]
    fn test_plugin_resources() {
        let app = app(SessionRole::Server);

        assert!(app.world().contains_resource::<SessionClock>());
        assert!(app.world().contains_resource::<NetworkOutbox>());
        assert!(app.world().contains_resource::<ReplicationOutbox>());
        assert_eq!(app.world().resource::<SimulationConfig>().timestep, 0.01);
    }

    #[test]
    fn test_fixed_update_advances_clock_and_creates_physics() {
        let mut app = app(SessionRole::Offline);
        let id = PersistentId([1, 2, 3, 4]);
        app.world_mut().spawn((
            Vehicle::new(id, &VehicleLayout::sedan(), NetworkMode::ServerOnly),
            SimpleRigidBody::new(MassProperties::default()),
        ));

        for _ in 0..10 {
            app.world_mut().run_schedule(FixedUpdate);
        }

        assert_eq!(app.world().resource::<SessionClock>().now_ms(), 100);
        let world = app.world_mut();
        let mut query = world.query::<(&Vehicle, &SimpleRigidBody)>();
        let (vehicle, body) = query.single(world);
        assert!(vehicle.is_physics_host());
        assert!(body.is_dynamic());
    }

    #[test]
    fn test_vehicle_adopts_session_network_mode() {
        let mut app = app_with_mode(SessionRole::Server, NetworkMode::Client);
        let id = PersistentId([5, 6, 7, 8]);
        app.world_mut().spawn((
            Vehicle::new(id, &VehicleLayout::sedan(), NetworkMode::ServerOnly),
            SimpleRigidBody::new(MassProperties::default()),
        ));

        app.world_mut().run_schedule(FixedUpdate);

        let world = app.world_mut();
        let mut query = world.query::<(&Vehicle, &SimpleRigidBody)>();
        let (vehicle, body) = query.single(world);
        assert_eq!(vehicle.network_mode(), NetworkMode::Client);
        assert_eq!(vehicle.authority(), Some(Authority::NotAuthoritative));
        assert!(!body.is_dynamic());
    }

    #[test]
    fn test_from_config_uses_session_mode() {
        let config = SimulationConfig {
            vehicle_sync: NetworkMode::Prediction,
            ..Default::default()
        };
        let vehicle =
            Vehicle::from_config(PersistentId([1, 1, 1, 1]), &VehicleLayout::sedan(), &config);

        assert_eq!(vehicle.network_mode(), NetworkMode::Prediction);
    }

    #[test]
    fn test_outbox_drained_into_events_each_step() {
        let driver = ParticipantId(3);
        let mut app = app_with_mode(SessionRole::Client(driver), NetworkMode::Client);
        let mut vehicle = Vehicle::new(
            PersistentId([2, 2, 2, 2]),
            &VehicleLayout::sedan(),
            NetworkMode::Client,
        );
        vehicle.crew_get_in(Occupant::Human(driver), 0).unwrap();
        app.world_mut()
            .spawn((vehicle, SimpleRigidBody::new(MassProperties::default())));

        for _ in 0..3 {
            app.world_mut().run_schedule(FixedUpdate);
        }

        assert!(app.world().resource::<NetworkOutbox>().is_empty());
        let kinds: Vec<_> = app
            .world_mut()
            .resource_mut::<Events<OutboundRpcReady>>()
            .drain()
            .map(|OutboundRpcReady(message)| message.rpc.kind())
            .collect();
        assert!(kinds.contains(&RpcKind::ClientSync));
        assert!(kinds.contains(&RpcKind::ControllerSync));
    }
}
