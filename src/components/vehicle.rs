use bevy::prelude::*;
use nalgebra::{Matrix3, Vector3};
use std::collections::BTreeMap;

use super::{
    controller::ControllerInput,
    crew::{CrewRoster, Occupant},
    identity::PersistentId,
    layout::VehicleLayout,
    lock::{CarKey, LockState, LockStateMachine},
    spatial::BodyTransform,
    status::{Fluid, VehicleStatus},
    sync::{NetworkMode, SyncState},
};
use crate::{
    network::{
        Authority, Delivery, ExplodeMessage, FieldValue, NetworkOutbox, Recipients, ReplicatedField,
        ReplicationOutbox, SessionRole, VehicleRpc,
    },
    physics::{estimated_orientation, Axle, AxleSimulator, MassProperties, RigidBody, WheelState},
    resources::{Result, SimulationConfig, VehicleError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CarDoorState {
    #[default]
    Closed,
    Open,
    /// Detached or destroyed; never counts as closed
    Missing,
}

/// Aggregate root for one networked wheeled vehicle.
///
/// Axles and seats are fixed at construction. The tick logic in
/// [`crate::systems`] drives this state; everything here is bookkeeping that
/// can be called directly by gameplay code.
#[derive(Component, Debug)]
pub struct Vehicle {
    pub(crate) id: PersistentId,
    pub(crate) network_mode: NetworkMode,
    pub(crate) sync: SyncState,
    pub(crate) axles: Vec<Box<dyn AxleSimulator>>,
    pub(crate) crew: CrewRoster,
    pub(crate) lock: LockStateMachine,
    pub(crate) doors: BTreeMap<String, CarDoorState>,
    pub(crate) status: VehicleStatus,
    pub(crate) controller: ControllerInput,
    pub(crate) mass: Option<MassProperties>,
    pub(crate) transform: BodyTransform,
    pub(crate) linear_velocity: Vector3<f64>,
    pub(crate) angular_velocity: Vector3<f64>,
    pub(crate) linear_velocity_ms: Vector3<f64>,
    pub(crate) angular_velocity_ms: Vector3<f64>,
    pub(crate) authority: Option<Authority>,
    pub(crate) ticks: u64,
}

impl Vehicle {
    /// Build a vehicle with reference [`Axle`]s from `layout`.
    pub fn new(id: PersistentId, layout: &VehicleLayout, network_mode: NetworkMode) -> Self {
        let axles = layout
            .axles
            .iter()
            .map(|axle| Box::new(Axle::from_layout(axle)) as Box<dyn AxleSimulator>)
            .collect();
        Self::with_axles(id, layout, network_mode, axles)
    }

    /// Build a vehicle in the session's configured network mode.
    pub fn from_config(id: PersistentId, layout: &VehicleLayout, config: &SimulationConfig) -> Self {
        Self::new(id, layout, config.vehicle_sync)
    }

    /// Build a vehicle with custom axle simulators, in declaration order.
    pub fn with_axles(
        id: PersistentId,
        layout: &VehicleLayout,
        network_mode: NetworkMode,
        axles: Vec<Box<dyn AxleSimulator>>,
    ) -> Self {
        Self {
            id,
            network_mode,
            sync: SyncState::default(),
            axles,
            crew: CrewRoster::with_seats(layout.seats.len()),
            lock: LockStateMachine::new(id),
            doors: layout
                .doors
                .iter()
                .map(|door| (door.clone(), CarDoorState::Closed))
                .collect(),
            status: VehicleStatus::default(),
            controller: ControllerInput::default(),
            mass: None,
            transform: BodyTransform::default(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            linear_velocity_ms: Vector3::zeros(),
            angular_velocity_ms: Vector3::zeros(),
            authority: None,
            ticks: 0,
        }
    }

    pub fn id(&self) -> PersistentId {
        self.id
    }

    pub fn network_mode(&self) -> NetworkMode {
        self.network_mode
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    /// Authority resolved on the most recent tick
    pub fn authority(&self) -> Option<Authority> {
        self.authority
    }

    pub fn is_physics_host(&self) -> bool {
        self.authority.is_some_and(|a| a.is_authoritative())
    }

    pub fn mass_properties(&self) -> Option<MassProperties> {
        self.mass
    }

    // Motion, as last read from the body

    /// Body transform as last read from the body
    pub fn transform(&self) -> &BodyTransform {
        &self.transform
    }

    pub fn linear_velocity(&self) -> Vector3<f64> {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    pub fn linear_velocity_ms(&self) -> Vector3<f64> {
        self.linear_velocity_ms
    }

    pub fn angular_velocity_ms(&self) -> Vector3<f64> {
        self.angular_velocity_ms
    }

    /// Body-space velocity of a point at body-space offset `r`.
    pub fn model_velocity_at(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.linear_velocity_ms + self.angular_velocity_ms.cross(r)
    }

    /// World-space velocity of a point at body-space offset `r`.
    pub fn world_velocity_at(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.transform.to_world(&self.model_velocity_at(r))
    }

    pub fn estimated_orientation(&self, dt: f64) -> Matrix3<f64> {
        estimated_orientation(&self.transform, &self.angular_velocity, dt)
    }

    pub(crate) fn record_motion(&mut self, body: &dyn RigidBody) {
        self.transform = body.transform();
        self.linear_velocity = body.linear_velocity();
        self.angular_velocity = body.angular_velocity();
        self.linear_velocity_ms = self.transform.to_body(&self.linear_velocity);
        self.angular_velocity_ms = self.transform.to_body(&self.angular_velocity);
    }

    // Axles and wheels

    pub fn axles(&self) -> &[Box<dyn AxleSimulator>] {
        &self.axles
    }

    pub fn wheel_count(&self) -> usize {
        self.axles.iter().map(|axle| axle.wheels().len()).sum()
    }

    /// Wheel by index across axles in declaration order
    pub fn wheel(&self, index: usize) -> Option<&WheelState> {
        self.axles
            .iter()
            .flat_map(|axle| axle.wheels().iter())
            .nth(index)
    }

    fn wheel_mut(&mut self, index: usize) -> Result<&mut WheelState> {
        let count = self.wheel_count();
        self.axles
            .iter_mut()
            .flat_map(|axle| axle.wheels_mut().iter_mut())
            .nth(index)
            .ok_or(VehicleError::WheelOutOfRange { index, count })
    }

    pub fn set_wheel_engine_force(&mut self, index: usize, force: f64) -> Result<()> {
        self.wheel_mut(index)?.engine_force = force;
        Ok(())
    }

    pub fn wheel_engine_force(&self, index: usize) -> Option<f64> {
        self.wheel(index).map(|wheel| wheel.engine_force)
    }

    pub fn set_wheel_brake_force(&mut self, index: usize, force: f64) -> Result<()> {
        self.wheel_mut(index)?.brake_force = force.max(0.0);
        Ok(())
    }

    pub fn wheel_brake_force(&self, index: usize) -> Option<f64> {
        self.wheel(index).map(|wheel| wheel.brake_force)
    }

    pub fn set_wheel_steering(&mut self, index: usize, angle: f64) -> Result<()> {
        self.wheel_mut(index)?.steering = angle;
        Ok(())
    }

    /// Record the host's contact result for a wheel.
    pub fn set_wheel_grounded(&mut self, index: usize, grounded: bool) -> Result<()> {
        self.wheel_mut(index)?.grounded = grounded;
        Ok(())
    }

    // Crew

    pub fn crew(&self) -> &CrewRoster {
        &self.crew
    }

    pub fn crew_size(&self) -> usize {
        self.crew.crew_size()
    }

    pub fn crew_member(&self, seat: usize) -> Option<Occupant> {
        self.crew.crew_member(seat)
    }

    pub fn crew_member_index(&self, occupant: &Occupant) -> Option<usize> {
        self.crew.crew_member_index(occupant)
    }

    pub fn driver(&self) -> Option<Occupant> {
        self.crew.driver()
    }

    /// Seat an occupant. Authority follows on the next tick.
    pub fn crew_get_in(&mut self, occupant: Occupant, seat: usize) -> Result<()> {
        self.crew.crew_get_in(occupant, seat)
    }

    pub fn crew_get_out(&mut self, seat: usize) -> Result<Occupant> {
        let occupant = self.crew.crew_get_out(seat)?;
        if seat == super::crew::DRIVER_SEAT {
            self.controller = ControllerInput::default();
        }
        Ok(occupant)
    }

    // Controls

    pub fn controller(&self) -> ControllerInput {
        self.controller
    }

    /// Local driver input. Remote input arrives through `ControllerSync`.
    pub fn set_controller(&mut self, input: ControllerInput) {
        self.controller = input.clamped();
    }

    // Lock and doors

    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    pub fn has_key(&self) -> bool {
        self.lock.has_key()
    }

    pub fn is_car_key(&self, key: &CarKey) -> bool {
        self.lock.is_car_key(key)
    }

    pub fn pair_key(&mut self, key: &mut CarKey, replication: &mut ReplicationOutbox) {
        if self.lock.pair_key(key) {
            self.stage_lock_state(replication);
        }
    }

    pub fn lock_car(&mut self, key: Option<&CarKey>, replication: &mut ReplicationOutbox) -> bool {
        let changed = self.lock.lock_car(key);
        if changed {
            self.stage_lock_state(replication);
        }
        changed
    }

    pub fn unlock_car(&mut self, key: Option<&CarKey>, replication: &mut ReplicationOutbox) -> bool {
        let changed = self.lock.unlock_car(key);
        if changed {
            self.stage_lock_state(replication);
        }
        changed
    }

    pub fn door_state(&self, door: &str) -> Option<CarDoorState> {
        self.doors.get(door).copied()
    }

    /// Record a door observation. Returns `false` for unknown doors.
    pub fn set_door_state(
        &mut self,
        door: &str,
        state: CarDoorState,
        replication: &mut ReplicationOutbox,
    ) -> bool {
        let Some(current) = self.doors.get_mut(door) else {
            return false;
        };
        let opened = *current != CarDoorState::Open && state == CarDoorState::Open;
        *current = state;

        if opened && self.lock.on_door_opened() {
            self.stage_lock_state(replication);
        }
        true
    }

    pub fn all_doors_closed(&self) -> bool {
        self.doors.values().all(|door| *door == CarDoorState::Closed)
    }

    /// Complete a pending lock once every door is closed. Host-side only.
    pub fn post_simulate(&mut self, role: SessionRole, replication: &mut ReplicationOutbox) {
        if !role.is_host() || self.lock.state() != LockState::ReadyToLock {
            return;
        }
        if self.lock.on_doors_observed(self.all_doors_closed()) {
            info!("Vehicle {} locked", self.id);
            self.stage_lock_state(replication);
        }
    }

    fn stage_lock_state(&self, replication: &mut ReplicationOutbox) {
        replication.stage(
            self.id,
            ReplicatedField::LockState,
            FieldValue::Int(self.lock.state().to_wire()),
        );
        replication.mark_dirty(self.id);
    }

    // Status

    pub fn status(&self) -> &VehicleStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut VehicleStatus {
        &mut self.status
    }

    pub fn engine_is_on(&self) -> bool {
        self.status.engine_on
    }

    pub fn engine_start(&mut self, replication: &mut ReplicationOutbox) -> bool {
        if self.status.exploded || self.status.engine_on {
            return false;
        }
        self.set_engine(true, replication);
        true
    }

    pub fn engine_stop(&mut self, replication: &mut ReplicationOutbox) -> bool {
        if !self.status.engine_on {
            return false;
        }
        self.set_engine(false, replication);
        true
    }

    fn set_engine(&mut self, on: bool, replication: &mut ReplicationOutbox) {
        self.status.engine_on = on;
        replication.stage(self.id, ReplicatedField::EngineOn, FieldValue::Bool(on));
        replication.mark_dirty(self.id);
    }

    pub fn is_exploded(&self) -> bool {
        self.status.exploded
    }

    /// Destroy the vehicle. Host-side, once.
    ///
    /// Zeroes health, drains every fluid, pops the body upwards and notifies
    /// other participants. Returns the occupants for the host to kill, or
    /// `None` when nothing happened.
    pub fn explode(
        &mut self,
        role: SessionRole,
        cause: i32,
        body: &mut dyn RigidBody,
        replication: &mut ReplicationOutbox,
        outbox: &mut NetworkOutbox,
    ) -> Option<Vec<Occupant>> {
        if !role.is_host() || self.status.exploded {
            return None;
        }

        warn!("Vehicle {} exploded (cause {})", self.id, cause);
        self.status.exploded = true;
        self.status.health = 0.0;
        for fluid in Fluid::ALL {
            self.status.leak_all(fluid);
        }
        if self.status.engine_on {
            self.set_engine(false, replication);
        }

        let mass = body.mass_properties().mass;
        let mut force = body.linear_velocity() * mass;
        force.y += mass * 10.0;
        body.apply_impulse(force * 0.1);

        replication.stage(self.id, ReplicatedField::Exploded, FieldValue::Bool(true));
        replication.mark_dirty(self.id);
        if role.is_networked() {
            outbox.send(
                self.id,
                VehicleRpc::Explode(ExplodeMessage { cause }),
                Delivery::Reliable,
                Recipients::AllOthers,
            );
        }

        Some(self.crew.occupants().collect())
    }

    /// Stage identity, lock and engine state for a newly joined participant.
    pub fn replicate_spawn_state(&self, replication: &mut ReplicationOutbox) {
        for (part, value) in self.id.0.iter().enumerate() {
            replication.stage(
                self.id,
                ReplicatedField::PersistentIdPart(part as u8),
                FieldValue::Int(*value as i32),
            );
        }
        replication.stage(
            self.id,
            ReplicatedField::LockState,
            FieldValue::Int(self.lock.state().to_wire()),
        );
        replication.stage(
            self.id,
            ReplicatedField::EngineOn,
            FieldValue::Bool(self.status.engine_on),
        );
        replication.stage(
            self.id,
            ReplicatedField::Exploded,
            FieldValue::Bool(self.status.exploded),
        );
        replication.mark_dirty(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ParticipantId;
    use crate::physics::SimpleRigidBody;
    use pretty_assertions::assert_eq;

    const CAR: PersistentId = PersistentId([7, 7, 7, 7]);

    fn sedan() -> Vehicle {
        Vehicle::new(CAR, &VehicleLayout::sedan(), NetworkMode::ServerOnly)
    }

    #[test]
    fn test_built_from_layout() {
        let vehicle = sedan();

        assert_eq!(vehicle.axles().len(), 2);
        assert_eq!(vehicle.wheel_count(), 4);
        assert_eq!(vehicle.crew_size(), 4);
        assert_eq!(vehicle.wheel(2).map(|w| w.name.as_str()), Some("Left"));
        assert_eq!(vehicle.axles()[1].name(), "Rear");
        assert!(vehicle.all_doors_closed());
        assert_eq!(vehicle.lock_state(), LockState::NoLock);
    }

    #[test]
    fn test_per_wheel_control() {
        let mut vehicle = sedan();

        vehicle.set_wheel_engine_force(3, 250.0).unwrap();
        vehicle.set_wheel_brake_force(0, -5.0).unwrap();
        vehicle.set_wheel_steering(1, 0.2).unwrap();

        assert_eq!(vehicle.wheel_engine_force(3), Some(250.0));
        assert_eq!(vehicle.wheel_brake_force(0), Some(0.0));
        assert_eq!(vehicle.wheel(1).map(|w| w.steering), Some(0.2));
        assert_eq!(
            vehicle.set_wheel_grounded(4, true),
            Err(VehicleError::WheelOutOfRange { index: 4, count: 4 })
        );
    }

    #[test]
    fn test_lock_scenario_through_doors() {
        let mut vehicle = sedan();
        let mut replication = ReplicationOutbox::default();
        let mut key = CarKey::blank();

        vehicle.pair_key(&mut key, &mut replication);
        assert_eq!(vehicle.lock_state(), LockState::Unlocked);

        vehicle.set_door_state("DriverDoor", CarDoorState::Open, &mut replication);
        assert!(vehicle.lock_car(Some(&key), &mut replication));
        assert_eq!(vehicle.lock_state(), LockState::ReadyToLock);

        // Still open: stays ready
        vehicle.post_simulate(SessionRole::Server, &mut replication);
        assert_eq!(vehicle.lock_state(), LockState::ReadyToLock);

        vehicle.set_door_state("DriverDoor", CarDoorState::Closed, &mut replication);
        // Clients never complete the lock themselves
        vehicle.post_simulate(SessionRole::Client(ParticipantId(1)), &mut replication);
        assert_eq!(vehicle.lock_state(), LockState::ReadyToLock);

        vehicle.post_simulate(SessionRole::Server, &mut replication);
        assert_eq!(vehicle.lock_state(), LockState::Locked);
        assert_eq!(
            replication.staged(CAR, ReplicatedField::LockState),
            Some(FieldValue::Int(LockState::Locked.to_wire()))
        );
        assert!(replication.is_dirty(CAR));

        assert!(vehicle.unlock_car(Some(&key), &mut replication));
        assert_eq!(vehicle.lock_state(), LockState::Unlocked);
    }

    #[test]
    fn test_opening_door_cancels_lock() {
        let mut vehicle = sedan();
        let mut replication = ReplicationOutbox::default();
        let mut key = CarKey::blank();
        vehicle.pair_key(&mut key, &mut replication);
        vehicle.lock_car(None, &mut replication);

        assert!(vehicle.set_door_state("RearLeftDoor", CarDoorState::Open, &mut replication));
        assert_eq!(vehicle.lock_state(), LockState::Unlocked);
        assert!(!vehicle.set_door_state("Trunk", CarDoorState::Open, &mut replication));
    }

    #[test]
    fn test_missing_door_blocks_locking() {
        let mut vehicle = sedan();
        let mut replication = ReplicationOutbox::default();
        let mut key = CarKey::blank();
        vehicle.pair_key(&mut key, &mut replication);
        vehicle.set_door_state("CoDriverDoor", CarDoorState::Missing, &mut replication);
        vehicle.lock_car(Some(&key), &mut replication);

        vehicle.post_simulate(SessionRole::Offline, &mut replication);
        assert_eq!(vehicle.lock_state(), LockState::ReadyToLock);
    }

    #[test]
    fn test_unpaired_key_is_ignored_silently() {
        let mut vehicle = sedan();
        let mut replication = ReplicationOutbox::default();
        let mut key = CarKey::blank();
        vehicle.pair_key(&mut key, &mut replication);
        replication.drain();

        let stranger = CarKey::paired_to(PersistentId([1, 1, 1, 1]));
        assert!(!vehicle.lock_car(Some(&stranger), &mut replication));
        assert_eq!(vehicle.lock_state(), LockState::Unlocked);
        assert_eq!(replication.staged_count(), 0);
    }

    #[test]
    fn test_engine_start_stop() {
        let mut vehicle = sedan();
        let mut replication = ReplicationOutbox::default();

        assert!(vehicle.engine_start(&mut replication));
        assert!(!vehicle.engine_start(&mut replication));
        assert!(vehicle.engine_is_on());
        assert!(vehicle.engine_stop(&mut replication));
        assert_eq!(
            replication.staged(CAR, ReplicatedField::EngineOn),
            Some(FieldValue::Bool(false))
        );
    }

    #[test]
    fn test_explode_once_on_host() {
        let mut vehicle = sedan();
        let mut replication = ReplicationOutbox::default();
        let mut outbox = NetworkOutbox::default();
        let mut body = SimpleRigidBody::new(MassProperties::default());
        let driver = Occupant::Human(ParticipantId(4));
        vehicle.crew_get_in(driver, 0).unwrap();
        vehicle.engine_start(&mut replication);

        // Clients cannot explode vehicles
        assert!(vehicle
            .explode(SessionRole::Client(ParticipantId(4)), 0, &mut body, &mut replication, &mut outbox)
            .is_none());

        let killed = vehicle
            .explode(SessionRole::Server, 2, &mut body, &mut replication, &mut outbox)
            .unwrap();

        assert_eq!(killed, vec![driver]);
        assert!(vehicle.is_exploded());
        assert!(!vehicle.engine_is_on());
        assert_eq!(vehicle.status().health, 0.0);
        for fluid in Fluid::ALL {
            assert_eq!(vehicle.status().amount(fluid), 0.0);
        }
        assert!(body.linear_velocity().y > 0.0);
        assert_eq!(outbox.len(), 1);
        assert_eq!(
            replication.staged(CAR, ReplicatedField::Exploded),
            Some(FieldValue::Bool(true))
        );

        assert!(vehicle
            .explode(SessionRole::Server, 2, &mut body, &mut replication, &mut outbox)
            .is_none());
        assert!(!vehicle.engine_start(&mut replication));
    }

    #[test]
    fn test_driver_exit_clears_controls() {
        let mut vehicle = sedan();
        vehicle.crew_get_in(Occupant::Ai(1), 0).unwrap();
        vehicle.set_controller(ControllerInput::new(1.0, 0.0, 0.0));

        vehicle.crew_get_out(0).unwrap();
        assert!(vehicle.controller().is_idle());
    }

    #[test]
    fn test_spawn_state_staging() {
        let vehicle = sedan();
        let mut replication = ReplicationOutbox::default();
        vehicle.replicate_spawn_state(&mut replication);

        assert_eq!(
            replication.staged(CAR, ReplicatedField::PersistentIdPart(3)),
            Some(FieldValue::Int(7))
        );
        assert_eq!(replication.staged_count(), 7);
    }
}
