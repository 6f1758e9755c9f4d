use convoy::{
    components::{
        AxleLayout, NetworkMode, Occupant, ParticipantId, PersistentId, Vehicle, VehicleLayout,
        DRIVER_SEAT,
    },
    network::{ClientSyncMessage, SessionRole, VehicleRpc},
    physics::{MassProperties, SimpleRigidBody},
    resources::SimulationConfig,
};
use nalgebra::Vector3;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub const TEST_VEHICLE: PersistentId = PersistentId([0xC0, 0xFF, 0xEE, 0x01]);
pub const DRIVER: ParticipantId = ParticipantId(1);
pub const PASSENGER: ParticipantId = ParticipantId(2);

/// Timestep used by every test app [s]
pub const TEST_TIMESTEP: f64 = 0.01;

/// Creates a test simulation configuration
pub fn create_test_config(role: SessionRole, mode: NetworkMode) -> SimulationConfig {
    SimulationConfig::builder()
        .role(role)
        .vehicle_sync(mode)
        .timestep(TEST_TIMESTEP)
        .controller_send_interval(1)
        .replication_interval(1)
        .build()
        .expect("test config is valid")
}

/// Creates a sedan with the given driver seated
pub fn create_test_vehicle(mode: NetworkMode, driver: Option<Occupant>) -> Vehicle {
    let mut vehicle = Vehicle::new(TEST_VEHICLE, &VehicleLayout::sedan(), mode);
    if let Some(driver) = driver {
        vehicle
            .crew_get_in(driver, DRIVER_SEAT)
            .expect("driver seat is free");
    }
    vehicle
}

/// Creates a single-axle cart with no steering
pub fn create_test_cart(mode: NetworkMode) -> Vehicle {
    let layout = VehicleLayout::new()
        .with_axle(AxleLayout::pair("Rear", 0.6, -0.3, 0.0, 0.3).drive(2000.0))
        .with_seats(["Driver"]);
    Vehicle::new(TEST_VEHICLE, &layout, mode)
}

/// Creates a test body with default mass properties
pub fn create_test_body() -> SimpleRigidBody {
    SimpleRigidBody::new(MassProperties::default())
}

/// A `ClientSync` snapshot at `time` for a car at `x` moving along +x
pub fn snapshot_at(time: i32, x: f64, speed: f64) -> ClientSyncMessage {
    ClientSyncMessage::new(
        time,
        Vector3::new(x, 0.0, 0.0),
        Vector3::zeros(),
        Vector3::new(speed, 0.0, 0.0),
        Vector3::zeros(),
    )
}

pub fn snapshot_rpc(time: i32, x: f64, speed: f64) -> VehicleRpc {
    VehicleRpc::ClientSync(snapshot_at(time, x, speed))
}

/// Snapshots stamped `times`, delivered in a seeded random order
pub fn shuffled_snapshots(times: &[i32], seed: u64) -> Vec<ClientSyncMessage> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut snapshots: Vec<_> = times
        .iter()
        .map(|&time| snapshot_at(time, f64::from(time) / 100.0, 1.0))
        .collect();
    snapshots.shuffle(&mut rng);
    snapshots
}

/// Test configuration with gravity switched off, for flat-ground driving
pub fn create_flat_config(role: SessionRole, mode: NetworkMode) -> SimulationConfig {
    SimulationConfig {
        gravity: Vector3::zeros(),
        ..create_test_config(role, mode)
    }
}

/// Put every wheel on the ground
pub fn ground_all_wheels(vehicle: &mut Vehicle) {
    for index in 0..vehicle.wheel_count() {
        vehicle
            .set_wheel_grounded(index, true)
            .expect("wheel index in range");
    }
}
