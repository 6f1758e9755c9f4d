mod common;

use approx::assert_relative_eq;
use convoy::{
    components::{ControllerInput, NetworkMode, Occupant, DRIVER_SEAT},
    network::{Authority, SessionRole},
    physics::RigidBody,
    resources::MonotonicClock,
};
use nalgebra::Vector3;

use common::{
    assert_vehicle_valid, create_flat_config, create_test_vehicle, ground_all_wheels,
    TestAppBuilder, DRIVER, PASSENGER, TEST_TIMESTEP,
};

#[test]
fn test_offline_vehicle_falls_under_gravity() {
    let mut app = TestAppBuilder::new()
        .with_role(SessionRole::Offline)
        .with_vehicle(create_test_vehicle(NetworkMode::ServerOnly, None))
        .build();

    app.run_ticks(10);

    assert_eq!(app.vehicle().authority(), Some(Authority::Authoritative));
    assert!(app.body().is_dynamic());
    assert!(app.body().gravity_enabled());
    assert!(app.vehicle().linear_velocity().y < 0.0);
    assert_vehicle_valid(app.vehicle());
}

#[test]
fn test_server_follows_client_mode_vehicle() {
    let mut app = TestAppBuilder::new()
        .with_role(SessionRole::Server)
        .with_mode(NetworkMode::Client)
        .with_vehicle(create_test_vehicle(
            NetworkMode::Client,
            Some(Occupant::Human(DRIVER)),
        ))
        .build();

    app.run_ticks(10);

    assert_eq!(app.vehicle().authority(), Some(Authority::NotAuthoritative));
    assert!(!app.body().is_dynamic());
    assert_eq!(app.body().transform().position, Vector3::zeros());
}

#[test]
fn test_driving_client_owns_physics() {
    let mut vehicle = create_test_vehicle(NetworkMode::Client, Some(Occupant::Human(DRIVER)));
    ground_all_wheels(&mut vehicle);
    vehicle.set_controller(ControllerInput::new(1.0, 0.0, 0.0));

    let mut app = TestAppBuilder::new()
        .with_config(create_flat_config(
            SessionRole::Client(DRIVER),
            NetworkMode::Client,
        ))
        .with_vehicle(vehicle)
        .build();

    app.run_ticks(50);

    let vehicle = app.vehicle();
    assert_eq!(vehicle.authority(), Some(Authority::Authoritative));
    assert!(vehicle.transform().position.z > 0.0);
    assert_relative_eq!(vehicle.transform().position.x, 0.0, epsilon = 1e-9);
    assert_vehicle_valid(vehicle);
}

#[test]
fn test_passenger_client_does_not_own_physics() {
    let mut app = TestAppBuilder::new()
        .with_config(create_flat_config(
            SessionRole::Client(PASSENGER),
            NetworkMode::Client,
        ))
        .with_vehicle(create_test_vehicle(
            NetworkMode::Client,
            Some(Occupant::Human(DRIVER)),
        ))
        .build();

    app.run_ticks(5);

    assert_eq!(app.vehicle().authority(), Some(Authority::NotAuthoritative));
    assert!(app.drain_outbox().is_empty());
}

#[test]
fn test_authority_follows_driver_seat() {
    let mut app = TestAppBuilder::new()
        .with_config(create_flat_config(
            SessionRole::Client(DRIVER),
            NetworkMode::Prediction,
        ))
        .with_vehicle(create_test_vehicle(
            NetworkMode::Prediction,
            Some(Occupant::Human(DRIVER)),
        ))
        .build();

    app.run_ticks(1);
    assert_eq!(app.vehicle().authority(), Some(Authority::Authoritative));

    let left = app
        .vehicle_mut()
        .crew_get_out(DRIVER_SEAT)
        .expect("driver seated");
    assert_eq!(left, Occupant::Human(DRIVER));

    app.run_ticks(1);
    assert_eq!(app.vehicle().authority(), Some(Authority::NotAuthoritative));
    assert!(app.vehicle().controller().is_idle());
}

#[test]
fn test_clock_advances_by_timestep() {
    let mut app = TestAppBuilder::new().build();

    app.run_ticks(25);

    assert_eq!(app.clock().tick(), 25);
    assert_eq!(
        app.clock().now_ms(),
        (25.0 * TEST_TIMESTEP * 1000.0) as i32
    );
}
