use approx::assert_relative_eq;
use convoy::components::{BodyTransform, Vehicle};
use nalgebra::Vector3;

/// Assert that a transform has finite values and an orthonormal basis
#[track_caller]
pub fn assert_transform_valid(transform: &BodyTransform) {
    assert!(transform.is_finite(), "Transform is not finite");

    for axis in [transform.right(), transform.up(), transform.forward()] {
        assert_relative_eq!(axis.norm(), 1.0, epsilon = 1e-9);
    }
    assert_relative_eq!(transform.right().dot(&transform.up()), 0.0, epsilon = 1e-9);
    assert_relative_eq!(transform.up().dot(&transform.forward()), 0.0, epsilon = 1e-9);
}

/// Assert that a vehicle's cached motion and sync state are valid
#[track_caller]
pub fn assert_vehicle_valid(vehicle: &Vehicle) {
    assert_transform_valid(vehicle.transform());

    assert!(
        vehicle.linear_velocity().iter().all(|v| v.is_finite()),
        "Linear velocity is not finite"
    );
    assert!(
        vehicle.angular_velocity().iter().all(|v| v.is_finite()),
        "Angular velocity is not finite"
    );

    let sync = vehicle.sync_state();
    assert!(sync.time_delta >= 0, "Negative time delta {}", sync.time_delta);
    assert!(
        sync.position.iter().all(|v| v.is_finite()),
        "Sync position is not finite"
    );
}

/// Assert two positions agree within `epsilon`
#[track_caller]
pub fn assert_position_eq(actual: &Vector3<f64>, expected: &Vector3<f64>, epsilon: f64) {
    assert_relative_eq!(actual.x, expected.x, epsilon = epsilon);
    assert_relative_eq!(actual.y, expected.y, epsilon = epsilon);
    assert_relative_eq!(actual.z, expected.z, epsilon = epsilon);
}
