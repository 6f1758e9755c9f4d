use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::components::BodyTransform;

/// Advance `base` by constant velocities over `dt` seconds.
///
/// Position moves by `linear_velocity * dt`. The basis is rotated by the
/// exponential map of `angular_velocity * dt` (world-space angular velocity,
/// so the rotation is applied on the left) and each axis is re-normalized.
/// A zero `dt` returns `base` unchanged, bit for bit.
///
/// # Arguments
/// - `base`: Transform to extrapolate from.
/// - `linear_velocity`: World-space linear velocity [m/s].
/// - `angular_velocity`: World-space angular velocity [rad/s].
/// - `dt`: Time to advance [s].
pub fn integrate_transform(
    base: &BodyTransform,
    linear_velocity: &Vector3<f64>,
    angular_velocity: &Vector3<f64>,
    dt: f64,
) -> BodyTransform {
    if dt == 0.0 {
        return *base;
    }

    let rotation = Rotation3::from_scaled_axis(angular_velocity * dt);
    let mut basis = rotation.matrix() * base.basis;
    normalize_axes(&mut basis);

    BodyTransform {
        basis,
        position: base.position + linear_velocity * dt,
    }
}

/// Basis of `transform` advanced by `angular_velocity` over `dt`, position untouched.
pub fn estimated_orientation(
    transform: &BodyTransform,
    angular_velocity: &Vector3<f64>,
    dt: f64,
) -> Matrix3<f64> {
    integrate_transform(transform, &Vector3::zeros(), angular_velocity, dt).basis
}

/// Rotation vector taking `from` to `to` (world frame, left-applied).
pub fn relative_rotation(from: &Matrix3<f64>, to: &Matrix3<f64>) -> Vector3<f64> {
    let relative = Rotation3::from_matrix(&(to * from.transpose()));
    relative.scaled_axis()
}

fn normalize_axes(basis: &mut Matrix3<f64>) {
    for i in 0..3 {
        let axis = basis.column(i).normalize();
        basis.set_column(i, &axis);
    }
}
