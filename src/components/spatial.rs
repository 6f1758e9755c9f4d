use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// World placement of a rigid body.
///
/// The basis columns are the body's right (x), up (y) and forward (z) axes
/// expressed in world space, so `basis * v` takes a body-space vector to world
/// space and `basis.transpose() * v` takes it back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyTransform {
    /// Orientation basis (columns are body axes in world space)
    pub basis: Matrix3<f64>,
    /// Position in world space [m]
    pub position: Vector3<f64>,
}

impl Default for BodyTransform {
    fn default() -> Self {
        Self {
            basis: Matrix3::identity(),
            position: Vector3::zeros(),
        }
    }
}

impl BodyTransform {
    pub fn new(basis: Matrix3<f64>, position: Vector3<f64>) -> Self {
        Self { basis, position }
    }

    /// Identity orientation at a given position
    pub fn at_position(position: Vector3<f64>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Build from a position and yaw/pitch/roll in degrees.
    ///
    /// Yaw turns about world up (y), pitch about the body right axis (x) and
    /// roll about the body forward axis (z), applied in that order.
    pub fn from_position_orientation(position: Vector3<f64>, ypr_degrees: Vector3<f64>) -> Self {
        Self {
            basis: basis_from_ypr(ypr_degrees.map(f64::to_radians)),
            position,
        }
    }

    /// Yaw/pitch/roll of the basis in degrees.
    pub fn orientation_degrees(&self) -> Vector3<f64> {
        ypr_from_basis(&self.basis).map(f64::to_degrees)
    }

    pub fn right(&self) -> Vector3<f64> {
        self.basis.column(0).into_owned()
    }

    pub fn up(&self) -> Vector3<f64> {
        self.basis.column(1).into_owned()
    }

    pub fn forward(&self) -> Vector3<f64> {
        self.basis.column(2).into_owned()
    }

    /// Rotate a body-space vector into world space
    pub fn to_world(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.basis * v
    }

    /// Rotate a world-space vector into body space
    pub fn to_body(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.basis.transpose() * v
    }

    pub fn is_finite(&self) -> bool {
        self.basis.iter().all(|v| v.is_finite()) && self.position.iter().all(|v| v.is_finite())
    }
}

/// Rotation matrix for yaw/pitch/roll in radians.
pub fn basis_from_ypr(ypr: Vector3<f64>) -> Matrix3<f64> {
    let yaw = Rotation3::from_axis_angle(&Vector3::y_axis(), ypr.x);
    let pitch = Rotation3::from_axis_angle(&Vector3::x_axis(), ypr.y);
    let roll = Rotation3::from_axis_angle(&Vector3::z_axis(), ypr.z);
    (yaw * pitch * roll).into_inner()
}

/// Inverse of [`basis_from_ypr`], in radians.
pub fn ypr_from_basis(m: &Matrix3<f64>) -> Vector3<f64> {
    let sin_pitch = (-m[(1, 2)]).clamp(-1.0, 1.0);
    let pitch = sin_pitch.asin();

    if sin_pitch.abs() < 1.0 - 1e-9 {
        let yaw = m[(0, 2)].atan2(m[(2, 2)]);
        let roll = m[(1, 0)].atan2(m[(1, 1)]);
        Vector3::new(yaw, pitch, roll)
    } else {
        // Gimbal lock: fold roll into yaw
        let yaw = (-m[(2, 0)]).atan2(m[(0, 0)]);
        Vector3::new(yaw, pitch, 0.0)
    }
}
