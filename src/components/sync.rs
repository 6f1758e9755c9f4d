use bevy::log::trace;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::spatial::BodyTransform;
use crate::network::ClientSyncMessage;
use crate::physics::integrate_transform;

/// How a vehicle's state travels between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    /// Server simulates; clients follow replicated transforms
    #[default]
    ServerOnly,
    /// Server simulates and replicates velocities for client-side prediction
    Prediction,
    /// The driving client simulates and broadcasts snapshots
    Client,
}

/// Last applied network snapshot and the extrapolation derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    /// Sender clock of the last accepted snapshot [ms]
    pub time: i32,
    /// Value of `time` before the last accepted snapshot [ms]
    pub last_received_time: i32,
    /// Receiver clock minus sender clock at apply, never negative [ms]
    pub time_delta: i32,
    /// World position [m]
    pub position: Vector3<f64>,
    /// Yaw/pitch/roll [deg]
    pub orientation: Vector3<f64>,
    /// World linear velocity [m/s]
    pub linear_velocity: Vector3<f64>,
    /// World angular velocity [rad/s]
    pub angular_velocity: Vector3<f64>,
    /// Extrapolation baseline
    pub initial_transform: BodyTransform,
    /// Output of the last extrapolation
    pub predicted_transform: BodyTransform,
    has_snapshot: bool,
    baseline_stale: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            time: 0,
            last_received_time: 0,
            time_delta: 0,
            position: Vector3::zeros(),
            orientation: Vector3::zeros(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            initial_transform: BodyTransform::default(),
            predicted_transform: BodyTransform::default(),
            has_snapshot: false,
            baseline_stale: false,
        }
    }
}

impl SyncState {
    pub fn has_snapshot(&self) -> bool {
        self.has_snapshot
    }

    /// Whether a snapshot stamped `time` is newer than the stored one.
    pub fn is_newer(&self, time: i32) -> bool {
        !self.has_snapshot || time > self.time
    }

    /// Apply a `ClientSync` snapshot received at local time `now`.
    ///
    /// Returns `false` and leaves the state untouched when the snapshot is not
    /// strictly newer than the stored one.
    pub fn apply_client_sync(&mut self, message: &ClientSyncMessage, now: i32) -> bool {
        if !self.accept_time(message.time, now) {
            return false;
        }

        self.position = message.position();
        self.orientation = message.orientation();
        self.linear_velocity = message.linear_velocity();
        self.angular_velocity = message.angular_velocity();
        true
    }

    /// Record a host-replicated pose (position, yaw/pitch/roll in degrees)
    /// stamped with the local clock.
    pub fn apply_network_transform(
        &mut self,
        position: Vector3<f64>,
        orientation: Vector3<f64>,
        now: i32,
    ) -> bool {
        if !self.accept_time(now, now) {
            return false;
        }

        self.position = position;
        self.orientation = orientation;
        true
    }

    /// Publish the local pose and velocities (authoritative side).
    pub fn publish(
        &mut self,
        transform: &BodyTransform,
        linear_velocity: Vector3<f64>,
        angular_velocity: Vector3<f64>,
    ) {
        self.position = transform.position;
        self.orientation = transform.orientation_degrees();
        self.linear_velocity = linear_velocity;
        self.angular_velocity = angular_velocity;
    }

    /// Velocities as the six replicated scalars (linear xyz, angular xyz).
    pub fn velocity_fields(&self) -> [f32; 6] {
        let l = self.linear_velocity;
        let a = self.angular_velocity;
        [
            l.x as f32, l.y as f32, l.z as f32, a.x as f32, a.y as f32, a.z as f32,
        ]
    }

    /// Overwrite one replicated velocity scalar, indexed as in [`Self::velocity_fields`].
    pub fn set_velocity_field(&mut self, index: usize, value: f32) {
        let value = value as f64;
        match index {
            0..=2 => self.linear_velocity[index] = value,
            3..=5 => self.angular_velocity[index - 3] = value,
            _ => {}
        }
    }

    /// Predicted transform at local time `now`, or `None` before any snapshot.
    ///
    /// The baseline is rebuilt from the snapshot pose on the first call after a
    /// snapshot was accepted. Elapsed time never runs backwards past the
    /// baseline.
    pub fn extrapolate(&mut self, now: i32) -> Option<BodyTransform> {
        if !self.has_snapshot {
            return None;
        }

        if self.baseline_stale {
            self.initial_transform =
                BodyTransform::from_position_orientation(self.position, self.orientation);
            self.baseline_stale = false;
        }

        let elapsed_ms =
            (i64::from(now) - i64::from(self.time_delta) - i64::from(self.time)).max(0);
        let predicted = integrate_transform(
            &self.initial_transform,
            &self.linear_velocity,
            &self.angular_velocity,
            elapsed_ms as f64 / 1000.0,
        );

        self.predicted_transform = predicted;
        Some(predicted)
    }

    fn accept_time(&mut self, time: i32, now: i32) -> bool {
        if !self.is_newer(time) {
            trace!("Discarding snapshot at {} (have {})", time, self.time);
            return false;
        }

        self.last_received_time = self.time;
        self.time = time;
        self.time_delta = (i64::from(now) - i64::from(time)).clamp(0, i64::from(i32::MAX)) as i32;
        self.has_snapshot = true;
        self.baseline_stale = true;
        true
    }
}
