//! Vehicle RPC bodies and their fixed-size wire encoding.
//!
//! Bodies are encoded with bincode's legacy configuration (fixed-width
//! little-endian integers and floats, no length prefixes for arrays). Decoding
//! checks the exact body length before parsing, so a message is either
//! applied whole or rejected.

use nalgebra::Vector3;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::components::{ControllerInput, SyncState};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unknown RPC kind: {0}")]
    UnknownKind(u8),
    #[error("Wrong body length for {kind:?}: expected {expected} bytes, got {actual}")]
    Length {
        kind: RpcKind,
        expected: usize,
        actual: usize,
    },
    #[error("Non-finite value in {0:?} body")]
    NonFinite(RpcKind),
    #[error("Failed to decode body: {0}")]
    Bincode(#[from] bincode::Error),
}

#[derive(Error, Debug)]
#[error("Failed to encode body: {0}")]
pub struct EncodeError(#[from] bincode::Error);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RpcKind {
    /// Authoritative client pose and velocity snapshot
    ClientSync = 1,
    /// Driver control input
    ControllerSync = 2,
    /// Explosion notification
    Explode = 3,
}

impl RpcKind {
    /// Exact encoded body length
    pub const fn body_len(self) -> usize {
        match self {
            RpcKind::ClientSync => 4 + 4 * 3 * 4,
            RpcKind::ControllerSync => 3 * 4,
            RpcKind::Explode => 4,
        }
    }
}

impl TryFrom<u8> for RpcKind {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RpcKind::ClientSync),
            2 => Ok(RpcKind::ControllerSync),
            3 => Ok(RpcKind::Explode),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

/// Snapshot sent by the authoritative client in `Client` mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientSyncMessage {
    /// Sender clock at send [ms]
    pub time: i32,
    /// World position [m]
    pub position: [f32; 3],
    /// Yaw/pitch/roll [deg]
    pub orientation: [f32; 3],
    /// World linear velocity [m/s]
    pub linear_velocity: [f32; 3],
    /// World angular velocity [rad/s]
    pub angular_velocity: [f32; 3],
}

impl ClientSyncMessage {
    pub fn new(
        time: i32,
        position: Vector3<f64>,
        orientation: Vector3<f64>,
        linear_velocity: Vector3<f64>,
        angular_velocity: Vector3<f64>,
    ) -> Self {
        Self {
            time,
            position: to_wire(&position),
            orientation: to_wire(&orientation),
            linear_velocity: to_wire(&linear_velocity),
            angular_velocity: to_wire(&angular_velocity),
        }
    }

    /// Snapshot of the pose and velocities currently published in `state`.
    pub fn from_state(time: i32, state: &SyncState) -> Self {
        Self::new(
            time,
            state.position,
            state.orientation,
            state.linear_velocity,
            state.angular_velocity,
        )
    }

    pub fn position(&self) -> Vector3<f64> {
        from_wire(&self.position)
    }

    pub fn orientation(&self) -> Vector3<f64> {
        from_wire(&self.orientation)
    }

    pub fn linear_velocity(&self) -> Vector3<f64> {
        from_wire(&self.linear_velocity)
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        from_wire(&self.angular_velocity)
    }

    fn is_finite(&self) -> bool {
        [
            self.position,
            self.orientation,
            self.linear_velocity,
            self.angular_velocity,
        ]
        .iter()
        .flatten()
        .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplodeMessage {
    /// Host-defined damage cause
    pub cause: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleRpc {
    ClientSync(ClientSyncMessage),
    ControllerSync(ControllerInput),
    Explode(ExplodeMessage),
}

impl VehicleRpc {
    pub fn kind(&self) -> RpcKind {
        match self {
            VehicleRpc::ClientSync(_) => RpcKind::ClientSync,
            VehicleRpc::ControllerSync(_) => RpcKind::ControllerSync,
            VehicleRpc::Explode(_) => RpcKind::Explode,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let body = match self {
            VehicleRpc::ClientSync(message) => bincode::serialize(message)?,
            VehicleRpc::ControllerSync(input) => bincode::serialize(input)?,
            VehicleRpc::Explode(message) => bincode::serialize(message)?,
        };
        Ok(body)
    }

    /// Decode a body received with RPC id `kind`.
    pub fn decode(kind: u8, body: &[u8]) -> Result<Self, DecodeError> {
        let kind = RpcKind::try_from(kind)?;
        match kind {
            RpcKind::ClientSync => {
                let message: ClientSyncMessage = decode_exact(kind, body)?;
                if !message.is_finite() {
                    return Err(DecodeError::NonFinite(kind));
                }
                Ok(VehicleRpc::ClientSync(message))
            }
            RpcKind::ControllerSync => {
                let input: ControllerInput = decode_exact(kind, body)?;
                if ![input.throttle, input.brake, input.steering]
                    .iter()
                    .all(|v| v.is_finite())
                {
                    return Err(DecodeError::NonFinite(kind));
                }
                Ok(VehicleRpc::ControllerSync(input))
            }
            RpcKind::Explode => Ok(VehicleRpc::Explode(decode_exact(kind, body)?)),
        }
    }
}

fn decode_exact<T: DeserializeOwned>(kind: RpcKind, body: &[u8]) -> Result<T, DecodeError> {
    let expected = kind.body_len();
    if body.len() != expected {
        return Err(DecodeError::Length {
            kind,
            expected,
            actual: body.len(),
        });
    }
    Ok(bincode::deserialize(body)?)
}

fn to_wire(v: &Vector3<f64>) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

fn from_wire(v: &[f32; 3]) -> Vector3<f64> {
    Vector3::new(v[0] as f64, v[1] as f64, v[2] as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ClientSyncMessage {
        ClientSyncMessage::new(
            1_234,
            Vector3::new(100.0, 2.5, -40.0),
            Vector3::new(90.0, 0.0, -5.0),
            Vector3::new(3.0, 0.0, 12.0),
            Vector3::new(0.0, 0.25, 0.0),
        )
    }

    #[test]
    fn test_client_sync_layout() {
        let body = VehicleRpc::ClientSync(sample()).encode().unwrap();

        assert_eq!(body.len(), 52);
        assert_eq!(&body[0..4], &1_234i32.to_le_bytes());
        assert_eq!(&body[4..8], &100.0f32.to_le_bytes());
        assert_eq!(&body[48..52], &0.0f32.to_le_bytes());
    }

    #[test]
    fn test_decode_matches_encoded() {
        let rpc = VehicleRpc::ClientSync(sample());
        let body = rpc.encode().unwrap();

        let decoded = VehicleRpc::decode(RpcKind::ClientSync as u8, &body).unwrap();
        assert_eq!(decoded, rpc);
    }

    #[test]
    fn test_truncated_body_is_rejected() {
        let body = VehicleRpc::ClientSync(sample()).encode().unwrap();

        let result = VehicleRpc::decode(RpcKind::ClientSync as u8, &body[..51]);
        assert!(matches!(
            result,
            Err(DecodeError::Length {
                expected: 52,
                actual: 51,
                ..
            })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut body = VehicleRpc::ControllerSync(ControllerInput::new(1.0, 0.0, 0.5))
            .encode()
            .unwrap();
        body.push(0);

        assert!(matches!(
            VehicleRpc::decode(RpcKind::ControllerSync as u8, &body),
            Err(DecodeError::Length { .. })
        ));
    }

    #[test]
    fn test_non_finite_snapshot_is_rejected() {
        let mut message = sample();
        message.linear_velocity[1] = f32::NAN;
        let body = VehicleRpc::ClientSync(message).encode().unwrap();

        assert!(matches!(
            VehicleRpc::decode(RpcKind::ClientSync as u8, &body),
            Err(DecodeError::NonFinite(RpcKind::ClientSync))
        ));
    }

    #[test]
    fn test_unknown_kind() {
        assert!(matches!(
            VehicleRpc::decode(42, &[]),
            Err(DecodeError::UnknownKind(42))
        ));
    }
}
