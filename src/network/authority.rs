use serde::{Deserialize, Serialize};

use crate::components::{NetworkMode, Occupant, ParticipantId};

/// Role of this node in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// Single-player, no network
    Offline,
    /// Dedicated or listen server
    Server,
    /// Remote client, identified by its participant id
    Client(ParticipantId),
}

impl SessionRole {
    pub fn local_participant(&self) -> Option<ParticipantId> {
        match self {
            SessionRole::Offline => None,
            SessionRole::Server => Some(ParticipantId::SERVER),
            SessionRole::Client(id) => Some(*id),
        }
    }

    pub fn is_networked(&self) -> bool {
        !matches!(self, SessionRole::Offline)
    }

    pub fn is_server(&self) -> bool {
        matches!(self, SessionRole::Server)
    }

    pub fn is_client(&self) -> bool {
        matches!(self, SessionRole::Client(_))
    }

    /// Offline sessions act as their own server
    pub fn is_host(&self) -> bool {
        matches!(self, SessionRole::Offline | SessionRole::Server)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Authority {
    /// This node simulates the body and publishes its state
    Authoritative,
    /// This node extrapolates from received snapshots
    NotAuthoritative,
}

impl Authority {
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Authority::Authoritative)
    }
}

/// Decide whether this node owns physics for a vehicle this tick.
///
/// # Arguments
/// - `role`: Role of the local node.
/// - `mode`: The vehicle's synchronization mode.
/// - `driver`: Occupant of the driver seat, if any.
pub fn resolve_authority(role: SessionRole, mode: NetworkMode, driver: Option<Occupant>) -> Authority {
    let authoritative = match role {
        SessionRole::Offline => true,
        SessionRole::Client(local) => {
            driver == Some(Occupant::Human(local)) && mode != NetworkMode::ServerOnly
        }
        SessionRole::Server => mode != NetworkMode::Client,
    };

    if authoritative {
        Authority::Authoritative
    } else {
        Authority::NotAuthoritative
    }
}
