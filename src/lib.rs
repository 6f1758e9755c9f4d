//! Networked wheeled-vehicle simulation.
//!
//! Each tick a vehicle either owns its physics (reads the rigid body, steps its
//! axles and applies one accumulated impulse) or extrapolates from the last
//! accepted network snapshot and steers the body toward the predicted pose.
//! Who owns physics is decided per tick from the session role, the vehicle's
//! [`NetworkMode`](components::NetworkMode) and the seated driver.

pub mod components;
pub mod network;
pub mod physics;
pub mod plugins;
pub mod resources;
pub mod systems;

pub mod prelude {
    pub use crate::components::{
        BodyTransform, CarDoorState, CarKey, ControllerInput, CrewRoster, Fluid, LockState,
        LockStateMachine, NetworkMode, Occupant, ParticipantId, PersistentId, SyncState, Vehicle,
        VehicleLayout, VehicleStatus,
    };
    pub use crate::network::{
        resolve_authority, Authority, ClientSyncMessage, Delivery, NetworkOutbox, ReplicatedField,
        ReplicationOutbox, SessionRole, VehicleRpc,
    };
    pub use crate::physics::{
        integrate_transform, Axle, AxleSimulator, BodyState, MassProperties, RigidBody,
        SimpleRigidBody,
    };
    pub use crate::plugins::{SimpleBodyPlugin, VehicleSet, VehicleSyncPlugin};
    pub use crate::resources::{MonotonicClock, SessionClock, SimulationConfig};
    pub use crate::systems::{TickContext, VehicleBehaviour};
}
