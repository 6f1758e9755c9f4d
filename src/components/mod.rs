mod controller;
mod crew;
mod identity;
mod layout;
mod lock;
mod spatial;
mod status;
mod sync;
mod vehicle;

pub use controller::ControllerInput;
pub use crew::{CrewRoster, Occupant, ParticipantId, DRIVER_SEAT};
pub use identity::PersistentId;
pub use layout::{AxleLayout, VehicleLayout, WheelLayout};
pub use lock::{CarKey, LockState, LockStateMachine};
pub use spatial::{basis_from_ypr, ypr_from_basis, BodyTransform};
pub use status::{Fluid, FluidTank, VehicleStatus};
pub use sync::{NetworkMode, SyncState};
pub use vehicle::{CarDoorState, Vehicle};
