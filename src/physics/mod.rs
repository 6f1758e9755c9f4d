mod axle;
mod body;
mod integrator;
mod simple_body;

pub use axle::{Axle, AxleSimulator, WheelState};
pub use body::{BodyState, MassProperties, RigidBody};
pub use integrator::{estimated_orientation, integrate_transform, relative_rotation};
pub use simple_body::SimpleRigidBody;
