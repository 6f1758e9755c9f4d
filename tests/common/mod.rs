#![allow(dead_code)]

mod assertions;
mod helpers;
mod test_app;

// Re-export
pub use assertions::{assert_position_eq, assert_transform_valid, assert_vehicle_valid};

pub use helpers::*;

pub use test_app::{TestApp, TestAppBuilder, TestSession};
