mod vehicle;

pub use vehicle::{SimpleBodyPlugin, VehicleSet, VehicleSyncPlugin};
