pub mod config;
mod errors;
mod time;

pub use config::simulation::{SimulationConfig, SimulationConfigBuilder};
pub use errors::{ConfigError, Result, VehicleError};
pub use time::{MonotonicClock, SessionClock, SystemClock};
