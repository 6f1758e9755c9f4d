use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid parameter '{name}' with value '{value}'")]
    InvalidParameter { name: String, value: String },
    #[error("Invalid vehicle configuration: {0}")]
    ValidationError(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VehicleError {
    #[error("Seat {seat} out of range (crew size {crew_size})")]
    SeatOutOfRange { seat: usize, crew_size: usize },
    #[error("Seat {0} is already occupied")]
    SeatOccupied(usize),
    #[error("Seat {0} is empty")]
    SeatEmpty(usize),
    #[error("Wheel {index} out of range (vehicle has {count} wheels)")]
    WheelOutOfRange { index: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, VehicleError>;
