use bevy::prelude::*;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    components::NetworkMode,
    network::SessionRole,
    resources::errors::ConfigError,
};

/// Session-wide simulation settings shared by every vehicle on this node.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Role of this node in the session
    pub role: SessionRole,
    /// Synchronization mode assigned to vehicles at construction
    pub vehicle_sync: NetworkMode,
    /// Fixed simulation step [s]
    pub timestep: f64,
    /// Gravity in world space [m/s²]
    pub gravity: Vector3<f64>,
    /// Ticks between controller input sends from the driving client
    pub controller_send_interval: u32,
    /// Ticks between replication queue flushes
    pub replication_interval: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            role: SessionRole::Offline,
            vehicle_sync: NetworkMode::ServerOnly,
            timestep: 1.0 / 60.0,                   // 60 Hz
            gravity: Vector3::new(0.0, -9.81, 0.0), // y-up
            controller_send_interval: 1,
            replication_interval: 1,
        }
    }
}

impl SimulationConfig {
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
    }

    /// Parse a YAML document with the same keys as [`SimulationConfigBuilder`].
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let builder: SimulationConfigBuilder = serde_yaml::from_str(source)?;
        builder.build()
    }

    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }
}

#[derive(Default, Debug, Serialize, Clone, Deserialize)]
pub struct SimulationConfigBuilder {
    pub role: Option<SessionRole>,
    pub vehicle_sync: Option<NetworkMode>,
    pub timestep: Option<f64>,
    pub gravity: Option<[f64; 3]>,
    pub controller_send_interval: Option<u32>,
    pub replication_interval: Option<u32>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: SessionRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn vehicle_sync(mut self, mode: NetworkMode) -> Self {
        self.vehicle_sync = Some(mode);
        self
    }

    pub fn timestep(mut self, dt: f64) -> Self {
        self.timestep = Some(dt);
        self
    }

    pub fn gravity(mut self, gravity: [f64; 3]) -> Self {
        self.gravity = Some(gravity);
        self
    }

    pub fn controller_send_interval(mut self, ticks: u32) -> Self {
        self.controller_send_interval = Some(ticks);
        self
    }

    pub fn replication_interval(mut self, ticks: u32) -> Self {
        self.replication_interval = Some(ticks);
        self
    }

    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        let mut builder = Self::new();

        if let Some(role) = value.get("role") {
            builder = builder.role(serde_json::from_value(role.clone())?);
        }

        if let Some(mode) = value.get("vehicle_sync") {
            builder = builder.vehicle_sync(serde_json::from_value(mode.clone())?);
        }

        if let Some(timestep) = value.get("timestep").and_then(|v| v.as_f64()) {
            builder = builder.timestep(timestep);
        }

        if let Some(gravity) = value.get("gravity").and_then(|v| v.as_array()) {
            let components: Vec<f64> = gravity.iter().filter_map(|v| v.as_f64()).collect();
            match components.as_slice() {
                [x, y, z] => builder = builder.gravity([*x, *y, *z]),
                _ => {
                    return Err(ConfigError::InvalidParameter {
                        name: "gravity".to_string(),
                        value: value["gravity"].to_string(),
                    })
                }
            }
        }

        if let Some(ticks) = value
            .get("controller_send_interval")
            .and_then(|v| v.as_u64())
        {
            builder = builder.controller_send_interval(ticks as u32);
        }

        if let Some(ticks) = value.get("replication_interval").and_then(|v| v.as_u64()) {
            builder = builder.replication_interval(ticks as u32);
        }

        Ok(builder)
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let mut config = SimulationConfig::default();

        if let Some(role) = self.role {
            config.role = role;
        }
        if let Some(mode) = self.vehicle_sync {
            config.vehicle_sync = mode;
        }
        if let Some(timestep) = self.timestep {
            if !(timestep.is_finite() && timestep > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "timestep".to_string(),
                    value: timestep.to_string(),
                });
            }
            config.timestep = timestep;
        }
        if let Some([x, y, z]) = self.gravity {
            config.gravity = Vector3::new(x, y, z);
        }
        if let Some(ticks) = self.controller_send_interval {
            config.controller_send_interval = ticks.max(1);
        }
        if let Some(ticks) = self.replication_interval {
            config.replication_interval = ticks.max(1);
        }

        Ok(config)
    }
}
