use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Fluid {
    Fuel,
    Oil,
    Brake,
    Coolant,
}

impl Fluid {
    pub const ALL: [Fluid; 4] = [Fluid::Fuel, Fluid::Oil, Fluid::Brake, Fluid::Coolant];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluidTank {
    /// Maximum amount [l]
    pub capacity: f64,
    /// Current amount [l]
    pub amount: f64,
}

/// Health, engine and consumables of a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleStatus {
    /// Normalized hull health in [0, 1]
    pub health: f64,
    pub engine_on: bool,
    pub exploded: bool,
    fluids: BTreeMap<Fluid, FluidTank>,
}

impl Default for VehicleStatus {
    fn default() -> Self {
        let fluids = [
            (Fluid::Fuel, 50.0),
            (Fluid::Oil, 4.0),
            (Fluid::Brake, 1.0),
            (Fluid::Coolant, 6.0),
        ]
        .into_iter()
        .map(|(fluid, capacity)| {
            (
                fluid,
                FluidTank {
                    capacity,
                    amount: capacity,
                },
            )
        })
        .collect();

        Self {
            health: 1.0,
            engine_on: false,
            exploded: false,
            fluids,
        }
    }
}

impl VehicleStatus {
    pub fn capacity(&self, fluid: Fluid) -> f64 {
        self.fluids.get(&fluid).map_or(0.0, |tank| tank.capacity)
    }

    pub fn amount(&self, fluid: Fluid) -> f64 {
        self.fluids.get(&fluid).map_or(0.0, |tank| tank.amount)
    }

    /// Fill level in [0, 1]
    pub fn fraction(&self, fluid: Fluid) -> f64 {
        match self.fluids.get(&fluid) {
            Some(tank) if tank.capacity > 0.0 => tank.amount / tank.capacity,
            _ => 0.0,
        }
    }

    /// Remove up to `amount`; returns what actually leaked.
    pub fn leak(&mut self, fluid: Fluid, amount: f64) -> f64 {
        let Some(tank) = self.fluids.get_mut(&fluid) else {
            return 0.0;
        };
        let leaked = amount.max(0.0).min(tank.amount);
        tank.amount -= leaked;
        leaked
    }

    pub fn leak_all(&mut self, fluid: Fluid) -> f64 {
        let amount = self.amount(fluid);
        self.leak(fluid, amount)
    }

    /// Add up to `amount`; returns what actually fit.
    pub fn fill(&mut self, fluid: Fluid, amount: f64) -> f64 {
        let Some(tank) = self.fluids.get_mut(&fluid) else {
            return 0.0;
        };
        let added = amount.max(0.0).min(tank.capacity - tank.amount);
        tank.amount += added;
        added
    }

    pub fn set_capacity(&mut self, fluid: Fluid, capacity: f64) {
        let tank = self.fluids.entry(fluid).or_insert(FluidTank {
            capacity: 0.0,
            amount: 0.0,
        });
        tank.capacity = capacity.max(0.0);
        tank.amount = tank.amount.min(tank.capacity);
    }
}
