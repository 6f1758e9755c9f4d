use serde::{Deserialize, Serialize};

use crate::resources::{Result, VehicleError};

/// Seat index of the driver
pub const DRIVER_SEAT: usize = 0;

/// Network participant (player connection) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u32);

impl ParticipantId {
    /// Identity used by the dedicated server node
    pub const SERVER: ParticipantId = ParticipantId(0);
}

/// Who sits in a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupant {
    /// Player-controlled, owned by a network participant
    Human(ParticipantId),
    /// Locally simulated agent with no owning participant
    Ai(u32),
}

impl Occupant {
    pub fn participant(&self) -> Option<ParticipantId> {
        match self {
            Occupant::Human(id) => Some(*id),
            Occupant::Ai(_) => None,
        }
    }
}

/// Ordered seat → occupant bindings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrewRoster {
    seats: Vec<Option<Occupant>>,
}

impl CrewRoster {
    pub fn with_seats(count: usize) -> Self {
        Self {
            seats: vec![None; count],
        }
    }

    pub fn crew_size(&self) -> usize {
        self.seats.len()
    }

    /// Occupant of `seat`, `None` if the seat is empty or out of range.
    pub fn crew_member(&self, seat: usize) -> Option<Occupant> {
        self.seats.get(seat).copied().flatten()
    }

    pub fn crew_member_index(&self, occupant: &Occupant) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| seat.as_ref() == Some(occupant))
    }

    pub fn driver(&self) -> Option<Occupant> {
        self.crew_member(DRIVER_SEAT)
    }

    pub fn crew_get_in(&mut self, occupant: Occupant, seat: usize) -> Result<()> {
        let crew_size = self.crew_size();
        let slot = self
            .seats
            .get_mut(seat)
            .ok_or(VehicleError::SeatOutOfRange { seat, crew_size })?;

        if slot.is_some() {
            return Err(VehicleError::SeatOccupied(seat));
        }
        *slot = Some(occupant);
        Ok(())
    }

    pub fn crew_get_out(&mut self, seat: usize) -> Result<Occupant> {
        let crew_size = self.crew_size();
        let slot = self
            .seats
            .get_mut(seat)
            .ok_or(VehicleError::SeatOutOfRange { seat, crew_size })?;

        slot.take().ok_or(VehicleError::SeatEmpty(seat))
    }

    /// All seated occupants in seat order
    pub fn occupants(&self) -> impl Iterator<Item = Occupant> + '_ {
        self.seats.iter().filter_map(|seat| *seat)
    }

    pub fn is_empty(&self) -> bool {
        self.seats.iter().all(Option::is_none)
    }
}
