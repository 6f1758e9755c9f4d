use serde::{Deserialize, Serialize};

use super::identity::PersistentId;

/// Door-lock readiness of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LockState {
    /// No key has ever been paired; lock requests are ignored
    #[default]
    NoLock,
    Unlocked,
    /// Lock requested, waiting for every door to close
    ReadyToLock,
    Locked,
}

impl LockState {
    /// Replicated integer form
    pub fn to_wire(self) -> i32 {
        match self {
            LockState::NoLock => 0,
            LockState::Unlocked => 1,
            LockState::ReadyToLock => 2,
            LockState::Locked => 3,
        }
    }

    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            0 => Some(LockState::NoLock),
            1 => Some(LockState::Unlocked),
            2 => Some(LockState::ReadyToLock),
            3 => Some(LockState::Locked),
            _ => None,
        }
    }
}

/// A key item, optionally paired to one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CarKey {
    paired_to: Option<PersistentId>,
}

impl CarKey {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn paired_to(vehicle: PersistentId) -> Self {
        Self {
            paired_to: Some(vehicle),
        }
    }

    pub fn is_paired_to(&self, vehicle: PersistentId) -> bool {
        self.paired_to == Some(vehicle)
    }

    pub fn pair(&mut self, vehicle: PersistentId) {
        self.paired_to = Some(vehicle);
    }
}

/// Lock/unlock transitions gated by key pairing.
///
/// Every method returns `true` when the state changed; callers mark the
/// vehicle dirty and stage the lock-state field on a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStateMachine {
    owner: PersistentId,
    state: LockState,
}

impl LockStateMachine {
    pub fn new(owner: PersistentId) -> Self {
        Self {
            owner,
            state: LockState::NoLock,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn set_owner(&mut self, owner: PersistentId) {
        self.owner = owner;
    }

    pub fn has_key(&self) -> bool {
        self.state != LockState::NoLock
    }

    /// Whether `key` opens this vehicle. Always false before any pairing.
    pub fn is_car_key(&self, key: &CarKey) -> bool {
        self.has_key() && key.is_paired_to(self.owner)
    }

    /// Pair `key` to this vehicle and leave `NoLock` for good.
    pub fn pair_key(&mut self, key: &mut CarKey) -> bool {
        key.pair(self.owner);
        self.transition(LockState::Unlocked)
    }

    /// Request a lock. `None` is an unconditional request (e.g. scripted);
    /// a key that does not belong to this vehicle is ignored.
    pub fn lock_car(&mut self, key: Option<&CarKey>) -> bool {
        if !self.accepts(key) {
            return false;
        }
        match self.state {
            LockState::Unlocked => self.transition(LockState::ReadyToLock),
            _ => false,
        }
    }

    pub fn unlock_car(&mut self, key: Option<&CarKey>) -> bool {
        if !self.accepts(key) {
            return false;
        }
        match self.state {
            LockState::ReadyToLock | LockState::Locked => self.transition(LockState::Unlocked),
            _ => false,
        }
    }

    /// A door opened: a pending lock is cancelled.
    pub fn on_door_opened(&mut self) -> bool {
        match self.state {
            LockState::ReadyToLock => self.transition(LockState::Unlocked),
            _ => false,
        }
    }

    /// Completes a pending lock once every door is closed.
    pub fn on_doors_observed(&mut self, all_closed: bool) -> bool {
        match self.state {
            LockState::ReadyToLock if all_closed => self.transition(LockState::Locked),
            _ => false,
        }
    }

    /// Apply a replicated state from the authority.
    pub fn apply_replicated(&mut self, state: LockState) -> bool {
        self.transition(state)
    }

    fn accepts(&self, key: Option<&CarKey>) -> bool {
        match key {
            None => true,
            Some(key) => key.is_paired_to(self.owner),
        }
    }

    fn transition(&mut self, next: LockState) -> bool {
        if self.state == next {
            return false;
        }
        self.state = next;
        true
    }
}
