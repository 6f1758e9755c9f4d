use bevy::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use super::outbox::Delivery;
use crate::components::PersistentId;

/// Per-vehicle fields replicated outside the explicit RPC path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReplicatedField {
    LinearVelocityX,
    LinearVelocityY,
    LinearVelocityZ,
    AngularVelocityX,
    AngularVelocityY,
    AngularVelocityZ,
    LockState,
    EngineOn,
    Exploded,
    /// One of the four persistent id parts
    PersistentIdPart(u8),
}

impl ReplicatedField {
    /// The six velocity scalars in (linear xyz, angular xyz) order
    pub const VELOCITY: [ReplicatedField; 6] = [
        ReplicatedField::LinearVelocityX,
        ReplicatedField::LinearVelocityY,
        ReplicatedField::LinearVelocityZ,
        ReplicatedField::AngularVelocityX,
        ReplicatedField::AngularVelocityY,
        ReplicatedField::AngularVelocityZ,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f32),
    Int(i32),
    Bool(bool),
}

impl FieldValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldUpdate {
    pub vehicle: PersistentId,
    pub field: ReplicatedField,
    pub value: FieldValue,
}

/// Decides when staged fields leave the queue and how they travel.
pub trait ReplicationPolicy: Send + Sync + Debug {
    fn flush_due(&self, tick: u64) -> bool;
    fn delivery(&self) -> Delivery;
}

/// Flush every `interval` ticks.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    pub interval: u32,
    pub delivery: Delivery,
}

impl FixedInterval {
    pub fn every(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            delivery: Delivery::Unreliable,
        }
    }
}

impl ReplicationPolicy for FixedInterval {
    fn flush_due(&self, tick: u64) -> bool {
        tick % u64::from(self.interval.max(1)) == 0
    }

    fn delivery(&self) -> Delivery {
        self.delivery
    }
}

/// Everything released by one flush.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationBatch {
    pub updates: Vec<FieldUpdate>,
    /// Vehicles whose dependants (seating, attachments) should refresh
    pub dirty: Vec<PersistentId>,
    pub delivery: Delivery,
}

/// Outbound queue of replicated fields.
///
/// Staging a field twice before a flush keeps only the latest value.
#[derive(Resource, Debug)]
pub struct ReplicationOutbox {
    staged: BTreeMap<(PersistentId, ReplicatedField), FieldValue>,
    dirty: BTreeSet<PersistentId>,
    policy: Box<dyn ReplicationPolicy>,
}

impl Default for ReplicationOutbox {
    fn default() -> Self {
        Self::with_policy(FixedInterval::every(1))
    }
}

impl ReplicationOutbox {
    pub fn with_policy(policy: impl ReplicationPolicy + 'static) -> Self {
        Self {
            staged: BTreeMap::new(),
            dirty: BTreeSet::new(),
            policy: Box::new(policy),
        }
    }

    pub fn stage(&mut self, vehicle: PersistentId, field: ReplicatedField, value: FieldValue) {
        self.staged.insert((vehicle, field), value);
    }

    pub fn mark_dirty(&mut self, vehicle: PersistentId) {
        self.dirty.insert(vehicle);
    }

    pub fn is_dirty(&self, vehicle: PersistentId) -> bool {
        self.dirty.contains(&vehicle)
    }

    pub fn staged(&self, vehicle: PersistentId, field: ReplicatedField) -> Option<FieldValue> {
        self.staged.get(&(vehicle, field)).copied()
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Release staged fields if the policy says this tick is due.
    pub fn flush(&mut self, tick: u64) -> Option<ReplicationBatch> {
        if !self.policy.flush_due(tick) || (self.staged.is_empty() && self.dirty.is_empty()) {
            return None;
        }
        Some(self.drain())
    }

    /// Release everything regardless of the policy.
    pub fn drain(&mut self) -> ReplicationBatch {
        let updates = std::mem::take(&mut self.staged)
            .into_iter()
            .map(|((vehicle, field), value)| FieldUpdate {
                vehicle,
                field,
                value,
            })
            .collect();
        let dirty = std::mem::take(&mut self.dirty).into_iter().collect();

        ReplicationBatch {
            updates,
            dirty,
            delivery: self.policy.delivery(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CAR: PersistentId = PersistentId([1, 0, 0, 0]);

    #[test]
    fn test_latest_staged_value_wins() {
        let mut outbox = ReplicationOutbox::default();
        outbox.stage(CAR, ReplicatedField::EngineOn, FieldValue::Bool(true));
        outbox.stage(CAR, ReplicatedField::EngineOn, FieldValue::Bool(false));

        let batch = outbox.drain();
        assert_eq!(
            batch.updates,
            vec![FieldUpdate {
                vehicle: CAR,
                field: ReplicatedField::EngineOn,
                value: FieldValue::Bool(false),
            }]
        );
        assert_eq!(outbox.staged_count(), 0);
    }

    #[test]
    fn test_policy_gates_flush() {
        let mut outbox = ReplicationOutbox::with_policy(FixedInterval::every(3));
        outbox.stage(CAR, ReplicatedField::LockState, FieldValue::Int(2));
        outbox.mark_dirty(CAR);

        assert!(outbox.flush(1).is_none());
        assert!(outbox.flush(2).is_none());

        let batch = outbox.flush(3).unwrap();
        assert_eq!(batch.updates.len(), 1);
        assert_eq!(batch.dirty, vec![CAR]);
        assert!(!outbox.is_dirty(CAR));
    }

    #[test]
    fn test_empty_queue_does_not_flush() {
        let mut outbox = ReplicationOutbox::default();
        assert!(outbox.flush(0).is_none());
    }
}
