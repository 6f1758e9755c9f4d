use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Session-independent vehicle identity, replicated as four 32-bit parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct PersistentId(pub [u32; 4]);

impl PersistentId {
    /// Number of replicated parts
    pub const PARTS: usize = 4;

    pub fn generate() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        let bits = uuid.as_u128();
        Self([
            (bits >> 96) as u32,
            (bits >> 64) as u32,
            (bits >> 32) as u32,
            bits as u32,
        ])
    }

    pub fn as_uuid(&self) -> Uuid {
        let [a, b, c, d] = self.0.map(u128::from);
        Uuid::from_u128(a << 96 | b << 64 | c << 32 | d)
    }

    pub fn part(&self, index: usize) -> Option<u32> {
        self.0.get(index).copied()
    }

    /// Overwrite one part. Returns `false` for an index past [`Self::PARTS`].
    pub fn set_part(&mut self, index: usize, value: u32) -> bool {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.0 == [0; 4]
    }
}

impl fmt::Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_uuid())
    }
}
