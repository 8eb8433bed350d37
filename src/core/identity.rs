//! Identity Assignment
//!
//! Content-addressed record ids: SHA-256 over `"<type>:<casefolded name>"`,
//! hex encoded and truncated. No randomness and no clock, so the same
//! (type, name) pair gets the same id on every run and every machine.

use sha2::{Digest, Sha256};

use super::model::{EntityRecord, EntityType};
use super::text::casefold;

/// Length of generated ids in hex characters.
pub const DEFAULT_ID_LENGTH: usize = 16;

/// Bounds for a configured id length (SHA-256 hex digest is 64 chars).
pub const MIN_ID_LENGTH: usize = 8;
pub const MAX_ID_LENGTH: usize = 64;

/// Stable id for a (type, name) pair at the default length.
pub fn identify(entity_type: EntityType, name: &str) -> String {
    IdentityAssigner::default().identify(entity_type, name)
}

/// Computes ids and backfills them onto records.
#[derive(Debug, Clone, Copy)]
pub struct IdentityAssigner {
    length: usize,
}

impl Default for IdentityAssigner {
    fn default() -> Self {
        Self {
            length: DEFAULT_ID_LENGTH,
        }
    }
}

impl IdentityAssigner {
    pub fn with_length(length: usize) -> Self {
        Self {
            length: length.clamp(MIN_ID_LENGTH, MAX_ID_LENGTH),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn identify(&self, entity_type: EntityType, name: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(entity_type.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(casefold(name).as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..self.length].to_string()
    }

    /// Fill in a missing id. An id supplied by the author is kept verbatim.
    pub fn assign(&self, record: &mut EntityRecord) {
        if record.id.trim().is_empty() {
            record.id = self.identify(record.entity_type, &record.name);
        }
    }

    pub fn assign_all(&self, records: &mut [EntityRecord]) {
        for record in records.iter_mut() {
            self.assign(record);
        }
    }
}
