//! Random log stream suffixes.

use uuid::Uuid;

use crate::ports::IdGenerator;

/// Produces random v4 UUIDs.
#[derive(Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn stream_suffix(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
