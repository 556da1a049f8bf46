//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID kinds (e.g., using a
//! raw string where a job id is expected) and make the code more
//! self-documenting.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a queued job.
///
/// Generated on the enqueuing side (UUID v4) so a caller can start waiting
/// for the correlated result without a round-trip to the store. Collision is
/// treated as acceptable risk given the v4 id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random job id.
    pub fn generate() -> Self {
        JobId(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        JobId(id)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat-platform user id (snowflake).
///
/// The wire shape permits both number and string forms for `requested_by`;
/// some chat SDKs serialize snowflakes as strings to avoid precision loss in
/// JavaScript consumers, so deserialization accepts either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl UserId {
    /// Returns the raw snowflake value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(n: u64) -> Self {
        UserId(n)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(UserId(n)),
            Raw::Str(s) => s
                .parse::<u64>()
                .map(UserId)
                .map_err(|_| serde::de::Error::custom(format!("invalid user id: {s:?}"))),
        }
    }
}
