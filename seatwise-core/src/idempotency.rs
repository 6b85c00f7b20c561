use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_KEY_LENGTH: usize = 255;

/// A previously produced response, replayed verbatim for the same idempotency key.
///
/// `body` is the exact serialized payload; it is never re-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status_code: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub method: String,
    pub path: String,
    pub response: StoredResponse,
    pub user_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of a first-writer-wins insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(IdempotencyRecord),
    /// Another writer got there first; its record is the answer.
    Existing(IdempotencyRecord),
}

impl InsertOutcome {
    pub fn into_record(self) -> IdempotencyRecord {
        match self {
            InsertOutcome::Inserted(r) | InsertOutcome::Existing(r) => r,
        }
    }
}
