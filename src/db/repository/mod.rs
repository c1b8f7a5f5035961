//! Repository layer — entity-scoped database operations.
//!
//! One sub-module per entity. Every operation is a single auto-committed
//! statement; cascades are handled by the schema's foreign keys.

mod chat_message;
mod medication;
mod note;
mod patient;

pub use chat_message::*;
pub use medication::*;
pub use note::*;
pub use patient::*;

use chrono::NaiveDateTime;

use super::DatabaseError;

/// Timestamps are stored as `NaiveDateTime::to_string()` text
/// ("%Y-%m-%d %H:%M:%S" with an optional fractional part).
pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {s:?}: {e}")))
}

pub(crate) fn parse_uuid(s: &str) -> Result<uuid::Uuid, DatabaseError> {
    uuid::Uuid::parse_str(s)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad uuid {s:?}: {e}")))
}
