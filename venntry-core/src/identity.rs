//! Identity types for catalog entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Monetary amount in minor units (cents).
pub type Cents = i64;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Current UTC time, truncated to microseconds so values survive a
/// round-trip through a `timestamptz` column unchanged.
pub fn now() -> Timestamp {
    let ts = Utc::now();
    let micros = ts.timestamp_micros();
    DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or(ts)
}
