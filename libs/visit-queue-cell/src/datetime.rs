//! The remote system's date-time representation:
//! millisecond precision with a numeric offset, e.g. `2024-03-01T08:00:00.000+0000`.

use chrono::{DateTime, Utc};

use crate::error::VisitQueueError;

pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

pub fn to_canonical_string(instant: &DateTime<Utc>) -> String {
    instant.format(CANONICAL_FORMAT).to_string()
}

/// Parses only the canonical representation; anything else is rejected.
pub fn parse_canonical_strict(value: &str) -> Result<DateTime<Utc>, VisitQueueError> {
    DateTime::parse_from_str(value, CANONICAL_FORMAT)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| VisitQueueError::ValidationError(format!("Invalid date-time '{}': {}", value, e)))
}

/// Formats `instant` and checks the result parses back to the same instant.
pub fn canonical_timestamp(instant: &DateTime<Utc>) -> Result<String, VisitQueueError> {
    let formatted = to_canonical_string(instant);
    let reparsed = parse_canonical_strict(&formatted)?;

    if to_canonical_string(&reparsed) != formatted {
        return Err(VisitQueueError::ValidationError(format!(
            "Date-time '{}' does not survive a round trip",
            formatted
        )));
    }

    Ok(formatted)
}
