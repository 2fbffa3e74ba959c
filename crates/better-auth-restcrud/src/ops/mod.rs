// Per-entity operations: the fast lookup paths preferred over the generic
// list-and-scan fallback, plus create-side conflict checks.

pub mod account;
pub mod session;
pub mod user;
pub mod verification;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Read the expiry timestamp off a record, tolerating both field spellings.
pub(crate) fn parse_expiry(record: &Value) -> Option<DateTime<Utc>> {
    record
        .get("expiresAt")
        .or_else(|| record.get("expires_at"))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Read the primary key off a record.
pub(crate) fn record_id(record: &Value) -> Option<String> {
    record
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
