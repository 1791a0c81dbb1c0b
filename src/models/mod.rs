//! Persistence models for the user management service.
//!
//! Row types map to database tables via `sqlx::FromRow`; the `*Out` types are
//! the camelCase JSON views returned by the API.

pub mod sys_log;
pub mod user;

/// Timestamps in API payloads use `YYYY-MM-DD HH:MM:SS`.
pub mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(FORMAT))
    }
}
