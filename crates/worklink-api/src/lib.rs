pub mod applications;
pub mod auth;
pub mod error;
pub mod follows;
pub mod jobs;
pub mod mail;
pub mod media;
pub mod middleware;
pub mod otp;
pub mod policy;
pub mod posts;
pub mod profile;
pub mod state;
pub mod token;

use tracing::warn;

/// Parse an application-written RFC 3339 timestamp, falling back to the
/// SQLite "YYYY-MM-DD HH:MM:SS" shape for rows that predate the writer.
pub(crate) fn parse_ts(raw: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            chrono::DateTime::default()
        })
}
