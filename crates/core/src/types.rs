use chrono::{DateTime, Utc};

/// All timestamps are stored and compared in UTC.
pub type Timestamp = DateTime<Utc>;

/// Second-precision ISO-8601 layout used in notification payloads.
pub const ISO_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn isotime(ts: &Timestamp) -> String {
    ts.format(ISO_TIME_FORMAT).to_string()
}
