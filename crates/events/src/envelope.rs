//! Notification envelope and severity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NotifyError;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Severity attached to every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Info,
    Warn,
    Error,
}

impl Priority {
    /// Every priority, in the order broker queues are declared.
    pub const ALL: [Priority; 3] = [Priority::Info, Priority::Warn, Priority::Error];

    /// Wire name, e.g. `"INFO"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Lowercase form used in routing keys and addresses.
    pub fn routing_suffix(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(NotifyError::InvalidPriority(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// The envelope handed to a strategy. Built once per emit and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique token (UUID v4).
    pub message_id: String,

    /// Identifies the emitting service.
    pub publisher_id: String,

    /// Dot-separated event name, e.g. `"image.create"`.
    pub event_type: String,

    pub priority: Priority,

    pub payload: serde_json::Value,

    /// When the envelope was built (UTC, RFC 3339 on the wire).
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        publisher_id: impl Into<String>,
        priority: Priority,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            publisher_id: publisher_id.into(),
            event_type: event_type.into(),
            priority,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// JSON wire body.
    pub fn to_json(&self) -> Result<Vec<u8>, NotifyError> {
        Ok(serde_json::to_vec(self)?)
    }
}
