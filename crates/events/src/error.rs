use crate::config::StrategyKind;

/// Failure reported by a transport client.
///
/// Only [`TransportError::is_recoverable`] failures are eligible for the
/// durable broker's reconnect loop; everything else is treated as a
/// configuration or programming fault and surfaces immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport classified the failure as a connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// Anything the transport did not classify.
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the failure is transient and worth a reconnect.
    ///
    /// Some protocol libraries report a timeout waiting for a response
    /// outside their connection-error classes, so unclassified failures
    /// that mention a timeout are recoverable too.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) => true,
            Self::Other(msg) => msg.to_ascii_lowercase().contains("timeout"),
        }
    }
}

/// Error type for notifier construction and emission.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The configured strategy identifier names no known strategy.
    #[error("Invalid notifier strategy: {0}")]
    InvalidStrategy(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    /// A configuration variable could not be parsed.
    #[error("Invalid value {value:?} for {var}")]
    Config { var: &'static str, value: String },

    /// The strategy needs a transport client and none was supplied.
    #[error("No transport available for the {} strategy", .0.name())]
    MissingTransport(StrategyKind),

    /// An unrecoverable transport failure, propagated unmodified.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to serialize notification: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_and_timeout_are_recoverable() {
        assert!(TransportError::Connection("refused".into()).is_recoverable());
        assert!(TransportError::Timeout("read".into()).is_recoverable());
    }

    #[test]
    fn unclassified_errors_are_recoverable_only_when_mentioning_timeout() {
        assert!(TransportError::Other("foo timeout foo".into()).is_recoverable());
        assert!(TransportError::Other("Socket TIMEOUT".into()).is_recoverable());
        assert!(!TransportError::Other("meow".into()).is_recoverable());
    }

    #[test]
    fn invalid_strategy_display() {
        let err = NotifyError::InvalidStrategy("invalid_notifier".into());
        assert_eq!(err.to_string(), "Invalid notifier strategy: invalid_notifier");
    }

    #[test]
    fn missing_transport_display_names_strategy() {
        let err = NotifyError::MissingTransport(StrategyKind::TopicBroker);
        assert_eq!(err.to_string(), "No transport available for the topic strategy");
    }
}
