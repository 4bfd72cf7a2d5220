//! Strategy that writes notifications to the application log.
//!
//! The default when no transport is configured. Each priority maps to the
//! matching `tracing` level and sending never fails.

use crate::envelope::{Notification, Priority};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogStrategy;

impl LogStrategy {
    pub fn send(&self, notification: &Notification) {
        let message = serde_json::to_string(notification)
            .unwrap_or_else(|_| notification.payload.to_string());

        match notification.priority {
            Priority::Info => tracing::info!(
                event_type = %notification.event_type,
                message_id = %notification.message_id,
                "{message}"
            ),
            Priority::Warn => tracing::warn!(
                event_type = %notification.event_type,
                message_id = %notification.message_id,
                "{message}"
            ),
            Priority::Error => tracing::error!(
                event_type = %notification.event_type,
                message_id = %notification.message_id,
                "{message}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use tracing::Level;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    /// Records the level of every event it sees.
    struct LevelCapture(Arc<Mutex<Vec<Level>>>);

    impl<S: tracing::Subscriber> Layer<S> for LevelCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    fn levels_for(priority: Priority) -> Vec<Level> {
        let levels = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(LevelCapture(levels.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let n = Notification::new("beacon", priority, "test_event", json!("test_message"));
            LogStrategy.send(&n);
        });

        let captured = levels.lock().unwrap().clone();
        captured
    }

    #[test]
    fn info_logs_at_info() {
        assert_eq!(levels_for(Priority::Info), vec![Level::INFO]);
    }

    #[test]
    fn warn_logs_at_warn() {
        assert_eq!(levels_for(Priority::Warn), vec![Level::WARN]);
    }

    #[test]
    fn error_logs_at_error() {
        assert_eq!(levels_for(Priority::Error), vec![Level::ERROR]);
    }
}
