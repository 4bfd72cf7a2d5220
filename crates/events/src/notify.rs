use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::Priority;
use crate::error::NotifyError;

/// Capability to emit a notification at a given severity.
///
/// Implemented by [`Notifier`](crate::Notifier) for real transports and by
/// `testing::CapturingNotifier` for tests. The proxy layer only ever holds
/// an `Arc<dyn Notify>`.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn emit(
        &self,
        priority: Priority,
        event_type: &str,
        payload: Value,
    ) -> Result<(), NotifyError>;

    async fn info(&self, event_type: &str, payload: Value) -> Result<(), NotifyError> {
        self.emit(Priority::Info, event_type, payload).await
    }

    async fn warn(&self, event_type: &str, payload: Value) -> Result<(), NotifyError> {
        self.emit(Priority::Warn, event_type, payload).await
    }

    async fn error(&self, event_type: &str, payload: Value) -> Result<(), NotifyError> {
        self.emit(Priority::Error, event_type, payload).await
    }
}
