//! Task lifecycle notifications.
//!
//! Each transition runs on the task first. A transition that took effect
//! is published at info; a rejected one publishes the same event type at
//! error with the failure text. `run` is the exception: it announces the
//! hand-off before the executor is called, whatever the executor then does.

use beacon_core::{CoreError, Resource, Task, TaskExecutor};

use crate::entity::EntityProxy;
use crate::error::ApiResult;
use crate::report_failure;

impl EntityProxy<Task> {
    /// Publish `task.run`, then hand the task to `executor`.
    pub async fn run(&self, executor: &dyn TaskExecutor) -> ApiResult<()> {
        self.notifier
            .info("task.run", self.entity.notification_payload())
            .await?;
        self.entity.run(executor).await?;
        Ok(())
    }

    /// `pending` → `processing`, publishing `task.processing`.
    pub async fn begin_processing(&mut self) -> ApiResult<()> {
        let outcome = self.entity.begin_processing();
        self.publish("task.processing", outcome).await
    }

    /// `processing` → `completed`, publishing `task.success`.
    pub async fn succeed(&mut self, result: Option<serde_json::Value>) -> ApiResult<()> {
        let outcome = self.entity.succeed(result);
        self.publish("task.success", outcome).await
    }

    /// `→ failed`, publishing `task.failure` at info: a failed task is a
    /// recorded outcome, not a fault of this service.
    pub async fn fail(&mut self, message: Option<String>) -> ApiResult<()> {
        let outcome = self.entity.fail(message);
        self.publish("task.failure", outcome).await
    }

    async fn publish(&self, event_type: &str, outcome: Result<(), CoreError>) -> ApiResult<()> {
        match outcome {
            Ok(()) => {
                self.notifier
                    .info(event_type, self.entity.notification_payload())
                    .await?;
                Ok(())
            }
            Err(err) => {
                let id = self.entity.id();
                Err(report_failure(self.notifier.as_ref(), event_type, id, err).await)
            }
        }
    }
}
