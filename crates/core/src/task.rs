//! Long-running task resource and its state machine.
//!
//! ```text
//! pending ──begin_processing──▶ processing ──succeed──▶ completed
//!    │                              │
//!    └────────────fail──────────────┴──────fail───────▶ failed
//! ```
//!
//! `completed` and `failed` are terminal. Reaching a terminal state stamps
//! `expires_at` [`TASK_TIME_TO_LIVE_HOURS`] into the future.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::CoreError;
use crate::resource::Resource;
use crate::types::{isotime, Timestamp};

/// How long a finished task stays visible before it may be reaped.
pub const TASK_TIME_TO_LIVE_HOURS: i64 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Capability that actually performs a task's work.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Start processing the task identified by `task_id`.
    async fn begin_processing(&self, task_id: &str) -> Result<(), CoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub status: TaskStatus,
    pub input: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub owner: Option<String>,
    pub message: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    /// Create a pending task.
    pub fn new(
        id: impl Into<String>,
        task_type: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            task_type: task_type.into(),
            status: TaskStatus::Pending,
            input,
            result: None,
            owner: None,
            message: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Hand the task to `executor`.
    pub async fn run(&self, executor: &dyn TaskExecutor) -> Result<(), CoreError> {
        executor.begin_processing(&self.id).await
    }

    /// `pending` → `processing`.
    pub fn begin_processing(&mut self) -> Result<(), CoreError> {
        self.transition(&[TaskStatus::Pending], TaskStatus::Processing)
    }

    /// `processing` → `completed`, recording the result.
    pub fn succeed(&mut self, result: Option<serde_json::Value>) -> Result<(), CoreError> {
        self.transition(&[TaskStatus::Processing], TaskStatus::Completed)?;
        self.result = result;
        Ok(())
    }

    /// `pending` or `processing` → `failed`, recording the message.
    pub fn fail(&mut self, message: Option<String>) -> Result<(), CoreError> {
        self.transition(
            &[TaskStatus::Pending, TaskStatus::Processing],
            TaskStatus::Failed,
        )?;
        self.message = message;
        Ok(())
    }

    fn transition(&mut self, allowed: &[TaskStatus], to: TaskStatus) -> Result<(), CoreError> {
        if !allowed.contains(&self.status) {
            return Err(CoreError::InvalidTransition {
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }

        let now = Utc::now();
        self.status = to;
        self.updated_at = now;
        if to.is_terminal() {
            self.expires_at = Some(now + chrono::Duration::hours(TASK_TIME_TO_LIVE_HOURS));
        }
        Ok(())
    }
}

impl Resource for Task {
    const KIND: &'static str = "task";

    fn id(&self) -> String {
        self.id.clone()
    }

    fn notification_payload(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "type": self.task_type,
            "status": self.status.as_str(),
            "result": self.result,
            "owner": self.owner,
            "message": self.message,
            "expires_at": self.expires_at.as_ref().map(isotime),
            "created_at": isotime(&self.created_at),
            "updated_at": isotime(&self.updated_at),
        })
    }
}
