//! Notification strategies.
//!
//! The set is closed, so dispatch is an enum with exhaustive matching
//! rather than a trait object.

pub mod durable;
pub mod log;
pub mod noop;
pub mod topic;

pub use durable::{DurableBroker, ReconnectError};
pub use log::LogStrategy;
pub use noop::NoopStrategy;
pub use topic::TopicBroker;

use crate::config::StrategyKind;
use crate::envelope::Notification;
use crate::error::NotifyError;

/// The transport a [`Notifier`](crate::Notifier) delegates to.
pub enum Strategy {
    Noop(NoopStrategy),
    Log(LogStrategy),
    DurableBroker(DurableBroker),
    TopicBroker(TopicBroker),
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Noop(_) => StrategyKind::Noop,
            Self::Log(_) => StrategyKind::Log,
            Self::DurableBroker(_) => StrategyKind::DurableBroker,
            Self::TopicBroker(_) => StrategyKind::TopicBroker,
        }
    }

    /// Dispatch one notification.
    pub async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self {
            Self::Noop(s) => {
                s.send(notification);
                Ok(())
            }
            Self::Log(s) => {
                s.send(notification);
                Ok(())
            }
            Self::DurableBroker(s) => s.send(notification).await,
            Self::TopicBroker(s) => s.send(notification).await,
        }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Strategy").field(&self.kind()).finish()
    }
}
