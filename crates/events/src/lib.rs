//! Beacon notification infrastructure.
//!
//! Publishes domain lifecycle events onto a pluggable transport:
//!
//! - [`Notification`]: the envelope handed to a transport, one per emit.
//! - [`Notify`]: the emit capability the proxy layer depends on.
//! - [`Notifier`]: facade that owns exactly one [`Strategy`], selected
//!   from [`NotifierConfig`] at construction.
//! - [`strategy`]: `Noop`, `Log`, `DurableBroker` (persistent connection,
//!   bounded exponential backoff) and `TopicBroker` (connect per message).
//! - [`transport`]: the client seams the broker strategies are built on.
//! - `testing` (`testing` feature): capturing notifier and scripted
//!   transports for tests.

pub mod backoff;
pub mod config;
pub mod envelope;
pub mod error;
pub mod notifier;
pub mod notify;
pub mod strategy;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

#[cfg(feature = "amqp")]
pub mod amqp;

pub use backoff::Backoff;
pub use config::{BrokerConfig, NotifierConfig, StrategyKind, TopicConfig};
pub use envelope::{Notification, Priority};
pub use error::{NotifyError, TransportError};
pub use notifier::{Notifier, Transports};
pub use notify::Notify;
pub use strategy::Strategy;
