//! Durable broker strategy: one persistent connection, reconnect with
//! bounded exponential backoff, and a single publish retry.
//!
//! # Connection lifecycle
//!
//! ```text
//! Disconnected ──connect ok──▶ Connected
//!      ▲                          │
//!      └──recoverable failure─────┘
//!
//! reconnect: connect, on recoverable failure sleep `Backoff::delay`, retry;
//!            gives up with MaxRetriesReached once `max_retries` is spent.
//! ```
//!
//! Delivery is best-effort: a notification that cannot be delivered after
//! the retry budget is spent is written to the error log and dropped. Only
//! unrecognized transport failures reach the caller.
//!
//! The connection handle and retry counter sit behind one async mutex so
//! concurrent senders never race on the same channel. Backoff sleeps hold
//! that lock and therefore only delay other notifications, never unrelated
//! work.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backoff::Backoff;
use crate::envelope::{Notification, Priority};
use crate::error::{NotifyError, TransportError};
use crate::transport::{BrokerChannel, BrokerConnector, Topology, JSON_CONTENT_TYPE};

/// Why [`DurableBroker::reconnect`] gave up.
#[derive(Debug, thiserror::Error)]
pub enum ReconnectError {
    /// The retry budget is spent. Terminal for the current send.
    #[error("Unable to reach the broker after {attempts} attempts")]
    MaxRetriesReached { attempts: u32 },

    /// A failure the transport did not flag as recoverable.
    #[error(transparent)]
    Fatal(TransportError),
}

struct ConnectionState {
    channel: Option<Box<dyn BrokerChannel>>,
    /// Reset on every successful connect; bumped on every failed connect
    /// or publish.
    retry_attempts: u32,
}

pub struct DurableBroker {
    connector: Arc<dyn BrokerConnector>,
    topology: Topology,
    backoff: Backoff,
    state: Mutex<ConnectionState>,
}

impl DurableBroker {
    /// Create a disconnected strategy. Nothing is opened until
    /// [`connect`](Self::connect) or the first send.
    pub fn new(connector: Arc<dyn BrokerConnector>, topology: Topology, backoff: Backoff) -> Self {
        Self {
            connector,
            topology,
            backoff,
            state: Mutex::new(ConnectionState {
                channel: None,
                retry_attempts: 0,
            }),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.channel.is_some()
    }

    pub async fn retry_attempts(&self) -> u32 {
        self.state.lock().await.retry_attempts
    }

    // -- connection lifecycle ------------------------------------------------

    /// Open a connection and declare the exchange and all priority queues.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        self.connect_locked(&mut state).await
    }

    /// Connect once at startup.
    ///
    /// A recoverable failure leaves the strategy disconnected so the first
    /// send runs the reconnect loop; anything else is returned.
    pub async fn connect_eagerly(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        match self.connect_locked(&mut state).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                state.retry_attempts += 1;
                tracing::warn!(error = %e, "Broker unreachable at startup, will retry on first send");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Reconnect with backoff until connected or the budget is spent.
    pub async fn reconnect(&self) -> Result<(), ReconnectError> {
        let mut state = self.state.lock().await;
        self.reconnect_locked(&mut state).await
    }

    /// Close the connection. The next send reconnects.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        Self::drop_channel(&mut state).await;
    }

    async fn connect_locked(&self, state: &mut ConnectionState) -> Result<(), TransportError> {
        Self::drop_channel(state).await;

        let mut channel = self.connector.open().await?;
        self.declare_topology(channel.as_mut()).await?;

        state.channel = Some(channel);
        state.retry_attempts = 0;
        tracing::info!(exchange = %self.topology.exchange, "Connected to notification broker");
        Ok(())
    }

    async fn declare_topology(&self, channel: &mut dyn BrokerChannel) -> Result<(), TransportError> {
        let exchange = &self.topology.exchange;
        channel.declare_exchange(exchange, false, false).await?;

        for priority in Priority::ALL {
            let key = self.topology.routing_key(priority);
            channel
                .declare_queue(&key, self.topology.durable_queues)
                .await?;
            channel.bind_queue(&key, exchange, &key).await?;
        }
        Ok(())
    }

    async fn reconnect_locked(&self, state: &mut ConnectionState) -> Result<(), ReconnectError> {
        loop {
            let err = match self.connect_locked(state).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_recoverable() => e,
                Err(e) => return Err(ReconnectError::Fatal(e)),
            };

            let delay = self.backoff.delay(state.retry_attempts);
            state.retry_attempts += 1;

            if self.backoff.exhausted(state.retry_attempts) {
                tracing::error!(
                    attempts = state.retry_attempts,
                    error = %err,
                    "Unable to connect to notification broker, giving up"
                );
                return Err(ReconnectError::MaxRetriesReached {
                    attempts: state.retry_attempts,
                });
            }

            tracing::warn!(
                attempts = state.retry_attempts,
                sleep_secs = delay.as_secs_f64(),
                error = %err,
                "Notification broker unreachable, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn drop_channel(state: &mut ConnectionState) {
        if let Some(mut channel) = state.channel.take() {
            if let Err(e) = channel.close().await {
                tracing::debug!(error = %e, "Ignoring error while closing broker channel");
            }
        }
    }

    // -- delivery ------------------------------------------------------------

    /// Publish to `<topic>.<priority>`.
    ///
    /// A recoverable publish failure triggers one reconnect and one more
    /// publish. Exhausted retries are logged through
    /// [`log_failure`](Self::log_failure) and reported as success.
    pub async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let body = notification.to_json()?;
        let routing_key = self.topology.routing_key(notification.priority);
        let mut state = self.state.lock().await;

        if state.channel.is_none() {
            if let Err(e) = self.reconnect_locked(&mut state).await {
                return self.give_up(e, notification);
            }
        }

        match self.publish_locked(&mut state, &routing_key, &body).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_recoverable() => {
                state.retry_attempts += 1;
                tracing::warn!(error = %e, %routing_key, "Publish failed, reconnecting");
                Self::drop_channel(&mut state).await;
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.reconnect_locked(&mut state).await {
            return self.give_up(e, notification);
        }

        match self.publish_locked(&mut state, &routing_key, &body).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                state.retry_attempts += 1;
                Self::drop_channel(&mut state).await;
                tracing::warn!(error = %e, %routing_key, "Publish failed after reconnect");
                self.log_failure(notification);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publish_locked(
        &self,
        state: &mut ConnectionState,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), TransportError> {
        let channel = state
            .channel
            .as_mut()
            .ok_or_else(|| TransportError::Connection("no open channel".into()))?;
        channel
            .publish(&self.topology.exchange, routing_key, JSON_CONTENT_TYPE, body)
            .await
    }

    fn give_up(&self, err: ReconnectError, notification: &Notification) -> Result<(), NotifyError> {
        match err {
            ReconnectError::MaxRetriesReached { .. } => {
                self.log_failure(notification);
                Ok(())
            }
            ReconnectError::Fatal(e) => Err(e.into()),
        }
    }

    /// Record a notification that could not be delivered.
    // TODO: route dropped notifications to a dead-letter sink so operators
    // can alert on delivery loss instead of scraping logs.
    pub fn log_failure(&self, notification: &Notification) {
        tracing::error!(
            priority = %notification.priority,
            event_type = %notification.event_type,
            message_id = %notification.message_id,
            payload = %notification.payload,
            "Notification dropped, broker unreachable"
        );
    }
}
