//! Test doubles for code that emits notifications.
//!
//! - [`CapturingNotifier`] records every emit so tests can assert exactly
//!   which events were produced, in order.
//! - [`ScriptedBroker`] and [`ScriptedTopicBroker`] are in-memory transports
//!   whose failures can be queued up front.
//!
//! All doubles are cheap to clone and share their recorded state, so a
//! test keeps one handle and gives the other to the code under test.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::Priority;
use crate::error::{NotifyError, TransportError};
use crate::notify::Notify;
use crate::transport::{
    BrokerChannel, BrokerConnector, TopicAddress, TopicConnection, TopicConnector, TopicSender,
    TopicSession,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decode a published body, keeping non-JSON bodies as text.
fn decode_body(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

// ---------------------------------------------------------------------------
// CapturingNotifier
// ---------------------------------------------------------------------------

/// One recorded emit.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedNotification {
    pub priority: Priority,
    pub event_type: String,
    pub payload: Value,
}

#[derive(Debug, Default)]
struct CaptureState {
    logs: Vec<CapturedNotification>,
    failing: bool,
}

/// In-memory [`Notify`] that records instead of sending.
#[derive(Debug, Clone, Default)]
pub struct CapturingNotifier {
    state: Arc<Mutex<CaptureState>>,
}

impl CapturingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification emitted so far, oldest first.
    pub fn logs(&self) -> Vec<CapturedNotification> {
        lock(&self.state).logs.clone()
    }

    /// `(priority, event_type)` pairs, for terse ordering assertions.
    pub fn events(&self) -> Vec<(Priority, String)> {
        lock(&self.state)
            .logs
            .iter()
            .map(|n| (n.priority, n.event_type.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.state).logs.clear();
    }

    /// Make every subsequent emit fail without recording anything.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }
}

#[async_trait]
impl Notify for CapturingNotifier {
    async fn emit(
        &self,
        priority: Priority,
        event_type: &str,
        payload: Value,
    ) -> Result<(), NotifyError> {
        let mut state = lock(&self.state);
        if state.failing {
            return Err(TransportError::Other("notification transport unavailable".into()).into());
        }
        state.logs.push(CapturedNotification {
            priority,
            event_type: event_type.to_string(),
            payload,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedBroker
// ---------------------------------------------------------------------------

/// A successfully published message.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub exchange: String,
    pub routing_key: String,
    pub content_type: String,
    pub body: Value,
}

/// A topology declaration made on a channel, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Exchange {
        name: String,
        durable: bool,
        auto_delete: bool,
    },
    Queue {
        name: String,
        durable: bool,
    },
    Binding {
        queue: String,
        exchange: String,
        routing_key: String,
    },
}

#[derive(Debug, Default)]
struct BrokerState {
    connect_failures: VecDeque<TransportError>,
    connect_always_fails: Option<TransportError>,
    publish_failures: VecDeque<TransportError>,
    connect_calls: usize,
    publish_calls: usize,
    close_calls: usize,
    published: Vec<Published>,
    declarations: Vec<Declaration>,
}

/// In-memory durable broker. Connects and publishes succeed unless a
/// failure has been queued.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next connect attempt with `err`. Queued failures are
    /// consumed in order.
    pub fn fail_connect(&self, err: TransportError) {
        lock(&self.state).connect_failures.push_back(err);
    }

    /// Fail every connect attempt once queued failures run out.
    pub fn fail_connects_forever(&self, err: TransportError) {
        lock(&self.state).connect_always_fails = Some(err);
    }

    /// Fail the next publish with `err`.
    pub fn fail_publish(&self, err: TransportError) {
        lock(&self.state).publish_failures.push_back(err);
    }

    pub fn connect_calls(&self) -> usize {
        lock(&self.state).connect_calls
    }

    /// Publish attempts, failed ones included.
    pub fn publish_calls(&self) -> usize {
        lock(&self.state).publish_calls
    }

    pub fn close_calls(&self) -> usize {
        lock(&self.state).close_calls
    }

    pub fn published(&self) -> Vec<Published> {
        lock(&self.state).published.clone()
    }

    pub fn declarations(&self) -> Vec<Declaration> {
        lock(&self.state).declarations.clone()
    }
}

#[async_trait]
impl BrokerConnector for ScriptedBroker {
    async fn open(&self) -> Result<Box<dyn BrokerChannel>, TransportError> {
        let mut state = lock(&self.state);
        state.connect_calls += 1;
        if let Some(err) = state.connect_failures.pop_front() {
            return Err(err);
        }
        if let Some(err) = &state.connect_always_fails {
            return Err(err.clone());
        }
        Ok(Box::new(ScriptedChannel {
            state: self.state.clone(),
        }))
    }
}

struct ScriptedChannel {
    state: Arc<Mutex<BrokerState>>,
}

#[async_trait]
impl BrokerChannel for ScriptedChannel {
    async fn declare_exchange(
        &mut self,
        name: &str,
        durable: bool,
        auto_delete: bool,
    ) -> Result<(), TransportError> {
        lock(&self.state).declarations.push(Declaration::Exchange {
            name: name.to_string(),
            durable,
            auto_delete,
        });
        Ok(())
    }

    async fn declare_queue(&mut self, name: &str, durable: bool) -> Result<(), TransportError> {
        lock(&self.state).declarations.push(Declaration::Queue {
            name: name.to_string(),
            durable,
        });
        Ok(())
    }

    async fn bind_queue(
        &mut self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), TransportError> {
        lock(&self.state).declarations.push(Declaration::Binding {
            queue: queue.to_string(),
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
        });
        Ok(())
    }

    async fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.publish_calls += 1;
        if let Some(err) = state.publish_failures.pop_front() {
            return Err(err);
        }
        state.published.push(Published {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            content_type: content_type.to_string(),
            body: decode_body(body),
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        lock(&self.state).close_calls += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedTopicBroker
// ---------------------------------------------------------------------------

/// A message handed to a topic sender.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub address: TopicAddress,
    pub content_type: String,
    pub body: Value,
}

#[derive(Debug, Default)]
struct TopicState {
    open_failures: VecDeque<TransportError>,
    send_failures: VecDeque<TransportError>,
    open_calls: usize,
    close_calls: usize,
    addresses: Vec<TopicAddress>,
    sent: Vec<Sent>,
}

/// In-memory topic broker with queued open and send failures.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTopicBroker {
    state: Arc<Mutex<TopicState>>,
}

impl ScriptedTopicBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open(&self, err: TransportError) {
        lock(&self.state).open_failures.push_back(err);
    }

    pub fn fail_send(&self, err: TransportError) {
        lock(&self.state).send_failures.push_back(err);
    }

    pub fn open_calls(&self) -> usize {
        lock(&self.state).open_calls
    }

    pub fn close_calls(&self) -> usize {
        lock(&self.state).close_calls
    }

    /// Addresses senders were requested for.
    pub fn addresses(&self) -> Vec<TopicAddress> {
        lock(&self.state).addresses.clone()
    }

    pub fn sent(&self) -> Vec<Sent> {
        lock(&self.state).sent.clone()
    }
}

#[async_trait]
impl TopicConnector for ScriptedTopicBroker {
    async fn open(&self) -> Result<Box<dyn TopicConnection>, TransportError> {
        let mut state = lock(&self.state);
        state.open_calls += 1;
        if let Some(err) = state.open_failures.pop_front() {
            return Err(err);
        }
        Ok(Box::new(ScriptedTopicConnection {
            state: self.state.clone(),
            open: true,
        }))
    }
}

struct ScriptedTopicConnection {
    state: Arc<Mutex<TopicState>>,
    open: bool,
}

#[async_trait]
impl TopicConnection for ScriptedTopicConnection {
    async fn session(&mut self) -> Result<Box<dyn TopicSession>, TransportError> {
        Ok(Box::new(ScriptedTopicSession {
            state: self.state.clone(),
        }))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        lock(&self.state).close_calls += 1;
        Ok(())
    }
}

struct ScriptedTopicSession {
    state: Arc<Mutex<TopicState>>,
}

#[async_trait]
impl TopicSession for ScriptedTopicSession {
    async fn sender(
        &mut self,
        address: &TopicAddress,
    ) -> Result<Box<dyn TopicSender>, TransportError> {
        lock(&self.state).addresses.push(address.clone());
        Ok(Box::new(ScriptedTopicSender {
            state: self.state.clone(),
            address: address.clone(),
        }))
    }
}

struct ScriptedTopicSender {
    state: Arc<Mutex<TopicState>>,
    address: TopicAddress,
}

#[async_trait]
impl TopicSender for ScriptedTopicSender {
    async fn send(&mut self, content_type: &str, body: &[u8]) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if let Some(err) = state.send_failures.pop_front() {
            return Err(err);
        }
        state.sent.push(Sent {
            address: self.address.clone(),
            content_type: content_type.to_string(),
            body: decode_body(body),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn capturing_notifier_records_in_order() {
        let notifier = CapturingNotifier::new();
        notifier.info("image.prepare", json!({"id": "1"})).await.unwrap();
        notifier.error("image.upload", json!({"id": "1"})).await.unwrap();

        assert_eq!(
            notifier.events(),
            vec![
                (Priority::Info, "image.prepare".to_string()),
                (Priority::Error, "image.upload".to_string()),
            ]
        );

        notifier.clear();
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn failing_notifier_records_nothing() {
        let notifier = CapturingNotifier::new();
        notifier.set_failing(true);

        assert!(notifier.warn("task.run", json!({})).await.is_err());
        assert!(notifier.is_empty());
    }
}
