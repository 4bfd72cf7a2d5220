//! Client seams for the broker strategies.
//!
//! Strategies receive their transport clients through their constructors,
//! so tests and alternative brokers plug in without process-wide state.
//! The `amqp` feature provides implementations backed by `lapin`.

use std::fmt;

use async_trait::async_trait;

use crate::envelope::Priority;
use crate::error::TransportError;

/// Content type of every published notification body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// Durable broker
// ---------------------------------------------------------------------------

/// Exchange and queue layout declared on every durable-broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Topic exchange name.
    pub exchange: String,
    /// Routing-key prefix.
    pub topic: String,
    pub durable_queues: bool,
}

impl Topology {
    /// `<topic>.<priority>`; also the name of the queue bound to it.
    pub fn routing_key(&self, priority: Priority) -> String {
        format!("{}.{}", self.topic, priority.routing_suffix())
    }
}

/// Opens connections to a persistent broker.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Open a connection and a channel on it.
    async fn open(&self) -> Result<Box<dyn BrokerChannel>, TransportError>;
}

/// A channel on an open broker connection.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Declare a topic exchange.
    async fn declare_exchange(
        &mut self,
        name: &str,
        durable: bool,
        auto_delete: bool,
    ) -> Result<(), TransportError>;

    async fn declare_queue(&mut self, name: &str, durable: bool) -> Result<(), TransportError>;

    async fn bind_queue(
        &mut self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), TransportError>;

    async fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), TransportError>;

    /// Close the channel and its connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// Topic broker
// ---------------------------------------------------------------------------

/// Address of a topic node, carrying its declarative node properties.
///
/// Renders as
/// `<namespace>/notifications.<priority> ; {"node": {"x-declare": {"auto-delete": true, "durable": false}, "type": "topic"}, "create": "always"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicAddress {
    pub namespace: String,
    pub priority: Priority,
}

impl TopicAddress {
    pub fn new(namespace: impl Into<String>, priority: Priority) -> Self {
        Self {
            namespace: namespace.into(),
            priority,
        }
    }

    /// The topic node (exchange) name.
    pub fn node(&self) -> &str {
        &self.namespace
    }

    /// The subject within the node, `notifications.<priority>`.
    pub fn subject(&self) -> String {
        format!("notifications.{}", self.priority.routing_suffix())
    }

    /// Node is removed once its last link closes.
    pub fn auto_delete(&self) -> bool {
        true
    }

    pub fn durable(&self) -> bool {
        false
    }
}

impl fmt::Display for TopicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ; {{\"node\": {{\"x-declare\": {{\"auto-delete\": {}, \"durable\": {}}}, \
             \"type\": \"topic\"}}, \"create\": \"always\"}}",
            self.node(),
            self.subject(),
            self.auto_delete(),
            self.durable(),
        )
    }
}

/// Opens short-lived connections to a topic broker.
#[async_trait]
pub trait TopicConnector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn TopicConnection>, TransportError>;
}

#[async_trait]
pub trait TopicConnection: Send {
    async fn session(&mut self) -> Result<Box<dyn TopicSession>, TransportError>;

    /// Whether the connection is still open and needs closing.
    fn is_open(&self) -> bool;

    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait TopicSession: Send {
    /// Obtain a sender bound to `address`, creating the node if needed.
    async fn sender(&mut self, address: &TopicAddress)
        -> Result<Box<dyn TopicSender>, TransportError>;
}

#[async_trait]
pub trait TopicSender: Send {
    async fn send(&mut self, content_type: &str, body: &[u8]) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_key_uses_lowercase_priority() {
        let topology = Topology {
            exchange: "beacon".into(),
            topic: "fake_topic".into(),
            durable_queues: false,
        };
        assert_eq!(topology.routing_key(Priority::Warn), "fake_topic.warn");
        assert_eq!(topology.routing_key(Priority::Error), "fake_topic.error");
    }

    #[test]
    fn topic_address_renders_node_properties() {
        let address = TopicAddress::new("glance", Priority::Info);
        assert_eq!(
            address.to_string(),
            "glance/notifications.info ; {\"node\": {\"x-declare\": \
             {\"auto-delete\": true, \"durable\": false}, \"type\": \"topic\"}, \
             \"create\": \"always\"}"
        );
    }
}
