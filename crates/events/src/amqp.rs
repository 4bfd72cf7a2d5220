//! `lapin`-backed transports.
//!
//! [`LapinConnector`] backs the durable broker with one long-lived
//! connection and channel. [`LapinTopicConnector`] backs the topic broker:
//! each topic node becomes an auto-delete topic exchange and the address
//! subject becomes the routing key.

use async_trait::async_trait;
use lapin::options::{
    BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{FieldTable, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};

use crate::error::TransportError;
use crate::transport::{
    BrokerChannel, BrokerConnector, TopicAddress, TopicConnection, TopicConnector, TopicSender,
    TopicSession,
};

impl From<lapin::Error> for TransportError {
    fn from(err: lapin::Error) -> Self {
        match err {
            lapin::Error::IOError(_)
            | lapin::Error::InvalidConnectionState(_)
            | lapin::Error::InvalidChannelState(_) => Self::Connection(err.to_string()),
            other => Self::Other(other.to_string()),
        }
    }
}

async fn declare_topic_exchange(
    channel: &Channel,
    name: &str,
    durable: bool,
    auto_delete: bool,
) -> Result<(), TransportError> {
    channel
        .exchange_declare(
            name,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable,
                auto_delete,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

async fn publish(
    channel: &Channel,
    exchange: &str,
    routing_key: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), TransportError> {
    let properties =
        BasicProperties::default().with_content_type(ShortString::from(content_type.to_owned()));
    channel
        .basic_publish(
            exchange,
            routing_key,
            BasicPublishOptions::default(),
            body,
            properties,
        )
        .await?
        .await?;
    Ok(())
}

async fn open_connection(uri: &str) -> Result<Connection, TransportError> {
    let connection = Connection::connect(uri, ConnectionProperties::default()).await?;
    Ok(connection)
}

// ---------------------------------------------------------------------------
// Durable broker
// ---------------------------------------------------------------------------

pub struct LapinConnector {
    uri: String,
}

impl LapinConnector {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

#[async_trait]
impl BrokerConnector for LapinConnector {
    async fn open(&self) -> Result<Box<dyn BrokerChannel>, TransportError> {
        let connection = open_connection(&self.uri).await?;
        let channel = connection.create_channel().await?;
        Ok(Box::new(LapinChannel {
            connection,
            channel,
        }))
    }
}

struct LapinChannel {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl BrokerChannel for LapinChannel {
    async fn declare_exchange(
        &mut self,
        name: &str,
        durable: bool,
        auto_delete: bool,
    ) -> Result<(), TransportError> {
        declare_topic_exchange(&self.channel, name, durable, auto_delete).await
    }

    async fn declare_queue(&mut self, name: &str, durable: bool) -> Result<(), TransportError> {
        self.channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    async fn bind_queue(
        &mut self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), TransportError> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    async fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), TransportError> {
        publish(&self.channel, exchange, routing_key, content_type, body).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connection.close(200, "OK").await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Topic broker
// ---------------------------------------------------------------------------

pub struct LapinTopicConnector {
    uri: String,
}

impl LapinTopicConnector {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

#[async_trait]
impl TopicConnector for LapinTopicConnector {
    async fn open(&self) -> Result<Box<dyn TopicConnection>, TransportError> {
        let connection = open_connection(&self.uri).await?;
        Ok(Box::new(LapinTopicConnection { connection }))
    }
}

struct LapinTopicConnection {
    connection: Connection,
}

#[async_trait]
impl TopicConnection for LapinTopicConnection {
    async fn session(&mut self) -> Result<Box<dyn TopicSession>, TransportError> {
        let channel = self.connection.create_channel().await?;
        Ok(Box::new(LapinTopicSession { channel }))
    }

    fn is_open(&self) -> bool {
        self.connection.status().connected()
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connection.close(200, "OK").await?;
        Ok(())
    }
}

struct LapinTopicSession {
    channel: Channel,
}

#[async_trait]
impl TopicSession for LapinTopicSession {
    async fn sender(
        &mut self,
        address: &TopicAddress,
    ) -> Result<Box<dyn TopicSender>, TransportError> {
        declare_topic_exchange(
            &self.channel,
            address.node(),
            address.durable(),
            address.auto_delete(),
        )
        .await?;
        Ok(Box::new(LapinTopicSender {
            channel: self.channel.clone(),
            exchange: address.node().to_string(),
            routing_key: address.subject(),
        }))
    }
}

struct LapinTopicSender {
    channel: Channel,
    exchange: String,
    routing_key: String,
}

#[async_trait]
impl TopicSender for LapinTopicSender {
    async fn send(&mut self, content_type: &str, body: &[u8]) -> Result<(), TransportError> {
        publish(
            &self.channel,
            &self.exchange,
            &self.routing_key,
            content_type,
            body,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn io_errors_are_connection_errors() {
        let err = lapin::Error::IOError(Arc::new(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "refused",
        )));
        let err = TransportError::from(err);
        assert!(matches!(err, TransportError::Connection(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn protocol_limits_are_not_recoverable() {
        let err = TransportError::from(lapin::Error::ChannelsLimitReached);
        assert!(matches!(err, TransportError::Other(_)));
        assert!(!err.is_recoverable());
    }
}
