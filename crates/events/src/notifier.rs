//! The notifier facade.
//!
//! A [`Notifier`] owns exactly one [`Strategy`], chosen at construction and
//! never swapped. It builds the envelope and hands it off; retry and
//! backoff live entirely inside the strategy.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{NotifierConfig, StrategyKind};
use crate::envelope::{Notification, Priority};
use crate::error::NotifyError;
use crate::notify::Notify;
use crate::strategy::{DurableBroker, LogStrategy, NoopStrategy, Strategy, TopicBroker};
use crate::transport::{BrokerConnector, TopicConnector};

/// Transport clients available to [`Notifier::from_config`].
///
/// Only the client matching the configured strategy is used. With the
/// `amqp` feature enabled, missing clients fall back to the `lapin`
/// implementations built from the configured endpoint.
#[derive(Clone, Default)]
pub struct Transports {
    pub broker: Option<Arc<dyn BrokerConnector>>,
    pub topic: Option<Arc<dyn TopicConnector>>,
}

impl Transports {
    pub fn with_broker(mut self, connector: Arc<dyn BrokerConnector>) -> Self {
        self.broker = Some(connector);
        self
    }

    pub fn with_topic(mut self, connector: Arc<dyn TopicConnector>) -> Self {
        self.topic = Some(connector);
        self
    }
}

#[derive(Debug)]
pub struct Notifier {
    publisher_id: String,
    strategy: Strategy,
}

impl Notifier {
    pub fn new(publisher_id: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            publisher_id: publisher_id.into(),
            strategy,
        }
    }

    /// Build the strategy named by `config`.
    ///
    /// The durable broker connects once up front: an unrecognized connect
    /// failure fails construction, a recoverable one is deferred to the
    /// first send.
    pub async fn from_config(
        config: &NotifierConfig,
        transports: Transports,
    ) -> Result<Self, NotifyError> {
        let strategy = match config.strategy {
            StrategyKind::Noop => Strategy::Noop(NoopStrategy),
            StrategyKind::Log => Strategy::Log(LogStrategy),
            StrategyKind::DurableBroker => {
                let connector = broker_connector(config, transports.broker)?;
                let broker = DurableBroker::new(
                    connector,
                    config.broker.topology(),
                    config.broker.backoff,
                );
                broker.connect_eagerly().await?;
                Strategy::DurableBroker(broker)
            }
            StrategyKind::TopicBroker => {
                let connector = topic_connector(config, transports.topic)?;
                Strategy::TopicBroker(TopicBroker::new(connector, &config.topic.namespace))
            }
        };

        tracing::info!(strategy = config.strategy.name(), "Notifier initialised");
        Ok(Self::new(&config.publisher_id, strategy))
    }

    pub fn publisher_id(&self) -> &str {
        &self.publisher_id
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Release transport resources held by the strategy.
    pub async fn close(&self) {
        if let Strategy::DurableBroker(broker) = &self.strategy {
            broker.close().await;
        }
    }
}

#[async_trait]
impl Notify for Notifier {
    async fn emit(
        &self,
        priority: Priority,
        event_type: &str,
        payload: Value,
    ) -> Result<(), NotifyError> {
        let notification = Notification::new(&self.publisher_id, priority, event_type, payload);
        tracing::debug!(
            %priority,
            event_type,
            message_id = %notification.message_id,
            "Emitting notification"
        );
        self.strategy.send(&notification).await
    }
}

// ---------------------------------------------------------------------------
// Transport resolution
// ---------------------------------------------------------------------------

#[cfg(feature = "amqp")]
fn broker_connector(
    config: &NotifierConfig,
    supplied: Option<Arc<dyn BrokerConnector>>,
) -> Result<Arc<dyn BrokerConnector>, NotifyError> {
    Ok(supplied.unwrap_or_else(|| Arc::new(crate::amqp::LapinConnector::new(config.broker.uri()))))
}

#[cfg(not(feature = "amqp"))]
fn broker_connector(
    _config: &NotifierConfig,
    supplied: Option<Arc<dyn BrokerConnector>>,
) -> Result<Arc<dyn BrokerConnector>, NotifyError> {
    supplied.ok_or(NotifyError::MissingTransport(StrategyKind::DurableBroker))
}

#[cfg(feature = "amqp")]
fn topic_connector(
    config: &NotifierConfig,
    supplied: Option<Arc<dyn TopicConnector>>,
) -> Result<Arc<dyn TopicConnector>, NotifyError> {
    Ok(supplied
        .unwrap_or_else(|| Arc::new(crate::amqp::LapinTopicConnector::new(config.broker.uri()))))
}

#[cfg(not(feature = "amqp"))]
fn topic_connector(
    _config: &NotifierConfig,
    supplied: Option<Arc<dyn TopicConnector>>,
) -> Result<Arc<dyn TopicConnector>, NotifyError> {
    supplied.ok_or(NotifyError::MissingTransport(StrategyKind::TopicBroker))
}
