//! Topic broker strategy: a fresh connection per notification.
//!
//! No state is kept between sends, so there is nothing to reconnect and no
//! retry. The connection is closed after every attempt that managed to
//! open it, whether or not the send succeeded.

use std::sync::Arc;

use crate::envelope::Notification;
use crate::error::{NotifyError, TransportError};
use crate::transport::{TopicAddress, TopicConnection, TopicConnector, JSON_CONTENT_TYPE};

pub struct TopicBroker {
    connector: Arc<dyn TopicConnector>,
    namespace: String,
}

impl TopicBroker {
    pub fn new(connector: Arc<dyn TopicConnector>, namespace: impl Into<String>) -> Self {
        Self {
            connector,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Open, send to `<namespace>/notifications.<priority>`, close.
    pub async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let body = notification.to_json()?;
        let address = TopicAddress::new(&self.namespace, notification.priority);

        let mut connection = self.connector.open().await?;
        let result = Self::deliver(connection.as_mut(), &address, &body).await;

        if connection.is_open() {
            if let Err(e) = connection.close().await {
                tracing::warn!(error = %e, %address, "Failed to close topic broker connection");
            }
        }

        result.map_err(NotifyError::from)
    }

    async fn deliver(
        connection: &mut dyn TopicConnection,
        address: &TopicAddress,
        body: &[u8],
    ) -> Result<(), TransportError> {
        let mut session = connection.session().await?;
        let mut sender = session.sender(address).await?;
        sender.send(JSON_CONTENT_TYPE, body).await?;
        tracing::debug!(%address, "Notification sent to topic broker");
        Ok(())
    }
}
