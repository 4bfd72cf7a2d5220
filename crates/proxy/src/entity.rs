//! Entity proxy: data transfer notifications.
//!
//! ```text
//! get_data:  chunk, chunk, ..., end ──▶ <kind>.send (info, or error on size mismatch)
//! set_data:  <kind>.prepare ──▶ consume ──▶ <kind>.upload, <kind>.activate
//!                                   └─fail─▶ <kind>.upload (error), classified error
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use beacon_core::{ByteStream, CoreError, DataResource, RequestContext, Resource};
use beacon_events::Notify;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Map, Value};

use crate::error::{ApiError, ApiResult};
use crate::{event_type, report_failure};

/// Byte stream handed to callers of [`EntityProxy::get_data`].
pub type ApiByteStream = BoxStream<'static, ApiResult<Vec<u8>>>;

/// A domain entity bound to the caller's context and a notifier.
///
/// Non-audited reads and writes go straight to the entity through
/// `Deref`/`DerefMut`.
pub struct EntityProxy<E> {
    pub(crate) entity: E,
    pub(crate) context: RequestContext,
    pub(crate) notifier: Arc<dyn Notify>,
}

impl<E> EntityProxy<E> {
    pub fn new(entity: E, context: RequestContext, notifier: Arc<dyn Notify>) -> Self {
        Self {
            entity,
            context,
            notifier,
        }
    }

    pub fn into_inner(self) -> E {
        self.entity
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl<E> Deref for EntityProxy<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E> DerefMut for EntityProxy<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.entity
    }
}

impl<E: fmt::Debug> fmt::Debug for EntityProxy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityProxy")
            .field("entity", &self.entity)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl<E: DataResource> EntityProxy<E> {
    /// Stream the entity's data, publishing `<kind>.send` once the caller
    /// has drained the stream.
    ///
    /// The notification is info when the byte count matches the entity's
    /// size (or the size is unknown) and error otherwise. A failure while
    /// streaming publishes an error send notification and ends the stream
    /// with the classified error. Notification failures here are logged,
    /// never surfaced, since the bytes have already gone out.
    ///
    /// If the data cannot be opened at all, an error send notification is
    /// published and the classified error returned.
    pub async fn get_data(&self) -> ApiResult<ApiByteStream> {
        let source = match self.entity.get_data().await {
            Ok(source) => source,
            Err(err) => {
                return Err(report_failure(
                    self.notifier.as_ref(),
                    &event_type::<E>("send"),
                    self.entity.id(),
                    err,
                )
                .await)
            }
        };
        let transfer = Transfer {
            notifier: self.notifier.clone(),
            event_type: event_type::<E>("send"),
            expected: self.entity.size(),
            payload: self.send_payload(),
            bytes_sent: 0,
        };

        let stream = stream::unfold(Some((source, transfer)), |state| async move {
            let Some((mut source, mut transfer)) = state else {
                return None;
            };
            match source.next().await {
                Some(Ok(chunk)) => {
                    transfer.bytes_sent += chunk.len() as u64;
                    Some((Ok(chunk), Some((source, transfer))))
                }
                Some(Err(err)) => {
                    transfer.failed(&err).await;
                    Some((Err(ApiError::from(err)), None))
                }
                None => {
                    transfer.finished().await;
                    None
                }
            }
        });

        Ok(stream.boxed())
    }

    /// Consume `data` into the entity, publishing prepare, then upload and
    /// activate on success or a single error upload on failure.
    pub async fn set_data(&mut self, data: ByteStream, size: Option<u64>) -> ApiResult<()> {
        self.notifier
            .info(
                &event_type::<E>("prepare"),
                self.entity.notification_payload(),
            )
            .await?;

        match self.entity.set_data(data, size).await {
            Ok(()) => {
                self.notifier
                    .info(&event_type::<E>("upload"), self.entity.notification_payload())
                    .await?;
                self.notifier
                    .info(
                        &event_type::<E>("activate"),
                        self.entity.notification_payload(),
                    )
                    .await?;
                Ok(())
            }
            Err(err) => Err(report_failure(
                self.notifier.as_ref(),
                &event_type::<E>("upload"),
                self.entity.id(),
                err,
            )
            .await),
        }
    }

    /// Receiver and owner identity published with `<kind>.send`.
    fn send_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(format!("{}_id", E::KIND), json!(self.entity.id()));
        payload.insert("owner_id".into(), json!(self.entity.owner()));
        payload.insert("receiver_tenant_id".into(), json!(self.context.tenant_id));
        payload.insert("receiver_user_id".into(), json!(self.context.user_id));
        payload.insert("destination_ip".into(), json!(self.context.remote_addr));
        payload
    }
}

// ---------------------------------------------------------------------------
// Transfer accounting
// ---------------------------------------------------------------------------

struct Transfer {
    notifier: Arc<dyn Notify>,
    event_type: String,
    expected: Option<u64>,
    payload: Map<String, Value>,
    bytes_sent: u64,
}

impl Transfer {
    async fn finished(self) {
        let mismatch = self
            .expected
            .filter(|expected| *expected != self.bytes_sent)
            .map(|expected| CoreError::SizeMismatch {
                expected,
                actual: self.bytes_sent,
            });

        match mismatch {
            None => self.publish(false, None).await,
            Some(err) => self.publish(true, Some(err.to_string())).await,
        }
    }

    async fn failed(&self, err: &CoreError) {
        self.publish(true, Some(err.to_string())).await;
    }

    async fn publish(&self, is_error: bool, error: Option<String>) {
        let mut payload = self.payload.clone();
        payload.insert("bytes_sent".into(), json!(self.bytes_sent));
        if let Some(error) = error {
            payload.insert("error".into(), json!(error));
        }
        let payload = Value::Object(payload);

        let sent = if is_error {
            self.notifier.error(&self.event_type, payload).await
        } else {
            self.notifier.info(&self.event_type, payload).await
        };

        if let Err(e) = sent {
            tracing::error!(
                error = %e,
                event_type = %self.event_type,
                bytes_sent = self.bytes_sent,
                "Failed to publish transfer notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::{Image, MemoryStore, StoredImage};
    use beacon_events::testing::CapturingNotifier;

    use super::*;

    fn chunks(parts: &[&str]) -> ByteStream {
        let items: Vec<Result<Vec<u8>, CoreError>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn deref_reaches_the_wrapped_entity() {
        let notifier = Arc::new(CapturingNotifier::new());
        let image = StoredImage::new(Image::new("img-1"), Arc::new(MemoryStore::new()));
        let mut proxy = EntityProxy::new(image, RequestContext::default(), notifier.clone());

        proxy.image.name = Some("renamed".into());

        assert_eq!(proxy.image.name.as_deref(), Some("renamed"));
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn send_payload_carries_receiver_identity() {
        let notifier = Arc::new(CapturingNotifier::new());
        let mut image = Image::new("img-1");
        image.owner = Some("tenant-1".into());
        let context = RequestContext::new("tenant-2", "user-1").with_remote_addr("10.0.0.7");
        let proxy = EntityProxy::new(
            StoredImage::new(image, Arc::new(MemoryStore::new())),
            context,
            notifier,
        );

        let payload = Value::Object(proxy.send_payload());

        assert_eq!(payload["image_id"], "img-1");
        assert_eq!(payload["owner_id"], "tenant-1");
        assert_eq!(payload["receiver_tenant_id"], "tenant-2");
        assert_eq!(payload["receiver_user_id"], "user-1");
        assert_eq!(payload["destination_ip"], "10.0.0.7");
    }

    #[tokio::test]
    async fn unknown_size_counts_as_complete() {
        let notifier = Arc::new(CapturingNotifier::new());
        let store = Arc::new(MemoryStore::new());
        let mut image = StoredImage::new(Image::new("img-1"), store);
        image.set_data(chunks(&["abc"]), None).await.unwrap();
        image.image.size = None;
        let proxy = EntityProxy::new(image, RequestContext::default(), notifier.clone());

        let data: Vec<_> = proxy.get_data().await.unwrap().collect().await;

        assert_eq!(data.len(), 1);
        let logs = notifier.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].priority, beacon_events::Priority::Info);
        assert_eq!(logs[0].payload["bytes_sent"], 3);
    }
}
