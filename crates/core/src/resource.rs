//! Capabilities the notification layer needs from an audited resource.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::storage::ByteStream;

/// A resource whose lifecycle is published as notifications.
pub trait Resource: Send + Sync + 'static {
    /// Resource kind, used as the event-type prefix (`"image"` in
    /// `"image.create"`).
    const KIND: &'static str;

    /// Stable identifier of this resource.
    fn id(&self) -> String;

    /// Snapshot of the public fields published with lifecycle events.
    ///
    /// Implementations must never include physical storage locations.
    fn notification_payload(&self) -> serde_json::Value;
}

/// A resource that carries a byte payload.
#[async_trait]
pub trait DataResource: Resource {
    /// Expected payload length, when known.
    fn size(&self) -> Option<u64>;

    /// Tenant that owns the resource.
    fn owner(&self) -> Option<&str>;

    /// Stream the stored payload.
    async fn get_data(&self) -> Result<ByteStream, CoreError>;

    /// Consume `data` into storage. `size` is the length the caller
    /// declared up front, if any.
    async fn set_data(&mut self, data: ByteStream, size: Option<u64>) -> Result<(), CoreError>;
}
