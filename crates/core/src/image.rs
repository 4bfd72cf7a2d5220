//! Image resource and its storage-backed variant.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::CoreError;
use crate::resource::{DataResource, Resource};
use crate::storage::{BlobStore, ByteStream};
use crate::types::{isotime, Timestamp};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Queued,
    Saving,
    Active,
    Killed,
    Deleted,
    PendingDelete,
}

impl ImageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Saving => "saving",
            Self::Active => "active",
            Self::Killed => "killed",
            Self::Deleted => "deleted",
            Self::PendingDelete => "pending_delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// Image metadata record.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub id: String,
    pub name: Option<String>,
    pub status: ImageStatus,
    pub visibility: Visibility,
    pub size: Option<u64>,
    pub checksum: Option<String>,
    pub container_format: Option<String>,
    pub disk_format: Option<String>,
    pub min_ram: u32,
    pub min_disk: u32,
    pub owner: Option<String>,
    pub protected: bool,
    pub tags: BTreeSet<String>,
    pub extra_properties: BTreeMap<String, String>,
    /// Physical storage locations. Never part of a notification payload.
    pub locations: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Image {
    /// Create a queued, private image with no data.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: None,
            status: ImageStatus::Queued,
            visibility: Visibility::Private,
            size: None,
            checksum: None,
            container_format: None,
            disk_format: None,
            min_ram: 0,
            min_disk: 0,
            owner: None,
            protected: false,
            tags: BTreeSet::new(),
            extra_properties: BTreeMap::new(),
            locations: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

impl Resource for Image {
    const KIND: &'static str = "image";

    fn id(&self) -> String {
        self.id.clone()
    }

    fn notification_payload(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "name": self.name,
            "status": self.status.as_str(),
            "created_at": isotime(&self.created_at),
            "updated_at": isotime(&self.updated_at),
            "min_disk": self.min_disk,
            "min_ram": self.min_ram,
            "protected": self.protected,
            "checksum": self.checksum,
            "owner": self.owner,
            "disk_format": self.disk_format,
            "container_format": self.container_format,
            "size": self.size,
            "is_public": self.visibility == Visibility::Public,
            "properties": self.extra_properties,
            "tags": self.tags,
            "deleted": self.status == ImageStatus::Deleted,
            "deleted_at": self.deleted_at.as_ref().map(isotime),
        })
    }
}

// ---------------------------------------------------------------------------
// StoredImage
// ---------------------------------------------------------------------------

/// An [`Image`] bound to the [`BlobStore`] that holds its data.
#[derive(Clone)]
pub struct StoredImage {
    pub image: Image,
    store: Arc<dyn BlobStore>,
}

impl StoredImage {
    pub fn new(image: Image, store: Arc<dyn BlobStore>) -> Self {
        Self { image, store }
    }
}

impl std::fmt::Debug for StoredImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredImage")
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}

impl Resource for StoredImage {
    const KIND: &'static str = Image::KIND;

    fn id(&self) -> String {
        self.image.id()
    }

    fn notification_payload(&self) -> serde_json::Value {
        self.image.notification_payload()
    }
}

#[async_trait]
impl DataResource for StoredImage {
    fn size(&self) -> Option<u64> {
        self.image.size
    }

    fn owner(&self) -> Option<&str> {
        self.image.owner.as_deref()
    }

    async fn get_data(&self) -> Result<ByteStream, CoreError> {
        let location = self
            .image
            .locations
            .first()
            .ok_or_else(|| CoreError::NotFound {
                entity: "image data",
                id: self.image.id.clone(),
            })?;
        self.store.get(location).await
    }

    async fn set_data(&mut self, data: ByteStream, size: Option<u64>) -> Result<(), CoreError> {
        if self.image.status != ImageStatus::Queued {
            return Err(CoreError::InvalidTransition {
                from: self.image.status.as_str(),
                to: ImageStatus::Saving.as_str(),
            });
        }

        let blob = self.store.put(&self.image.id, data, size).await?;

        self.image.size = Some(blob.size);
        self.image.checksum = Some(blob.checksum);
        self.image.locations.push(blob.location);
        self.image.status = ImageStatus::Active;
        self.image.updated_at = Utc::now();
        Ok(())
    }
}
