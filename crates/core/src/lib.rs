//! Beacon domain collaborators.
//!
//! The notification layer observes these types but does not own their
//! business rules:
//!
//! - [`Image`] and [`Task`]: the audited resources.
//! - [`Repository`]: CRUD capability over a resource, with an in-memory
//!   implementation in [`MemoryRepository`].
//! - [`DataResource`]: resources that carry a byte payload, backed by a
//!   [`BlobStore`].
//! - [`RequestContext`]: the caller identity used to fill receiver fields.
//! - [`CoreError`]: the failure conditions collaborators raise.

pub mod context;
pub mod error;
pub mod image;
pub mod repository;
pub mod resource;
pub mod storage;
pub mod task;
pub mod types;

pub use context::RequestContext;
pub use error::CoreError;
pub use image::{Image, ImageStatus, StoredImage, Visibility};
pub use repository::{MemoryRepository, Repository};
pub use resource::{DataResource, Resource};
pub use storage::{BlobStore, ByteStream, MemoryStore, StoredBlob};
pub use task::{Task, TaskExecutor, TaskStatus};
pub use types::{isotime, Timestamp};
