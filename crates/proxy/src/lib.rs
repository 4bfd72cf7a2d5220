//! Event proxies for domain collaborators.
//!
//! [`RepositoryProxy`] and [`EntityProxy`] wrap a repository or entity and
//! publish a notification for every audited operation, forwarding
//! everything else untouched. Failures raised by the wrapped collaborator
//! leave as [`ApiError`], the caller-facing taxonomy.

pub mod entity;
pub mod error;
pub mod repository;
pub mod task;

pub use entity::EntityProxy;
pub use error::{ApiError, ApiResult};
pub use repository::RepositoryProxy;

use beacon_core::{CoreError, Resource};
use beacon_events::Notify;
use serde_json::json;

/// `<kind>.<action>`, e.g. `image.create`.
pub(crate) fn event_type<E: Resource>(action: &str) -> String {
    format!("{}.{action}", E::KIND)
}

/// Publish `{id, error}` at error severity for a failed operation, then
/// classify the failure. A failure to publish replaces the original error.
pub(crate) async fn report_failure(
    notifier: &dyn Notify,
    event_type: &str,
    id: String,
    err: CoreError,
) -> ApiError {
    let payload = json!({
        "id": id,
        "error": err.to_string(),
    });
    match notifier.error(event_type, payload).await {
        Ok(()) => err.into(),
        Err(e) => e.into(),
    }
}
