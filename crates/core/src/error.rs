/// Failures raised by domain collaborators (repositories, entities, blob
/// stores).
///
/// These are internal conditions. The proxy layer classifies them into the
/// caller-facing taxonomy before they leave the service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage full: {0}")]
    StorageFull(String),

    #[error("Storage write denied: {0}")]
    StorageWriteDenied(String),

    #[error("Size mismatch: expected {expected} bytes, received {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
