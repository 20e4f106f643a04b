//! Domain error taxonomy
//!
//! Every core operation returns one of these kinds. Lower-level failures
//! (SQLite, blob storage) are translated here and never escape raw.

use uuid::Uuid;

use crate::storage::StorageError;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Coarse classification of a [`CoreError`], used by transport layers
/// to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    StateConflict,
    Storage,
    Internal,
}

/// Errors raised by core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    // Not found
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Node not found: {0}")]
    NodeNotFound(Uuid),

    #[error("Edge not found: {0}")]
    EdgeNotFound(Uuid),

    #[error("Roadmap not found: {0}")]
    RoadmapNotFound(Uuid),

    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    #[error("Theme not found: {0}")]
    ThemeNotFound(Uuid),

    #[error("Revision {version} not found for document {document_id}")]
    RevisionNotFound { document_id: Uuid, version: String },

    #[error("No revisions found for document {0}")]
    NoRevisionsFound(Uuid),

    #[error("Content not found: {0}")]
    ContentNotFound(String),

    // Validation
    #[error("Invalid version format: {0}")]
    InvalidVersionFormat(String),

    #[error("Invalid bump kind: {0}")]
    InvalidBumpKind(String),

    #[error("New version {new} must be greater than current version {current}")]
    VersionNotNewer { new: String, current: String },

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // State conflicts
    #[error("Roadmap {0} is already published")]
    AlreadyPublished(Uuid),

    #[error("Roadmap {0} must be published before a new version can be created")]
    SourceNotPublished(Uuid),

    #[error("Cannot publish roadmap {0} with no nodes")]
    EmptyRoadmap(Uuid),

    #[error("Roadmap {0} has multiple nodes but no edges")]
    DisconnectedRoadmap(Uuid),

    #[error("Roadmap {0} is published and cannot be modified")]
    PublishedRoadmapImmutable(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Storage / internal
    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Data integrity violation: {0}")]
    Integrity(String),
}

impl CoreError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::DocumentNotFound(_)
            | CoreError::NodeNotFound(_)
            | CoreError::EdgeNotFound(_)
            | CoreError::RoadmapNotFound(_)
            | CoreError::CategoryNotFound(_)
            | CoreError::ThemeNotFound(_)
            | CoreError::RevisionNotFound { .. }
            | CoreError::NoRevisionsFound(_)
            | CoreError::ContentNotFound(_) => ErrorKind::NotFound,

            CoreError::InvalidVersionFormat(_)
            | CoreError::InvalidBumpKind(_)
            | CoreError::VersionNotNewer { .. }
            | CoreError::InvalidContent(_)
            | CoreError::InvalidInput(_) => ErrorKind::Validation,

            CoreError::AlreadyPublished(_)
            | CoreError::SourceNotPublished(_)
            | CoreError::EmptyRoadmap(_)
            | CoreError::DisconnectedRoadmap(_)
            | CoreError::PublishedRoadmapImmutable(_)
            | CoreError::Conflict(_) => ErrorKind::StateConflict,

            CoreError::Storage(_) => ErrorKind::Storage,

            CoreError::Database(_) | CoreError::Integrity(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::DocumentNotFound(_) => "ERR_DOCUMENT_NOT_FOUND",
            CoreError::NodeNotFound(_) => "ERR_NODE_NOT_FOUND",
            CoreError::EdgeNotFound(_) => "ERR_EDGE_NOT_FOUND",
            CoreError::RoadmapNotFound(_) => "ERR_ROADMAP_NOT_FOUND",
            CoreError::CategoryNotFound(_) => "ERR_CATEGORY_NOT_FOUND",
            CoreError::ThemeNotFound(_) => "ERR_THEME_NOT_FOUND",
            CoreError::RevisionNotFound { .. } => "ERR_REVISION_NOT_FOUND",
            CoreError::NoRevisionsFound(_) => "ERR_NO_REVISIONS_FOUND",
            CoreError::ContentNotFound(_) => "ERR_CONTENT_NOT_FOUND",
            CoreError::InvalidVersionFormat(_) => "ERR_INVALID_VERSION_FORMAT",
            CoreError::InvalidBumpKind(_) => "ERR_INVALID_BUMP_KIND",
            CoreError::VersionNotNewer { .. } => "ERR_VERSION_NOT_NEWER",
            CoreError::InvalidContent(_) => "ERR_INVALID_CONTENT",
            CoreError::InvalidInput(_) => "ERR_INVALID_INPUT",
            CoreError::AlreadyPublished(_) => "ERR_ALREADY_PUBLISHED",
            CoreError::SourceNotPublished(_) => "ERR_SOURCE_NOT_PUBLISHED",
            CoreError::EmptyRoadmap(_) => "ERR_EMPTY_ROADMAP",
            CoreError::DisconnectedRoadmap(_) => "ERR_DISCONNECTED_ROADMAP",
            CoreError::PublishedRoadmapImmutable(_) => "ERR_PUBLISHED_ROADMAP_IMMUTABLE",
            CoreError::Conflict(_) => "ERR_CONFLICT",
            CoreError::Storage(_) => "ERR_STORAGE",
            CoreError::Database(_) => "ERR_DATABASE",
            CoreError::Integrity(_) => "ERR_INTEGRITY",
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => CoreError::ContentNotFound(key),
            other => CoreError::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                CoreError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => CoreError::Database(err.to_string()),
        }
    }
}
