//! MapStack Core Library
//!
//! Domain logic for the MapStack roadmap platform:
//! - Semantic version arithmetic and change classification
//! - Section-level content diffing
//! - Content blob storage (local filesystem or S3-compatible bucket)
//! - Document revision management and node/document links
//! - Roadmap graph authoring, publishing and version cloning
//! - Category/theme catalog over SQLite

pub mod catalog;
pub mod config;
pub mod content;
pub mod db;
pub mod diff;
pub mod document;
pub mod error;
pub mod model;
pub mod object_storage;
pub mod roadmap;
pub mod storage;
pub mod version;

pub use catalog::{Catalog, CategoryUpdate, NewCategory, NewTheme, ThemeUpdate};
pub use config::{ConfigError, DatabaseConfig, ObjectStoreConfig, ServerConfig, Settings, StorageBackend, StorageConfig};
pub use content::{DocumentContent, DocumentSection};
pub use db::Database;
pub use diff::{DocumentRevisionDiff, SectionDiff, SectionModification};
pub use document::DocumentRevisionManager;
pub use error::{CoreError, ErrorKind, Result};
pub use model::{
    Category, Document, DocumentRevision, NodeDocumentLink, Roadmap, RoadmapEdge, RoadmapGraph,
    RoadmapNode, RoadmapVersionInfo, Theme,
};
pub use object_storage::{BucketClient, MemoryBucket, ObjectContentStore, S3BucketClient};
pub use roadmap::{EdgeInput, NodeInput, NodeUpdate, RoadmapFilter, RoadmapUpdate, RoadmapVersioner};
pub use storage::{open_content_store, ContentStore, LocalContentStore, StorageError};
pub use version::{BumpKind, BumpRequest, VersionCode};
