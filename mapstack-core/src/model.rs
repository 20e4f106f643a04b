//! Persisted records
//!
//! Each record knows its column list and how to decode itself from a row
//! selected with those columns, in order.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{get_json, get_opt_time, get_opt_uuid, get_time, get_uuid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub(crate) const COLUMNS: &'static str =
        "id, code, title, description, order_index, is_active, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_uuid(row, 0)?,
            code: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            order_index: row.get(4)?,
            is_active: row.get(5)?,
            created_at: get_time(row, 6)?,
            updated_at: get_time(row, 7)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: Uuid,
    pub category_id: Uuid,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Theme {
    pub(crate) const COLUMNS: &'static str =
        "id, category_id, code, title, description, order_index, is_active, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_uuid(row, 0)?,
            category_id: get_uuid(row, 1)?,
            code: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            order_index: row.get(5)?,
            is_active: row.get(6)?,
            created_at: get_time(row, 7)?,
            updated_at: get_time(row, 8)?,
        })
    }
}

/// One version of a theme's learning graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    pub id: Uuid,
    pub theme_id: Uuid,
    pub version: String,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub is_latest: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Roadmap {
    pub(crate) const COLUMNS: &'static str = "id, theme_id, version, title, description, \
         is_published, is_latest, published_at, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_uuid(row, 0)?,
            theme_id: get_uuid(row, 1)?,
            version: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            is_published: row.get(5)?,
            is_latest: row.get(6)?,
            published_at: get_opt_time(row, 7)?,
            created_at: get_time(row, 8)?,
            updated_at: get_time(row, 9)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapNode {
    pub id: Uuid,
    pub roadmap_id: Uuid,
    pub handle: String,
    pub node_type: String,
    pub title: String,
    pub description: Option<String>,
    pub position_x: f64,
    pub position_y: f64,
    pub metadata: serde_json::Value,
    pub is_required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoadmapNode {
    pub(crate) const COLUMNS: &'static str = "id, roadmap_id, handle, node_type, title, description, \
         position_x, position_y, metadata, is_required, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_uuid(row, 0)?,
            roadmap_id: get_uuid(row, 1)?,
            handle: row.get(2)?,
            node_type: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            position_x: row.get(6)?,
            position_y: row.get(7)?,
            metadata: get_json(row, 8)?,
            is_required: row.get(9)?,
            created_at: get_time(row, 10)?,
            updated_at: get_time(row, 11)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapEdge {
    pub id: Uuid,
    pub roadmap_id: Uuid,
    pub handle: String,
    pub source_node_id: Uuid,
    pub target_node_id: Uuid,
    pub edge_type: String,
    pub label: Option<String>,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoadmapEdge {
    pub(crate) const COLUMNS: &'static str = "id, roadmap_id, handle, source_node_id, target_node_id, \
         edge_type, label, source_handle, target_handle, metadata, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_uuid(row, 0)?,
            roadmap_id: get_uuid(row, 1)?,
            handle: row.get(2)?,
            source_node_id: get_uuid(row, 3)?,
            target_node_id: get_uuid(row, 4)?,
            edge_type: row.get(5)?,
            label: row.get(6)?,
            source_handle: row.get(7)?,
            target_handle: row.get(8)?,
            metadata: get_json(row, 9)?,
            created_at: get_time(row, 10)?,
            updated_at: get_time(row, 11)?,
        })
    }
}

/// A roadmap together with its nodes and edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapGraph {
    #[serde(flatten)]
    pub roadmap: Roadmap,
    pub nodes: Vec<RoadmapNode>,
    pub edges: Vec<RoadmapEdge>,
}

/// Summary row for version listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapVersionInfo {
    pub id: Uuid,
    pub version: String,
    pub title: String,
    pub is_published: bool,
    pub is_latest: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Roadmap> for RoadmapVersionInfo {
    fn from(r: Roadmap) -> Self {
        Self {
            id: r.id,
            version: r.version,
            title: r.title,
            is_published: r.is_published,
            is_latest: r.is_latest,
            published_at: r.published_at,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub(crate) const COLUMNS: &'static str = "id, title, description, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_uuid(row, 0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            created_at: get_time(row, 3)?,
            updated_at: get_time(row, 4)?,
        })
    }
}

/// Immutable index row for one stored content snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRevision {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version: String,
    pub storage_key: String,
    pub change_summary: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl DocumentRevision {
    pub(crate) const COLUMNS: &'static str =
        "id, document_id, version, storage_key, change_summary, created_by, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_uuid(row, 0)?,
            document_id: get_uuid(row, 1)?,
            version: row.get(2)?,
            storage_key: row.get(3)?,
            change_summary: row.get(4)?,
            created_by: get_opt_uuid(row, 5)?,
            created_at: get_time(row, 6)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDocumentLink {
    pub id: Uuid,
    pub node_id: Uuid,
    pub document_id: Uuid,
    pub order_position: i64,
    pub relation_type: String,
    pub created_at: DateTime<Utc>,
}

impl NodeDocumentLink {
    pub(crate) const COLUMNS: &'static str =
        "id, node_id, document_id, order_position, relation_type, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_uuid(row, 0)?,
            node_id: get_uuid(row, 1)?,
            document_id: get_uuid(row, 2)?,
            order_position: row.get(3)?,
            relation_type: row.get(4)?,
            created_at: get_time(row, 5)?,
        })
    }
}
