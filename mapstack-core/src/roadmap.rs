//! Roadmap graphs and their versions
//!
//! A roadmap starts as an editable draft at version 1.0.0. Publishing is
//! one-way and freezes its nodes and edges; further changes go into a new
//! draft cloned from the published version. Exactly one roadmap per theme
//! carries `is_latest`.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::conn_get_theme;
use crate::db::{self, Database};
use crate::error::{CoreError, Result};
use crate::model::{Roadmap, RoadmapEdge, RoadmapGraph, RoadmapNode, RoadmapVersionInfo};
use crate::version::VersionCode;

/// A node to add to a draft roadmap
#[derive(Debug, Clone, Deserialize)]
pub struct NodeInput {
    pub handle: String,
    pub node_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub is_required: bool,
}

impl NodeInput {
    pub fn new(handle: impl Into<String>, node_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            node_type: node_type.into(),
            title: title.into(),
            description: None,
            position_x: 0.0,
            position_y: 0.0,
            metadata: empty_metadata(),
            is_required: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeUpdate {
    pub handle: Option<String>,
    pub node_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub metadata: Option<serde_json::Value>,
    pub is_required: Option<bool>,
}

/// An edge between two nodes of the same draft roadmap
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeInput {
    pub handle: String,
    pub source_node_id: Uuid,
    pub target_node_id: Uuid,
    #[serde(default = "default_edge_type")]
    pub edge_type: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

impl EdgeInput {
    pub fn new(handle: impl Into<String>, source_node_id: Uuid, target_node_id: Uuid) -> Self {
        Self {
            handle: handle.into(),
            source_node_id,
            target_node_id,
            edge_type: default_edge_type(),
            label: None,
            source_handle: None,
            target_handle: None,
            metadata: empty_metadata(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoadmapUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub theme_id: Option<Uuid>,
}

/// Optional filters for [`RoadmapVersioner::list_roadmaps`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoadmapFilter {
    pub theme_id: Option<Uuid>,
    pub is_published: Option<bool>,
    pub is_latest: Option<bool>,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_edge_type() -> String {
    "default".to_string()
}

pub(crate) fn conn_get_roadmap(conn: &Connection, id: Uuid) -> Result<Option<Roadmap>> {
    let sql = format!("SELECT {} FROM roadmaps WHERE id = ?1", Roadmap::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.to_string()], Roadmap::from_row)
        .optional()?)
}

pub(crate) fn conn_get_node(conn: &Connection, id: Uuid) -> Result<Option<RoadmapNode>> {
    let sql = format!("SELECT {} FROM roadmap_nodes WHERE id = ?1", RoadmapNode::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.to_string()], RoadmapNode::from_row)
        .optional()?)
}

fn conn_get_edge(conn: &Connection, id: Uuid) -> Result<Option<RoadmapEdge>> {
    let sql = format!("SELECT {} FROM roadmap_edges WHERE id = ?1", RoadmapEdge::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.to_string()], RoadmapEdge::from_row)
        .optional()?)
}

fn conn_nodes(conn: &Connection, roadmap_id: Uuid) -> Result<Vec<RoadmapNode>> {
    let sql = format!(
        "SELECT {} FROM roadmap_nodes WHERE roadmap_id = ?1 ORDER BY rowid",
        RoadmapNode::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let nodes = stmt
        .query_map(params![roadmap_id.to_string()], RoadmapNode::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(nodes)
}

fn conn_edges(conn: &Connection, roadmap_id: Uuid) -> Result<Vec<RoadmapEdge>> {
    let sql = format!(
        "SELECT {} FROM roadmap_edges WHERE roadmap_id = ?1 ORDER BY rowid",
        RoadmapEdge::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let edges = stmt
        .query_map(params![roadmap_id.to_string()], RoadmapEdge::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(edges)
}

fn conn_count(conn: &Connection, table: &str, roadmap_id: Uuid) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE roadmap_id = ?1", table);
    Ok(conn.query_row(&sql, params![roadmap_id.to_string()], |r| r.get(0))?)
}

fn conn_insert_roadmap(conn: &Connection, r: &Roadmap) -> Result<()> {
    conn.execute(
        "INSERT INTO roadmaps (id, theme_id, version, title, description, is_published, is_latest,
         published_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            r.id.to_string(),
            r.theme_id.to_string(),
            r.version,
            r.title,
            r.description,
            r.is_published,
            r.is_latest,
            db::opt_sql_time(&r.published_at),
            db::to_sql_time(&r.created_at),
            db::to_sql_time(&r.updated_at),
        ],
    )?;
    Ok(())
}

fn conn_insert_node(conn: &Connection, n: &RoadmapNode) -> Result<()> {
    conn.execute(
        "INSERT INTO roadmap_nodes (id, roadmap_id, handle, node_type, title, description,
         position_x, position_y, metadata, is_required, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            n.id.to_string(),
            n.roadmap_id.to_string(),
            n.handle,
            n.node_type,
            n.title,
            n.description,
            n.position_x,
            n.position_y,
            n.metadata.to_string(),
            n.is_required,
            db::to_sql_time(&n.created_at),
            db::to_sql_time(&n.updated_at),
        ],
    )?;
    Ok(())
}

fn conn_insert_edge(conn: &Connection, e: &RoadmapEdge) -> Result<()> {
    conn.execute(
        "INSERT INTO roadmap_edges (id, roadmap_id, handle, source_node_id, target_node_id,
         edge_type, label, source_handle, target_handle, metadata, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            e.id.to_string(),
            e.roadmap_id.to_string(),
            e.handle,
            e.source_node_id.to_string(),
            e.target_node_id.to_string(),
            e.edge_type,
            e.label,
            e.source_handle,
            e.target_handle,
            e.metadata.to_string(),
            db::to_sql_time(&e.created_at),
            db::to_sql_time(&e.updated_at),
        ],
    )?;
    Ok(())
}

/// The roadmap, if it exists and is still a draft
fn conn_require_draft(conn: &Connection, roadmap_id: Uuid) -> Result<Roadmap> {
    let roadmap = conn_get_roadmap(conn, roadmap_id)?.ok_or(CoreError::RoadmapNotFound(roadmap_id))?;
    if roadmap.is_published {
        return Err(CoreError::PublishedRoadmapImmutable(roadmap_id));
    }
    Ok(roadmap)
}

/// A node of `roadmap_id`; nodes of other roadmaps are reported missing
fn conn_require_node(conn: &Connection, roadmap_id: Uuid, node_id: Uuid) -> Result<RoadmapNode> {
    conn_get_node(conn, node_id)?
        .filter(|n| n.roadmap_id == roadmap_id)
        .ok_or(CoreError::NodeNotFound(node_id))
}

fn conn_delete_node(conn: &Connection, node_id: Uuid) -> Result<()> {
    let id = node_id.to_string();
    conn.execute(
        "DELETE FROM roadmap_edges WHERE source_node_id = ?1 OR target_node_id = ?1",
        params![id],
    )?;
    conn.execute("DELETE FROM node_document_links WHERE node_id = ?1", params![id])?;
    conn.execute("DELETE FROM roadmap_nodes WHERE id = ?1", params![id])?;
    Ok(())
}

/// Remove a roadmap and everything it owns
pub(crate) fn conn_delete_roadmap(conn: &Connection, roadmap_id: Uuid) -> Result<()> {
    let id = roadmap_id.to_string();
    conn.execute("DELETE FROM roadmap_edges WHERE roadmap_id = ?1", params![id])?;
    conn.execute(
        "DELETE FROM node_document_links WHERE node_id IN
         (SELECT id FROM roadmap_nodes WHERE roadmap_id = ?1)",
        params![id],
    )?;
    conn.execute("DELETE FROM roadmap_nodes WHERE roadmap_id = ?1", params![id])?;
    conn.execute("DELETE FROM roadmaps WHERE id = ?1", params![id])?;
    Ok(())
}

/// Roadmap authoring, publishing and versioning
pub struct RoadmapVersioner {
    db: Arc<Database>,
}

impl RoadmapVersioner {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a draft roadmap at version 1.0.0 and mark it latest
    pub async fn create_roadmap(
        &self,
        theme_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> Result<Roadmap> {
        let now = db::now();
        let roadmap = Roadmap {
            id: Uuid::new_v4(),
            theme_id,
            version: VersionCode::INITIAL.to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            is_published: false,
            is_latest: true,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        self.db.write(|tx| {
            conn_get_theme(tx, theme_id)?.ok_or(CoreError::ThemeNotFound(theme_id))?;
            conn_insert_roadmap(tx, &roadmap)
        })?;
        tracing::info!("Created roadmap {} for theme {}", roadmap.id, theme_id);
        Ok(roadmap)
    }

    pub async fn get_roadmap(&self, id: Uuid) -> Result<Roadmap> {
        self.db
            .read(|conn| conn_get_roadmap(conn, id))?
            .ok_or(CoreError::RoadmapNotFound(id))
    }

    pub async fn get_roadmap_graph(&self, id: Uuid) -> Result<RoadmapGraph> {
        self.db.read(|conn| {
            let roadmap = conn_get_roadmap(conn, id)?.ok_or(CoreError::RoadmapNotFound(id))?;
            Ok(RoadmapGraph {
                roadmap,
                nodes: conn_nodes(conn, id)?,
                edges: conn_edges(conn, id)?,
            })
        })
    }

    pub async fn list_roadmaps(&self, filter: &RoadmapFilter) -> Result<Vec<Roadmap>> {
        self.db.read(|conn| {
            let sql = format!(
                "SELECT {} FROM roadmaps
                 WHERE (?1 IS NULL OR theme_id = ?1)
                   AND (?2 IS NULL OR is_published = ?2)
                   AND (?3 IS NULL OR is_latest = ?3)
                 ORDER BY created_at, rowid",
                Roadmap::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![
                        filter.theme_id.map(|id| id.to_string()),
                        filter.is_published,
                        filter.is_latest
                    ],
                    Roadmap::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Update descriptive fields. Version and publish state are never
    /// touched here; a published roadmap keeps its theme.
    pub async fn update_roadmap(&self, id: Uuid, update: RoadmapUpdate) -> Result<Roadmap> {
        self.db.write(|tx| {
            let mut roadmap = conn_get_roadmap(tx, id)?.ok_or(CoreError::RoadmapNotFound(id))?;
            if let Some(theme_id) = update.theme_id {
                if theme_id != roadmap.theme_id {
                    if roadmap.is_published {
                        return Err(CoreError::PublishedRoadmapImmutable(id));
                    }
                    conn_get_theme(tx, theme_id)?.ok_or(CoreError::ThemeNotFound(theme_id))?;
                    roadmap.theme_id = theme_id;
                }
            }
            if let Some(title) = update.title {
                roadmap.title = title;
            }
            if let Some(description) = update.description {
                roadmap.description = Some(description);
            }
            roadmap.updated_at = db::now();

            tx.execute(
                "UPDATE roadmaps SET theme_id = ?2, title = ?3, description = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    roadmap.theme_id.to_string(),
                    roadmap.title,
                    roadmap.description,
                    db::to_sql_time(&roadmap.updated_at),
                ],
            )?;
            Ok(roadmap)
        })
    }

    pub async fn delete_roadmap(&self, id: Uuid) -> Result<()> {
        self.db.write(|tx| {
            conn_get_roadmap(tx, id)?.ok_or(CoreError::RoadmapNotFound(id))?;
            conn_delete_roadmap(tx, id)
        })?;
        tracing::info!("Deleted roadmap {}", id);
        Ok(())
    }

    pub async fn add_node(&self, roadmap_id: Uuid, input: NodeInput) -> Result<RoadmapNode> {
        let now = db::now();
        let node = RoadmapNode {
            id: Uuid::new_v4(),
            roadmap_id,
            handle: input.handle,
            node_type: input.node_type,
            title: input.title,
            description: input.description,
            position_x: input.position_x,
            position_y: input.position_y,
            metadata: input.metadata,
            is_required: input.is_required,
            created_at: now,
            updated_at: now,
        };
        self.db.write(|tx| {
            conn_require_draft(tx, roadmap_id)?;
            conn_insert_node(tx, &node)
        })?;
        tracing::debug!("Added node {} ({}) to roadmap {}", node.handle, node.id, roadmap_id);
        Ok(node)
    }

    pub async fn update_node(
        &self,
        roadmap_id: Uuid,
        node_id: Uuid,
        update: NodeUpdate,
    ) -> Result<RoadmapNode> {
        self.db.write(|tx| {
            conn_require_draft(tx, roadmap_id)?;
            let mut node = conn_require_node(tx, roadmap_id, node_id)?;
            if let Some(handle) = update.handle {
                node.handle = handle;
            }
            if let Some(node_type) = update.node_type {
                node.node_type = node_type;
            }
            if let Some(title) = update.title {
                node.title = title;
            }
            if let Some(description) = update.description {
                node.description = Some(description);
            }
            if let Some(x) = update.position_x {
                node.position_x = x;
            }
            if let Some(y) = update.position_y {
                node.position_y = y;
            }
            if let Some(metadata) = update.metadata {
                node.metadata = metadata;
            }
            if let Some(is_required) = update.is_required {
                node.is_required = is_required;
            }
            node.updated_at = db::now();

            tx.execute(
                "UPDATE roadmap_nodes SET handle = ?2, node_type = ?3, title = ?4, description = ?5,
                 position_x = ?6, position_y = ?7, metadata = ?8, is_required = ?9, updated_at = ?10
                 WHERE id = ?1",
                params![
                    node_id.to_string(),
                    node.handle,
                    node.node_type,
                    node.title,
                    node.description,
                    node.position_x,
                    node.position_y,
                    node.metadata.to_string(),
                    node.is_required,
                    db::to_sql_time(&node.updated_at),
                ],
            )?;
            Ok(node)
        })
    }

    /// Delete a node with its incident edges and document links
    pub async fn delete_node(&self, roadmap_id: Uuid, node_id: Uuid) -> Result<()> {
        self.db.write(|tx| {
            conn_require_draft(tx, roadmap_id)?;
            conn_require_node(tx, roadmap_id, node_id)?;
            conn_delete_node(tx, node_id)
        })
    }

    pub async fn add_edge(&self, roadmap_id: Uuid, input: EdgeInput) -> Result<RoadmapEdge> {
        let now = db::now();
        let edge = RoadmapEdge {
            id: Uuid::new_v4(),
            roadmap_id,
            handle: input.handle,
            source_node_id: input.source_node_id,
            target_node_id: input.target_node_id,
            edge_type: input.edge_type,
            label: input.label,
            source_handle: input.source_handle,
            target_handle: input.target_handle,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        };
        self.db.write(|tx| {
            conn_require_draft(tx, roadmap_id)?;
            for endpoint in [edge.source_node_id, edge.target_node_id] {
                let node = conn_get_node(tx, endpoint)?.ok_or(CoreError::NodeNotFound(endpoint))?;
                if node.roadmap_id != roadmap_id {
                    return Err(CoreError::InvalidInput(format!(
                        "node {} does not belong to roadmap {}",
                        endpoint, roadmap_id
                    )));
                }
            }
            conn_insert_edge(tx, &edge)
        })?;
        tracing::debug!("Added edge {} ({}) to roadmap {}", edge.handle, edge.id, roadmap_id);
        Ok(edge)
    }

    pub async fn delete_edge(&self, roadmap_id: Uuid, edge_id: Uuid) -> Result<()> {
        self.db.write(|tx| {
            conn_require_draft(tx, roadmap_id)?;
            conn_get_edge(tx, edge_id)?
                .filter(|e| e.roadmap_id == roadmap_id)
                .ok_or(CoreError::EdgeNotFound(edge_id))?;
            tx.execute("DELETE FROM roadmap_edges WHERE id = ?1", params![edge_id.to_string()])?;
            Ok(())
        })
    }

    /// Publish a draft. It must have at least one node, and a roadmap
    /// with several nodes must have at least one edge.
    pub async fn publish(&self, roadmap_id: Uuid) -> Result<Roadmap> {
        let roadmap = self.db.write(|tx| {
            let mut roadmap = conn_get_roadmap(tx, roadmap_id)?
                .ok_or(CoreError::RoadmapNotFound(roadmap_id))?;
            if roadmap.is_published {
                return Err(CoreError::AlreadyPublished(roadmap_id));
            }

            let node_count = conn_count(tx, "roadmap_nodes", roadmap_id)?;
            if node_count == 0 {
                return Err(CoreError::EmptyRoadmap(roadmap_id));
            }
            if node_count > 1 && conn_count(tx, "roadmap_edges", roadmap_id)? == 0 {
                return Err(CoreError::DisconnectedRoadmap(roadmap_id));
            }

            let now = db::now();
            roadmap.is_published = true;
            roadmap.published_at = Some(now);
            roadmap.updated_at = now;
            tx.execute(
                "UPDATE roadmaps SET is_published = 1, published_at = ?2, updated_at = ?2 WHERE id = ?1",
                params![roadmap_id.to_string(), db::to_sql_time(&now)],
            )?;
            Ok(roadmap)
        })?;
        tracing::info!("Published roadmap {} version {}", roadmap.id, roadmap.version);
        Ok(roadmap)
    }

    /// Copy a published roadmap into a new draft at `new_version`.
    ///
    /// The new draft becomes the theme's latest version. Nodes get fresh
    /// ids and every copied edge is rewired to the copied nodes. All
    /// writes happen in one transaction.
    pub async fn clone_for_new_version(&self, roadmap_id: Uuid, new_version: &str) -> Result<Roadmap> {
        let (roadmap, node_count, edge_count) = self.db.write(|tx| {
            let source = conn_get_roadmap(tx, roadmap_id)?
                .ok_or(CoreError::RoadmapNotFound(roadmap_id))?;
            if !source.is_published {
                return Err(CoreError::SourceNotPublished(roadmap_id));
            }

            let next = VersionCode::parse(new_version)?;
            let current = VersionCode::parse(&source.version)?;
            if next.cmp(&current) != Ordering::Greater {
                return Err(CoreError::VersionNotNewer {
                    new: new_version.to_string(),
                    current: source.version.clone(),
                });
            }

            let now = db::now();
            tx.execute(
                "UPDATE roadmaps SET is_latest = 0, updated_at = ?2 WHERE theme_id = ?1 AND is_latest = 1",
                params![source.theme_id.to_string(), db::to_sql_time(&now)],
            )?;

            let roadmap = Roadmap {
                id: Uuid::new_v4(),
                theme_id: source.theme_id,
                version: next.to_string(),
                title: source.title.clone(),
                description: source.description.clone(),
                is_published: false,
                is_latest: true,
                published_at: None,
                created_at: now,
                updated_at: now,
            };
            conn_insert_roadmap(tx, &roadmap)?;

            let nodes = conn_nodes(tx, roadmap_id)?;
            let mut id_map = HashMap::with_capacity(nodes.len());
            for node in &nodes {
                let copy = RoadmapNode {
                    id: Uuid::new_v4(),
                    roadmap_id: roadmap.id,
                    created_at: now,
                    updated_at: now,
                    ..node.clone()
                };
                conn_insert_node(tx, &copy)?;
                id_map.insert(node.id, copy.id);
            }

            let edges = conn_edges(tx, roadmap_id)?;
            let remap = |old: Uuid, edge: &RoadmapEdge| {
                id_map.get(&old).copied().ok_or_else(|| {
                    CoreError::Integrity(format!(
                        "edge {} references node {} outside roadmap {}",
                        edge.id, old, roadmap_id
                    ))
                })
            };
            for edge in &edges {
                let copy = RoadmapEdge {
                    id: Uuid::new_v4(),
                    roadmap_id: roadmap.id,
                    source_node_id: remap(edge.source_node_id, edge)?,
                    target_node_id: remap(edge.target_node_id, edge)?,
                    created_at: now,
                    updated_at: now,
                    ..edge.clone()
                };
                conn_insert_edge(tx, &copy)?;
            }

            Ok((roadmap, nodes.len(), edges.len()))
        })?;

        tracing::info!(
            "Cloned roadmap {} into {} version {} ({} nodes, {} edges)",
            roadmap_id,
            roadmap.id,
            roadmap.version,
            node_count,
            edge_count
        );
        Ok(roadmap)
    }

    /// Versions of a theme's roadmap, newest first
    pub async fn list_versions(&self, theme_id: Uuid) -> Result<Vec<RoadmapVersionInfo>> {
        self.db.read(|conn| {
            let sql = format!(
                "SELECT {} FROM roadmaps WHERE theme_id = ?1 ORDER BY created_at DESC, rowid DESC",
                Roadmap::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![theme_id.to_string()], Roadmap::from_row)?
                .map(|r| r.map(RoadmapVersionInfo::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}
