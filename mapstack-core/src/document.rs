//! Document revision management
//!
//! Every content change appends a revision. The snapshot blob is always
//! written before the revision row that points at it, so a committed row
//! never references a missing blob. A failed commit can leave an orphaned
//! blob behind; keys are versioned and never reused, so it is harmless.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use uuid::Uuid;

use crate::content::DocumentContent;
use crate::db::{self, Database};
use crate::diff::{revision_diff, DocumentRevisionDiff};
use crate::error::{CoreError, Result};
use crate::model::{Document, DocumentRevision, NodeDocumentLink, RoadmapNode};
use crate::roadmap::conn_get_node;
use crate::storage::ContentStore;
use crate::version::{BumpRequest, VersionCode};

const INITIAL_CHANGE_SUMMARY: &str = "Initial version";

/// Gap between consecutive link positions on a node
const ORDER_STEP: i64 = 100;

pub const DEFAULT_RELATION_TYPE: &str = "primary";

fn conn_get_document(conn: &Connection, id: Uuid) -> Result<Option<Document>> {
    let sql = format!("SELECT {} FROM documents WHERE id = ?1", Document::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.to_string()], Document::from_row)
        .optional()?)
}

fn conn_latest_revision(conn: &Connection, document_id: Uuid) -> Result<Option<DocumentRevision>> {
    let sql = format!(
        "SELECT {} FROM document_revisions WHERE document_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
        DocumentRevision::COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![document_id.to_string()], DocumentRevision::from_row)
        .optional()?)
}

fn conn_revision_by_version(
    conn: &Connection,
    document_id: Uuid,
    version: &str,
) -> Result<Option<DocumentRevision>> {
    let sql = format!(
        "SELECT {} FROM document_revisions WHERE document_id = ?1 AND version = ?2",
        DocumentRevision::COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![document_id.to_string(), version], DocumentRevision::from_row)
        .optional()?)
}

fn conn_insert_revision(conn: &Connection, r: &DocumentRevision) -> Result<()> {
    conn.execute(
        "INSERT INTO document_revisions (id, document_id, version, storage_key, change_summary,
         created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            r.id.to_string(),
            r.document_id.to_string(),
            r.version,
            r.storage_key,
            r.change_summary,
            r.created_by.map(|id| id.to_string()),
            db::to_sql_time(&r.created_at),
        ],
    )?;
    Ok(())
}

fn conn_get_link(conn: &Connection, node_id: Uuid, document_id: Uuid) -> Result<Option<NodeDocumentLink>> {
    let sql = format!(
        "SELECT {} FROM node_document_links WHERE node_id = ?1 AND document_id = ?2",
        NodeDocumentLink::COLUMNS
    );
    Ok(conn
        .query_row(
            &sql,
            params![node_id.to_string(), document_id.to_string()],
            NodeDocumentLink::from_row,
        )
        .optional()?)
}

fn conn_next_order_position(conn: &Connection, node_id: Uuid) -> Result<i64> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(order_position) FROM node_document_links WHERE node_id = ?1",
        params![node_id.to_string()],
        |r| r.get(0),
    )?;
    Ok(max.map_or(ORDER_STEP, |m| m + ORDER_STEP))
}

/// Creates documents, appends revisions and links documents to nodes
pub struct DocumentRevisionManager {
    db: Arc<Database>,
    store: Arc<dyn ContentStore>,
}

impl DocumentRevisionManager {
    pub fn new(db: Arc<Database>, store: Arc<dyn ContentStore>) -> Self {
        Self { db, store }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Create a document with its first revision, version 1.0.0
    pub async fn create_document(
        &self,
        title: &str,
        description: Option<&str>,
        content: &DocumentContent,
        created_by: Option<Uuid>,
    ) -> Result<Document> {
        let now = db::now();
        let document = Document {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        let version = VersionCode::INITIAL.to_string();

        let storage_key = self.store.save(content, document.id, &version).await?;

        let revision = DocumentRevision {
            id: Uuid::new_v4(),
            document_id: document.id,
            version,
            storage_key,
            change_summary: Some(INITIAL_CHANGE_SUMMARY.to_string()),
            created_by,
            created_at: now,
        };
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO documents (id, title, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    document.id.to_string(),
                    document.title,
                    document.description,
                    db::to_sql_time(&document.created_at),
                    db::to_sql_time(&document.updated_at),
                ],
            )?;
            conn_insert_revision(tx, &revision)
        })?;

        tracing::info!(
            "Created document {} version {} ({})",
            document.id,
            revision.version,
            self.store.backend_name()
        );
        Ok(document)
    }

    /// Append a revision with new content.
    ///
    /// With [`BumpRequest::Auto`] the bump kind is derived from the change
    /// against the latest stored content. The document title follows the
    /// content title when one is supplied.
    pub async fn update_document(
        &self,
        document_id: Uuid,
        content: &DocumentContent,
        bump: BumpRequest,
        change_summary: Option<&str>,
        created_by: Option<Uuid>,
    ) -> Result<(Document, DocumentRevision)> {
        let (mut document, latest) = self.db.read(|conn| {
            let document = conn_get_document(conn, document_id)?
                .ok_or(CoreError::DocumentNotFound(document_id))?;
            let latest = conn_latest_revision(conn, document_id)?
                .ok_or(CoreError::NoRevisionsFound(document_id))?;
            Ok((document, latest))
        })?;

        let previous = self.store.load(&latest.storage_key).await?;
        let kind = bump.resolve(&previous, content);
        let version = VersionCode::parse(&latest.version)?.bump(kind).to_string();

        // A concurrent update may have committed this version since the read
        // above; its blob must not be overwritten.
        if self
            .db
            .read(|conn| conn_revision_by_version(conn, document_id, &version))?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "document {} already has version {}",
                document_id, version
            )));
        }
        let storage_key = self.store.save(content, document_id, &version).await?;

        let now = db::now();
        let revision = DocumentRevision {
            id: Uuid::new_v4(),
            document_id,
            version,
            storage_key,
            change_summary: change_summary.map(str::to_string),
            created_by,
            created_at: now,
        };
        if let Some(title) = content.supplied_title() {
            document.title = title.to_string();
        }
        document.updated_at = now;

        self.db.write(|tx| {
            conn_insert_revision(tx, &revision)?;
            tx.execute(
                "UPDATE documents SET title = ?2, updated_at = ?3 WHERE id = ?1",
                params![
                    document_id.to_string(),
                    document.title,
                    db::to_sql_time(&document.updated_at),
                ],
            )?;
            Ok(())
        })?;

        tracing::info!(
            "Updated document {} {} -> {} ({} bump)",
            document_id,
            latest.version,
            revision.version,
            kind
        );
        Ok((document, revision))
    }

    pub async fn get_document(&self, document_id: Uuid) -> Result<Document> {
        self.db
            .read(|conn| conn_get_document(conn, document_id))?
            .ok_or(CoreError::DocumentNotFound(document_id))
    }

    /// All documents, most recently updated first
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        self.db.read(|conn| {
            let sql = format!(
                "SELECT {} FROM documents ORDER BY updated_at DESC, rowid DESC",
                Document::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let documents = stmt
                .query_map([], Document::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(documents)
        })
    }

    pub async fn get_latest_revision(&self, document_id: Uuid) -> Result<Option<DocumentRevision>> {
        self.db.read(|conn| conn_latest_revision(conn, document_id))
    }

    pub async fn get_revision_by_version(
        &self,
        document_id: Uuid,
        version: &str,
    ) -> Result<Option<DocumentRevision>> {
        self.db
            .read(|conn| conn_revision_by_version(conn, document_id, version))
    }

    /// Revisions of a document, newest first
    pub async fn list_revisions(&self, document_id: Uuid) -> Result<Vec<DocumentRevision>> {
        self.db.read(|conn| {
            conn_get_document(conn, document_id)?.ok_or(CoreError::DocumentNotFound(document_id))?;
            let sql = format!(
                "SELECT {} FROM document_revisions WHERE document_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
                DocumentRevision::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let revisions = stmt
                .query_map(params![document_id.to_string()], DocumentRevision::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(revisions)
        })
    }

    pub async fn load_content(&self, storage_key: &str) -> Result<DocumentContent> {
        Ok(self.store.load(storage_key).await?)
    }

    pub async fn get_latest_content(
        &self,
        document_id: Uuid,
    ) -> Result<(DocumentRevision, DocumentContent)> {
        let revision = self.db.read(|conn| {
            conn_get_document(conn, document_id)?.ok_or(CoreError::DocumentNotFound(document_id))?;
            conn_latest_revision(conn, document_id)?.ok_or(CoreError::NoRevisionsFound(document_id))
        })?;
        let content = self.load_content(&revision.storage_key).await?;
        Ok((revision, content))
    }

    pub async fn get_content_at(
        &self,
        document_id: Uuid,
        version: &str,
    ) -> Result<(DocumentRevision, DocumentContent)> {
        let revision = self.require_revision(document_id, version)?;
        let content = self.load_content(&revision.storage_key).await?;
        Ok((revision, content))
    }

    fn require_revision(&self, document_id: Uuid, version: &str) -> Result<DocumentRevision> {
        self.db.read(|conn| {
            conn_get_document(conn, document_id)?.ok_or(CoreError::DocumentNotFound(document_id))?;
            conn_revision_by_version(conn, document_id, version)?.ok_or_else(|| {
                CoreError::RevisionNotFound {
                    document_id,
                    version: version.to_string(),
                }
            })
        })
    }

    /// Section diff between two stored versions
    pub async fn compute_diff(
        &self,
        document_id: Uuid,
        from_version: &str,
        to_version: &str,
    ) -> Result<DocumentRevisionDiff> {
        let from = self.require_revision(document_id, from_version)?;
        let to = self.require_revision(document_id, to_version)?;

        let old = self.load_content(&from.storage_key).await?;
        let new = self.load_content(&to.storage_key).await?;
        Ok(revision_diff(&old, &new, &from.version, &to.version))
    }

    /// Link a document to a node, or update the existing link.
    ///
    /// Without an explicit position a new link goes after the node's
    /// current last link; an existing link keeps its position.
    pub async fn link_node_document(
        &self,
        node_id: Uuid,
        document_id: Uuid,
        relation_type: &str,
        order_position: Option<i64>,
    ) -> Result<NodeDocumentLink> {
        let link = self.db.write(|tx| {
            conn_get_node(tx, node_id)?.ok_or(CoreError::NodeNotFound(node_id))?;
            conn_get_document(tx, document_id)?.ok_or(CoreError::DocumentNotFound(document_id))?;

            if let Some(mut link) = conn_get_link(tx, node_id, document_id)? {
                link.relation_type = relation_type.to_string();
                if let Some(position) = order_position {
                    link.order_position = position;
                }
                tx.execute(
                    "UPDATE node_document_links SET relation_type = ?2, order_position = ?3 WHERE id = ?1",
                    params![link.id.to_string(), link.relation_type, link.order_position],
                )?;
                return Ok(link);
            }

            let order_position = match order_position {
                Some(position) => position,
                None => conn_next_order_position(tx, node_id)?,
            };
            let link = NodeDocumentLink {
                id: Uuid::new_v4(),
                node_id,
                document_id,
                order_position,
                relation_type: relation_type.to_string(),
                created_at: db::now(),
            };
            tx.execute(
                "INSERT INTO node_document_links (id, node_id, document_id, order_position,
                 relation_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    link.id.to_string(),
                    link.node_id.to_string(),
                    link.document_id.to_string(),
                    link.order_position,
                    link.relation_type,
                    db::to_sql_time(&link.created_at),
                ],
            )?;
            Ok(link)
        })?;
        tracing::debug!(
            "Linked document {} to node {} at {}",
            document_id,
            node_id,
            link.order_position
        );
        Ok(link)
    }

    /// Remove a link; false when there was none
    pub async fn unlink_node_document(&self, node_id: Uuid, document_id: Uuid) -> Result<bool> {
        let removed = self.db.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM node_document_links WHERE node_id = ?1 AND document_id = ?2",
                params![node_id.to_string(), document_id.to_string()],
            )?)
        })?;
        Ok(removed > 0)
    }

    /// A node and its linked documents in link order
    pub async fn get_node_documents(&self, node_id: Uuid) -> Result<(RoadmapNode, Vec<Document>)> {
        self.db.read(|conn| {
            let node = conn_get_node(conn, node_id)?.ok_or(CoreError::NodeNotFound(node_id))?;
            let sql = "SELECT d.id, d.title, d.description, d.created_at, d.updated_at
                       FROM documents d
                       JOIN node_document_links l ON l.document_id = d.id
                       WHERE l.node_id = ?1
                       ORDER BY l.order_position, l.rowid";
            let mut stmt = conn.prepare(sql)?;
            let documents = stmt
                .query_map(params![node_id.to_string()], Document::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((node, documents))
        })
    }

    /// Delete a document with its links and revisions. Blob removal
    /// afterwards is best effort.
    pub async fn delete_document(&self, document_id: Uuid) -> Result<()> {
        let keys = self.db.write(|tx| {
            conn_get_document(tx, document_id)?.ok_or(CoreError::DocumentNotFound(document_id))?;
            let id = document_id.to_string();

            let mut stmt = tx.prepare("SELECT storage_key FROM document_revisions WHERE document_id = ?1")?;
            let keys = stmt
                .query_map(params![id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            tx.execute("DELETE FROM node_document_links WHERE document_id = ?1", params![id])?;
            tx.execute("DELETE FROM document_revisions WHERE document_id = ?1", params![id])?;
            tx.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
            Ok(keys)
        })?;

        for key in &keys {
            if let Err(e) = self.store.delete(key).await {
                tracing::warn!("Failed to delete blob {}: {}", key, e);
            }
        }
        tracing::info!("Deleted document {} ({} revisions)", document_id, keys.len());
        Ok(())
    }
}
