//! Document and node-link endpoints

use hyper::Method;
use mapstack_core::document::DEFAULT_RELATION_TYPE;
use mapstack_core::{BumpRequest, Document, DocumentContent, DocumentRevision, RoadmapNode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{self, parse_id, parse_json, ApiResponse};
use crate::{ApiHandler, RequestContext};

#[derive(Debug, Deserialize)]
struct CreateDocumentRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    content: serde_json::Value,
    #[serde(default)]
    created_by: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct UpdateDocumentRequest {
    content: serde_json::Value,
    #[serde(default)]
    change_summary: Option<String>,
    #[serde(default)]
    version_type: Option<String>,
    #[serde(default)]
    created_by: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct LinkRequest {
    document_id: Uuid,
    #[serde(default)]
    relation_type: Option<String>,
    #[serde(default)]
    order_position: Option<i64>,
}

#[derive(Debug, Serialize)]
struct DocumentDetail {
    #[serde(flatten)]
    document: Document,
    latest_revision: Option<DocumentRevision>,
}

#[derive(Debug, Serialize)]
struct UpdatedDocument {
    document: Document,
    revision: DocumentRevision,
}

#[derive(Debug, Serialize)]
struct RevisionContent {
    document_id: Uuid,
    revision: DocumentRevision,
    content: DocumentContent,
}

#[derive(Debug, Serialize)]
struct NodeDocuments {
    node: RoadmapNode,
    documents: Vec<Document>,
}

/// `/api/v1/documents/...`
pub(crate) async fn route(
    api: &ApiHandler,
    method: &Method,
    segments: &[&str],
    ctx: &RequestContext,
) -> ApiResponse {
    match (method, segments) {
        (&Method::GET, []) => http::ok(&api.documents.list_documents().await?),
        (&Method::POST, []) => create(api, ctx).await,
        (&Method::GET, [id]) => detail(api, parse_id(id)?).await,
        (&Method::PUT, [id]) => update(api, parse_id(id)?, ctx).await,
        (&Method::DELETE, [id]) => {
            api.documents.delete_document(parse_id(id)?).await?;
            http::no_content()
        }
        (&Method::GET, [id, "content"]) => {
            let id = parse_id(id)?;
            let (revision, content) = api.documents.get_latest_content(id).await?;
            http::ok(&RevisionContent {
                document_id: id,
                revision,
                content,
            })
        }
        (&Method::GET, [id, "content", "version", version]) => {
            let id = parse_id(id)?;
            let (revision, content) = api.documents.get_content_at(id, version).await?;
            http::ok(&RevisionContent {
                document_id: id,
                revision,
                content,
            })
        }
        (&Method::GET, [id, "revisions"]) => {
            http::ok(&api.documents.list_revisions(parse_id(id)?).await?)
        }
        (&Method::GET, [id, "diff"]) => {
            let from = ctx.query.require("from_version")?;
            let to = ctx.query.require("to_version")?;
            http::ok(&api.documents.compute_diff(parse_id(id)?, from, to).await?)
        }
        (_, [] | [_])
        | (_, [_, "content" | "revisions" | "diff"])
        | (_, [_, "content", "version", _]) => Err(ApiError::MethodNotAllowed),
        _ => Err(ApiError::NotFound(format!("documents/{}", segments.join("/")))),
    }
}

async fn create(api: &ApiHandler, ctx: &RequestContext) -> ApiResponse {
    let req: CreateDocumentRequest = parse_json(&ctx.body)?;
    let content = DocumentContent::from_value(req.content)?;
    let document = api
        .documents
        .create_document(&req.title, req.description.as_deref(), &content, req.created_by)
        .await?;
    let latest_revision = api.documents.get_latest_revision(document.id).await?;
    http::created(&DocumentDetail {
        document,
        latest_revision,
    })
}

async fn detail(api: &ApiHandler, id: Uuid) -> ApiResponse {
    let document = api.documents.get_document(id).await?;
    let latest_revision = api.documents.get_latest_revision(id).await?;
    http::ok(&DocumentDetail {
        document,
        latest_revision,
    })
}

async fn update(api: &ApiHandler, id: Uuid, ctx: &RequestContext) -> ApiResponse {
    let req: UpdateDocumentRequest = parse_json(&ctx.body)?;
    let content = DocumentContent::from_value(req.content)?;
    let bump: BumpRequest = match req.version_type.as_deref() {
        Some(kind) => kind.parse()?,
        None => BumpRequest::Auto,
    };
    let (document, revision) = api
        .documents
        .update_document(id, &content, bump, req.change_summary.as_deref(), req.created_by)
        .await?;
    http::ok(&UpdatedDocument { document, revision })
}

/// `/api/v1/nodes/{id}/documents[/{document_id}]`
pub(crate) async fn route_nodes(
    api: &ApiHandler,
    method: &Method,
    segments: &[&str],
    ctx: &RequestContext,
) -> ApiResponse {
    match (method, segments) {
        (&Method::GET, [node_id, "documents"]) => {
            let (node, documents) = api.documents.get_node_documents(parse_id(node_id)?).await?;
            http::ok(&NodeDocuments { node, documents })
        }
        (&Method::POST, [node_id, "documents"]) => {
            let req: LinkRequest = parse_json(&ctx.body)?;
            let relation_type = req.relation_type.as_deref().unwrap_or(DEFAULT_RELATION_TYPE);
            let link = api
                .documents
                .link_node_document(parse_id(node_id)?, req.document_id, relation_type, req.order_position)
                .await?;
            http::created(&link)
        }
        (&Method::DELETE, [node_id, "documents", document_id]) => {
            let node_id = parse_id(node_id)?;
            let document_id = parse_id(document_id)?;
            if api.documents.unlink_node_document(node_id, document_id).await? {
                http::no_content()
            } else {
                Err(ApiError::NotFound(format!(
                    "link between node {} and document {}",
                    node_id, document_id
                )))
            }
        }
        (_, [_, "documents"]) | (_, [_, "documents", _]) => Err(ApiError::MethodNotAllowed),
        _ => Err(ApiError::NotFound(format!("nodes/{}", segments.join("/")))),
    }
}
