//! MapStack REST API
//!
//! JSON over HTTP under `/api/v1`, served with hyper. The handler owns the
//! core services and routes each request by method and path segments.

pub mod catalog;
pub mod documents;
pub mod error;
pub mod http;
pub mod roadmaps;

pub use error::ApiError;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Method, Request, Response};
use mapstack_core::{Catalog, ContentStore, Database, DocumentRevisionManager, RoadmapVersioner};
use std::sync::Arc;

use crate::http::{read_body, ApiResponse, Query};

/// API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Enable debug logging
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10 MB
            debug: false,
        }
    }
}

/// REST request handler
pub struct ApiHandler {
    config: Config,
    pub(crate) documents: DocumentRevisionManager,
    pub(crate) roadmaps: RoadmapVersioner,
    pub(crate) catalog: Catalog,
    pub(crate) store: Arc<dyn ContentStore>,
}

/// Parsed pieces of a request passed to route handlers
pub(crate) struct RequestContext {
    pub query: Query,
    pub body: Bytes,
}

impl ApiHandler {
    pub fn new(config: Config, db: Arc<Database>, store: Arc<dyn ContentStore>) -> Self {
        Self {
            config,
            documents: DocumentRevisionManager::new(db.clone(), store.clone()),
            roadmaps: RoadmapVersioner::new(db.clone()),
            catalog: Catalog::new(db),
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle a request. Failures are rendered as JSON error responses.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        if self.config.debug {
            tracing::debug!("API request: {} {}", method, req.uri());
        }

        let response = match self.dispatch(req).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        };

        tracing::info!("{} {} -> {}", method, path, response.status().as_u16());
        response
    }

    async fn dispatch<B>(&self, req: Request<B>) -> ApiResponse
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let ctx = RequestContext {
            query: Query::parse(parts.uri.query()),
            body: read_body(body, self.config.max_body_size).await?,
        };

        let path = parts.uri.path();
        if path.trim_end_matches('/') == "/health" {
            return self.health(&parts.method);
        }

        let rest = path
            .strip_prefix("/api/v1")
            .ok_or_else(|| ApiError::NotFound(path.to_string()))?;
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        match segments.first().copied() {
            Some("documents") => documents::route(self, &parts.method, &segments[1..], &ctx).await,
            Some("nodes") => documents::route_nodes(self, &parts.method, &segments[1..], &ctx).await,
            Some("categories") => catalog::route_categories(self, &parts.method, &segments[1..], &ctx).await,
            Some("themes") => catalog::route_themes(self, &parts.method, &segments[1..], &ctx).await,
            Some("roadmaps") => roadmaps::route(self, &parts.method, &segments[1..], &ctx).await,
            _ => Err(ApiError::NotFound(path.to_string())),
        }
    }

    fn health(&self, method: &Method) -> ApiResponse {
        if *method != Method::GET {
            return Err(ApiError::MethodNotAllowed);
        }
        http::ok(&serde_json::json!({
            "status": "ok",
            "storage": self.store.backend_name(),
        }))
    }
}
