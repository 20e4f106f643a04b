//! Roadmap, graph and version endpoints

use hyper::Method;
use mapstack_core::{EdgeInput, NodeInput, NodeUpdate, RoadmapFilter, RoadmapUpdate};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{self, parse_id, parse_json, ApiResponse};
use crate::{ApiHandler, RequestContext};

#[derive(Debug, Deserialize)]
struct CreateRoadmapRequest {
    theme_id: Uuid,
    title: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewVersionRequest {
    version: String,
}

pub(crate) async fn route(
    api: &ApiHandler,
    method: &Method,
    segments: &[&str],
    ctx: &RequestContext,
) -> ApiResponse {
    match (method, segments) {
        (&Method::GET, []) => {
            let filter = RoadmapFilter {
                theme_id: ctx.query.parse_opt("theme_id")?,
                is_published: ctx.query.parse_opt("is_published")?,
                is_latest: ctx.query.parse_opt("is_latest")?,
            };
            http::ok(&api.roadmaps.list_roadmaps(&filter).await?)
        }
        (&Method::POST, []) => {
            let req: CreateRoadmapRequest = parse_json(&ctx.body)?;
            let roadmap = api
                .roadmaps
                .create_roadmap(req.theme_id, &req.title, req.description.as_deref())
                .await?;
            http::created(&roadmap)
        }
        (&Method::GET, [id]) => http::ok(&api.roadmaps.get_roadmap_graph(parse_id(id)?).await?),
        (&Method::PATCH, [id]) => {
            let update: RoadmapUpdate = parse_json(&ctx.body)?;
            http::ok(&api.roadmaps.update_roadmap(parse_id(id)?, update).await?)
        }
        (&Method::DELETE, [id]) => {
            api.roadmaps.delete_roadmap(parse_id(id)?).await?;
            http::no_content()
        }

        (&Method::POST, [id, "nodes"]) => {
            let input: NodeInput = parse_json(&ctx.body)?;
            http::created(&api.roadmaps.add_node(parse_id(id)?, input).await?)
        }
        (&Method::PATCH, [id, "nodes", node_id]) => {
            let update: NodeUpdate = parse_json(&ctx.body)?;
            let node = api
                .roadmaps
                .update_node(parse_id(id)?, parse_id(node_id)?, update)
                .await?;
            http::ok(&node)
        }
        (&Method::DELETE, [id, "nodes", node_id]) => {
            api.roadmaps.delete_node(parse_id(id)?, parse_id(node_id)?).await?;
            http::no_content()
        }

        (&Method::POST, [id, "edges"]) => {
            let input: EdgeInput = parse_json(&ctx.body)?;
            http::created(&api.roadmaps.add_edge(parse_id(id)?, input).await?)
        }
        (&Method::DELETE, [id, "edges", edge_id]) => {
            api.roadmaps.delete_edge(parse_id(id)?, parse_id(edge_id)?).await?;
            http::no_content()
        }

        (&Method::POST, [id, "publish"]) => http::ok(&api.roadmaps.publish(parse_id(id)?).await?),
        (&Method::POST, [id, "versions"]) => {
            let req: NewVersionRequest = parse_json(&ctx.body)?;
            let roadmap = api
                .roadmaps
                .clone_for_new_version(parse_id(id)?, &req.version)
                .await?;
            http::created(&roadmap)
        }

        (_, [] | [_])
        | (_, [_, "nodes" | "edges" | "publish" | "versions"])
        | (_, [_, "nodes" | "edges", _]) => Err(ApiError::MethodNotAllowed),
        _ => Err(ApiError::NotFound(format!("roadmaps/{}", segments.join("/")))),
    }
}
