//! Category and theme endpoints

use hyper::Method;
use mapstack_core::{CategoryUpdate, NewCategory, NewTheme, ThemeUpdate};

use crate::error::ApiError;
use crate::http::{self, parse_id, parse_json, ApiResponse};
use crate::{ApiHandler, RequestContext};

pub(crate) async fn route_categories(
    api: &ApiHandler,
    method: &Method,
    segments: &[&str],
    ctx: &RequestContext,
) -> ApiResponse {
    match (method, segments) {
        (&Method::GET, []) => {
            let is_active = ctx.query.parse_opt::<bool>("is_active")?;
            http::ok(&api.catalog.list_categories(is_active).await?)
        }
        (&Method::POST, []) => {
            let input: NewCategory = parse_json(&ctx.body)?;
            http::created(&api.catalog.create_category(input).await?)
        }
        (&Method::GET, [id]) => http::ok(&api.catalog.get_category(parse_id(id)?).await?),
        (&Method::PATCH, [id]) => {
            let update: CategoryUpdate = parse_json(&ctx.body)?;
            http::ok(&api.catalog.update_category(parse_id(id)?, update).await?)
        }
        (&Method::DELETE, [id]) => {
            api.catalog.delete_category(parse_id(id)?).await?;
            http::no_content()
        }
        (_, [] | [_]) => Err(ApiError::MethodNotAllowed),
        _ => Err(ApiError::NotFound(format!("categories/{}", segments.join("/")))),
    }
}

pub(crate) async fn route_themes(
    api: &ApiHandler,
    method: &Method,
    segments: &[&str],
    ctx: &RequestContext,
) -> ApiResponse {
    match (method, segments) {
        (&Method::GET, []) => {
            let category_id = ctx.query.parse_opt("category_id")?;
            let is_active = ctx.query.parse_opt::<bool>("is_active")?;
            http::ok(&api.catalog.list_themes(category_id, is_active).await?)
        }
        (&Method::POST, []) => {
            let input: NewTheme = parse_json(&ctx.body)?;
            http::created(&api.catalog.create_theme(input).await?)
        }
        (&Method::GET, [id]) => http::ok(&api.catalog.get_theme(parse_id(id)?).await?),
        (&Method::PATCH, [id]) => {
            let update: ThemeUpdate = parse_json(&ctx.body)?;
            http::ok(&api.catalog.update_theme(parse_id(id)?, update).await?)
        }
        (&Method::DELETE, [id]) => {
            api.catalog.delete_theme(parse_id(id)?).await?;
            http::no_content()
        }
        (&Method::GET, [id, "versions"]) => {
            let theme = api.catalog.get_theme(parse_id(id)?).await?;
            http::ok(&api.roadmaps.list_versions(theme.id).await?)
        }
        (_, [] | [_] | [_, "versions"]) => Err(ApiError::MethodNotAllowed),
        _ => Err(ApiError::NotFound(format!("themes/{}", segments.join("/")))),
    }
}
