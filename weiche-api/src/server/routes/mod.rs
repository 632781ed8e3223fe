use crate::{
    config::ApiSettings,
    server::{ServerRouter, extract::Json, resource::Endpoint},
};
use axum::{extract::State, routing::get};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use weiche_common::serializer::{COMMENTS, POSTS, USERS};

mod comments;
mod posts;
mod users;

pub use comments::CommentHandler;
pub use posts::PostHandler;

/// Every resource listed in the API root, in order.
pub const RESOURCES: [&str; 3] = [POSTS, COMMENTS, USERS];

pub fn routes() -> ServerRouter {
    let (post_routes, post_endpoints) = posts::resource().into_parts();
    let (comment_routes, comment_endpoints) = comments::resource().into_parts();

    for endpoint in post_endpoints
        .iter()
        .chain(&comment_endpoints)
        .chain(&users::endpoints())
    {
        debug!(%endpoint, "Registering endpoint");
    }

    ServerRouter::new()
        .route("/", get(api_root))
        .merge(post_routes)
        .merge(comment_routes)
        .merge(users::routes())
}

/// Method and path template of every route besides the API root.
#[must_use]
pub fn endpoints() -> Vec<Endpoint> {
    let mut endpoints = posts::resource().endpoints().to_vec();
    endpoints.extend_from_slice(comments::resource().endpoints());
    endpoints.extend(users::endpoints());
    endpoints
}

async fn api_root(State(settings): State<Arc<ApiSettings>>) -> Json<Map<String, Value>> {
    let resources = RESOURCES
        .iter()
        .map(|name| {
            (
                (*name).to_owned(),
                Value::String(settings.links.collection(name)),
            )
        })
        .collect();

    Json(resources)
}
