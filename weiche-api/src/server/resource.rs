//! Generic handling of a resource exposed as a collection of items.
//!
//! A [`ResourceHandler`] implements the five operations on a resource. A
//! [`ResourceRouter`] derives the routes for it from the resource name:
//!
//! | path                    | methods                    |
//! |-------------------------|----------------------------|
//! | `/{name}`               | `GET` list, `POST` create  |
//! | `/{name}/{id}`          | `GET`, `PUT`, `PATCH`, `DELETE` |
//! | `/{name}/{action}`      | declared collection actions |
//! | `/{name}/{id}/{action}` | declared detail actions    |

use crate::server::{
    Result, ServerRouter, ServerState,
    auth::AuthenticatedUser,
    extract::{Json, Path, Query},
    render::{ListRequest, RenderQuery},
};
use axum::{
    extract::State,
    handler::Handler,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{MethodFilter, get, on},
};
use serde_json::Value;
use std::{
    fmt::{Display, Formatter},
    future::Future,
    marker::PhantomData,
};
use weiche_common::{model::Id, pagination::PageQuery};

/// Body and status of a handled request.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl Reply {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    #[must_use]
    pub fn created(body: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Some(body),
        }
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// The operations behind the generated routes of one resource.
///
/// Reads are open, writes carry the acting user.
pub trait ResourceHandler: Send + Sync + 'static {
    /// First path segment of every route, also the key in the API root.
    const NAME: &'static str;

    type Marker: Send + Sync + 'static;

    fn list(state: &ServerState, request: ListRequest) -> impl Future<Output = Result<Reply>> + Send;

    fn retrieve(
        state: &ServerState,
        id: Id<Self::Marker>,
        render: RenderQuery,
    ) -> impl Future<Output = Result<Reply>> + Send;

    fn create(
        state: &ServerState,
        user: AuthenticatedUser,
        render: RenderQuery,
        data: Value,
    ) -> impl Future<Output = Result<Reply>> + Send;

    /// Replaces the item, or only the fields present in `data` when `partial`.
    fn update(
        state: &ServerState,
        user: AuthenticatedUser,
        id: Id<Self::Marker>,
        render: RenderQuery,
        data: Value,
        partial: bool,
    ) -> impl Future<Output = Result<Reply>> + Send;

    fn destroy(
        state: &ServerState,
        user: AuthenticatedUser,
        id: Id<Self::Marker>,
    ) -> impl Future<Output = Result<Reply>> + Send;
}

async fn list<H: ResourceHandler>(
    State(state): State<ServerState>,
    uri: Uri,
    Query(render): Query<RenderQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Reply> {
    H::list(&state, ListRequest::new(&uri, render, page)).await
}

async fn retrieve<H: ResourceHandler>(
    State(state): State<ServerState>,
    Path(id): Path<Id<H::Marker>>,
    Query(render): Query<RenderQuery>,
) -> Result<Reply> {
    H::retrieve(&state, id, render).await
}

async fn create<H: ResourceHandler>(
    State(state): State<ServerState>,
    user: AuthenticatedUser,
    Query(render): Query<RenderQuery>,
    Json(data): Json<Value>,
) -> Result<Reply> {
    H::create(&state, user, render, data).await
}

async fn update<H: ResourceHandler>(
    State(state): State<ServerState>,
    user: AuthenticatedUser,
    Path(id): Path<Id<H::Marker>>,
    Query(render): Query<RenderQuery>,
    Json(data): Json<Value>,
) -> Result<Reply> {
    H::update(&state, user, id, render, data, false).await
}

async fn partial_update<H: ResourceHandler>(
    State(state): State<ServerState>,
    user: AuthenticatedUser,
    Path(id): Path<Id<H::Marker>>,
    Query(render): Query<RenderQuery>,
    Json(data): Json<Value>,
) -> Result<Reply> {
    H::update(&state, user, id, render, data, true).await
}

async fn destroy<H: ResourceHandler>(
    State(state): State<ServerState>,
    user: AuthenticatedUser,
    Path(id): Path<Id<H::Marker>>,
) -> Result<Reply> {
    H::destroy(&state, user, id).await
}

/// Method an extra action is bound to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ActionMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl ActionMethod {
    fn filter(self) -> MethodFilter {
        match self {
            ActionMethod::Get => MethodFilter::GET,
            ActionMethod::Post => MethodFilter::POST,
            ActionMethod::Put => MethodFilter::PUT,
            ActionMethod::Patch => MethodFilter::PATCH,
            ActionMethod::Delete => MethodFilter::DELETE,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActionMethod::Get => "GET",
            ActionMethod::Post => "POST",
            ActionMethod::Put => "PUT",
            ActionMethod::Patch => "PATCH",
            ActionMethod::Delete => "DELETE",
        }
    }
}

/// A generated route: one method on one path template.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Endpoint {
    pub method: ActionMethod,
    pub path: String,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method.as_str(), self.path)
    }
}

pub struct ResourceRouter<H> {
    router: ServerRouter,
    endpoints: Vec<Endpoint>,
    handler: PhantomData<H>,
}

impl<H: ResourceHandler> ResourceRouter<H> {
    #[must_use]
    pub fn new() -> Self {
        let collection_path = format!("/{}", H::NAME);
        let item_path = format!("/{}/{{id}}", H::NAME);

        let router = ServerRouter::new()
            .route(&collection_path, get(list::<H>).post(create::<H>))
            .route(
                &item_path,
                get(retrieve::<H>)
                    .put(update::<H>)
                    .patch(partial_update::<H>)
                    .delete(destroy::<H>),
            );

        let endpoints = [
            (ActionMethod::Get, &collection_path),
            (ActionMethod::Post, &collection_path),
            (ActionMethod::Get, &item_path),
            (ActionMethod::Put, &item_path),
            (ActionMethod::Patch, &item_path),
            (ActionMethod::Delete, &item_path),
        ]
        .into_iter()
        .map(|(method, path)| Endpoint {
            method,
            path: path.clone(),
        })
        .collect();

        Self {
            router,
            endpoints,
            handler: PhantomData,
        }
    }

    /// Adds `/{name}/{id}/{action}`. The handler extracts the id itself.
    #[must_use]
    pub fn detail_action<F, T>(self, action: &str, method: ActionMethod, handler: F) -> Self
    where
        F: Handler<T, ServerState>,
        T: 'static,
    {
        let path = format!("/{}/{{id}}/{action}", H::NAME);
        self.action(path, method, handler)
    }

    /// Adds `/{name}/{action}`.
    #[must_use]
    pub fn collection_action<F, T>(self, action: &str, method: ActionMethod, handler: F) -> Self
    where
        F: Handler<T, ServerState>,
        T: 'static,
    {
        let path = format!("/{}/{action}", H::NAME);
        self.action(path, method, handler)
    }

    fn action<F, T>(mut self, path: String, method: ActionMethod, handler: F) -> Self
    where
        F: Handler<T, ServerState>,
        T: 'static,
    {
        self.router = self.router.route(&path, on(method.filter(), handler));
        self.endpoints.push(Endpoint { method, path });
        self
    }

    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    #[must_use]
    pub fn into_parts(self) -> (ServerRouter, Vec<Endpoint>) {
        (self.router, self.endpoints)
    }
}

impl<H: ResourceHandler> Default for ResourceRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}
