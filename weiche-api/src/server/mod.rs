use crate::config::ApiSettings;
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use extract::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;
use weiche_common::{
    model::{
        Id,
        auth::{AccessTokenDecodeError, AccessTokenHashError},
        comment::CommentMarker,
        post::PostMarker,
        user::UserMarker,
    },
    pagination::PaginationError,
    serializer::ValidationErrors,
};
use weiche_db::client::{DbClient, DbError};

pub mod auth;
pub mod extract;
pub mod render;
pub mod resource;
mod routes;

pub use routes::{CommentHandler, PostHandler, RESOURCES, endpoints};

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub settings: Arc<ApiSettings>,
}

impl ServerState {
    #[must_use]
    pub fn new(db_client: DbClient, settings: ApiSettings) -> Self {
        Self {
            db_client: Arc::new(db_client),
            settings: Arc::new(settings),
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes()
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(fallback)
}

/// The complete application, ready to be served.
pub fn app(state: ServerState) -> Router {
    routes().with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub async fn method_not_allowed(request: Request) -> ServerError {
    let (parts, _) = request.into_parts();
    ServerError::MethodNotAllowed(parts.method, parts.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Method \"{0}\" not allowed.")]
    MethodNotAllowed(Method, Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided access token could not be decoded: {0}")]
    InvalidAccessToken(#[from] AccessTokenDecodeError),
    #[error("The access token could not be hashed: {0}")]
    AccessTokenHash(#[from] AccessTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
}

impl ServerError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::Pagination(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAccessToken(_)
            | ServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden => StatusCode::FORBIDDEN,
            ServerError::MethodNotAllowed(..) => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::Validation(_)
            | ServerError::Database(DbError::HandleTaken(_) | DbError::MissingReference) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AccessTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client gets to read about the error.
    fn detail(&self) -> String {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => "Not found.".to_owned(),
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                "Authentication credentials were not provided.".to_owned()
            }
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAccessToken(_)
            | ServerError::InvalidToken => "Invalid token.".to_owned(),
            ServerError::JsonResponse(_)
            | ServerError::AccessTokenHash(_)
            | ServerError::Database(
                DbError::Data(_) | DbError::Snowflake(_) | DbError::Migrate(_) | DbError::Sqlx(_),
            ) => {
                "A server error occurred.".to_owned()
            }
            _ => self.to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub detail: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        if let ServerError::Validation(errors) = self {
            return (status, Json(errors)).into_response();
        }

        let error_response = ErrorResponse {
            status: status.as_u16(),
            detail: self.detail(),
        };
        (status, Json(error_response)).into_response()
    }
}
