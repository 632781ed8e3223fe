use crate::server::{
    Result, ServerError, ServerRouter, ServerState,
    extract::{Json, Query},
    render::{ListRequest, RenderQuery, Renderer},
    resource::{ActionMethod, Endpoint, Reply},
    routes::comments,
};
use axum::{extract::State, http::Uri};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use serde_json::{Value, json};
use time::UtcDateTime;
use tracing::{error, info};
use weiche_common::{
    model::{
        Id,
        auth::{AccessToken, Authentication},
        user::{User, UserMarker},
    },
    pagination::PageQuery,
    serializer::{RelatedRecords, SerializerContext, UserSerializer, ValidationErrors},
};
use weiche_db::client::DbError;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_users)
        .typed_post(register_user)
        .typed_get(get_user)
        .typed_get(get_user_comments)
}

pub fn endpoints() -> Vec<Endpoint> {
    [
        (ActionMethod::Get, UsersPath::PATH),
        (ActionMethod::Post, UsersPath::PATH),
        (ActionMethod::Get, UserPath::PATH),
        (ActionMethod::Get, UserCommentsPath::PATH),
    ]
    .into_iter()
    .map(|(method, path)| Endpoint {
        method,
        path: path.to_owned(),
    })
    .collect()
}

async fn fetch_user(state: &ServerState, id: Id<UserMarker>) -> Result<User> {
    state
        .db_client
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

async fn list_users(
    UsersPath(): UsersPath,
    State(state): State<ServerState>,
    uri: Uri,
    Query(render): Query<RenderQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Reply> {
    let users = state.db_client.list_users().await?;

    let request = ListRequest::new(&uri, render, page);
    let page = state.settings.pagination.paginate(users, &request.page)?;
    let renderer = Renderer::new(&state, &request.render);
    let results = renderer.users(&page.results);

    Ok(Reply::ok(renderer.page(&request.path, &page, results)))
}

/// Creates a user and issues its first access token, which is only ever
/// shown in this response.
async fn register_user(
    UsersPath(): UsersPath,
    State(state): State<ServerState>,
    Json(data): Json<Value>,
) -> Result<Reply> {
    let related = RelatedRecords::new();
    let create_user = UserSerializer::new(SerializerContext::new(&related, &state.settings.links))
        .validate_registration(&data)?;

    let user = match state.db_client.create_user(&create_user).await {
        Err(DbError::HandleTaken(_)) => {
            return Err(ValidationErrors::single(
                "handle",
                "user with this handle already exists.",
            )
            .into());
        }
        result => result?,
    };

    let token = match issue_token(&state, user.id).await {
        Ok(token) => token,
        Err(err) => {
            // Registration is all or nothing.
            if let Err(delete_err) = state.db_client.delete_user(user.id).await {
                error!(user_id = %user.id, error = %delete_err, "Could not roll back registration");
            }
            return Err(err);
        }
    };
    info!(user_id = %user.id, "Registered user");

    let renderer = Renderer::new(&state, &RenderQuery::default());
    Ok(Reply::created(json!({
        "user": renderer.user(&user),
        "token": token.to_string(),
    })))
}

async fn issue_token(state: &ServerState, user_id: Id<UserMarker>) -> Result<AccessToken> {
    let token = AccessToken::generate_random(user_id);
    let authentication = Authentication {
        user: user_id,
        token_hash: token.hash()?,
        created_at: UtcDateTime::now(),
        expires_after: state.settings.token_lifetime,
    };
    state.db_client.create_auth(&authentication).await?;

    Ok(token)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct UserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    UserPath { id }: UserPath,
    State(state): State<ServerState>,
    Query(render): Query<RenderQuery>,
) -> Result<Reply> {
    let user = fetch_user(&state, id).await?;

    Ok(Reply::ok(Renderer::new(&state, &render).user(&user)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/comments", rejection(ServerError))]
struct UserCommentsPath {
    id: Id<UserMarker>,
}

async fn get_user_comments(
    UserCommentsPath { id }: UserCommentsPath,
    State(state): State<ServerState>,
    uri: Uri,
    Query(render): Query<RenderQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Reply> {
    fetch_user(&state, id).await?;
    let comments = state.db_client.list_comments_by_user(id).await?;

    comments::comment_page(&state, comments, &ListRequest::new(&uri, render, page)).await
}
