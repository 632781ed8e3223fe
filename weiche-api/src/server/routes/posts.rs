use crate::server::{
    Result, ServerError, ServerState,
    auth::AuthenticatedUser,
    extract::{Path, Query},
    render::{ListRequest, RenderQuery, Renderer},
    resource::{ActionMethod, Reply, ResourceHandler, ResourceRouter},
    routes::comments,
};
use axum::{extract::State, http::Uri};
use serde_json::Value;
use tracing::info;
use weiche_common::{
    model::{
        Id,
        post::{Post, PostMarker},
    },
    pagination::PageQuery,
    serializer::{POSTS, PostSerializer, RelatedRecords, SerializerContext, WritableSerializer},
};

pub struct PostHandler;

pub fn resource() -> ResourceRouter<PostHandler> {
    ResourceRouter::new().detail_action("comments", ActionMethod::Get, post_comments)
}

async fn post_page(state: &ServerState, posts: Vec<Post>, request: &ListRequest) -> Result<Reply> {
    let page = state.settings.pagination.paginate(posts, &request.page)?;
    let renderer = Renderer::new(state, &request.render);
    let results = renderer.posts(&page.results).await?;

    Ok(Reply::ok(renderer.page(&request.path, &page, results)))
}

async fn fetch_post(state: &ServerState, id: Id<PostMarker>) -> Result<Post> {
    state
        .db_client
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))
}

impl ResourceHandler for PostHandler {
    const NAME: &'static str = POSTS;
    type Marker = PostMarker;

    async fn list(state: &ServerState, request: ListRequest) -> Result<Reply> {
        let posts = state.db_client.list_posts().await?;
        post_page(state, posts, &request).await
    }

    async fn retrieve(state: &ServerState, id: Id<PostMarker>, render: RenderQuery) -> Result<Reply> {
        let post = fetch_post(state, id).await?;
        let body = Renderer::new(state, &render).post(&post).await?;

        Ok(Reply::ok(body))
    }

    async fn create(
        state: &ServerState,
        user: AuthenticatedUser,
        render: RenderQuery,
        data: Value,
    ) -> Result<Reply> {
        let related = RelatedRecords::new();
        let new_post = PostSerializer::new(SerializerContext::new(&related, &state.settings.links))
            .validate_create(&data)?;

        let post = state.db_client.create_post(new_post).await?;
        info!(post_id = %post.id, user_id = %user.user_id(), "Post created");

        let body = Renderer::new(state, &render).post(&post).await?;
        Ok(Reply::created(body))
    }

    async fn update(
        state: &ServerState,
        user: AuthenticatedUser,
        id: Id<PostMarker>,
        render: RenderQuery,
        data: Value,
        partial: bool,
    ) -> Result<Reply> {
        fetch_post(state, id).await?;

        let related = RelatedRecords::new();
        let changes = PostSerializer::new(SerializerContext::new(&related, &state.settings.links))
            .validate_update(&data, partial)?;

        let post = state
            .db_client
            .update_post(id, changes)
            .await?
            .ok_or(ServerError::PostByIdNotFound(id))?;
        info!(post_id = %id, user_id = %user.user_id(), partial, "Post updated");

        let body = Renderer::new(state, &render).post(&post).await?;
        Ok(Reply::ok(body))
    }

    async fn destroy(state: &ServerState, user: AuthenticatedUser, id: Id<PostMarker>) -> Result<Reply> {
        if !state.db_client.delete_post(id).await? {
            return Err(ServerError::PostByIdNotFound(id));
        }
        info!(post_id = %id, user_id = %user.user_id(), "Post deleted");

        Ok(Reply::no_content())
    }
}

async fn post_comments(
    State(state): State<ServerState>,
    uri: Uri,
    Path(id): Path<Id<PostMarker>>,
    Query(render): Query<RenderQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Reply> {
    fetch_post(&state, id).await?;
    let comments = state.db_client.list_comments_of_posts(&[id]).await?;

    comments::comment_page(&state, comments, &ListRequest::new(&uri, render, page)).await
}
