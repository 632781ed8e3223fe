use crate::server::{
    Result, ServerError, ServerState,
    auth::AuthenticatedUser,
    extract::Query,
    render::{ListRequest, RenderQuery, Renderer},
    resource::{ActionMethod, Reply, ResourceHandler, ResourceRouter},
};
use axum::{extract::State, http::Uri};
use serde_json::Value;
use tracing::info;
use weiche_common::{
    model::{
        Id,
        comment::{Comment, CommentMarker},
    },
    pagination::PageQuery,
    serializer::{
        COMMENTS, CommentSerializer, RelatedRecords, SerializerContext, WritableSerializer,
    },
};

pub struct CommentHandler;

pub fn resource() -> ResourceRouter<CommentHandler> {
    ResourceRouter::new().collection_action("mine", ActionMethod::Get, my_comments)
}

pub(super) async fn comment_page(
    state: &ServerState,
    comments: Vec<Comment>,
    request: &ListRequest,
) -> Result<Reply> {
    let page = state.settings.pagination.paginate(comments, &request.page)?;
    let renderer = Renderer::new(state, &request.render);
    let results = renderer.comments(&page.results).await?;

    Ok(Reply::ok(renderer.page(&request.path, &page, results)))
}

/// The comment, if `user` wrote it.
async fn fetch_own_comment(
    state: &ServerState,
    user: AuthenticatedUser,
    id: Id<CommentMarker>,
) -> Result<Comment> {
    let comment = state
        .db_client
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    if comment.is_written_by(user.user_id()) {
        Ok(comment)
    } else {
        Err(ServerError::Forbidden)
    }
}

/// Loads the post `data` refers to, so validation can see whether it exists.
async fn related_for_input(state: &ServerState, data: &Value) -> Result<RelatedRecords> {
    let mut related = RelatedRecords::new();

    if let Some(post_id) = CommentSerializer::referenced_post(&state.settings.links, data)
        && let Some(post) = state.db_client.fetch_post(post_id).await?
    {
        related.insert_post(post);
    }

    Ok(related)
}

impl ResourceHandler for CommentHandler {
    const NAME: &'static str = COMMENTS;
    type Marker = CommentMarker;

    async fn list(state: &ServerState, request: ListRequest) -> Result<Reply> {
        let comments = state.db_client.list_comments().await?;
        comment_page(state, comments, &request).await
    }

    async fn retrieve(
        state: &ServerState,
        id: Id<CommentMarker>,
        render: RenderQuery,
    ) -> Result<Reply> {
        let comment = state
            .db_client
            .fetch_comment(id)
            .await?
            .ok_or(ServerError::CommentByIdNotFound(id))?;
        let body = Renderer::new(state, &render).comment(&comment).await?;

        Ok(Reply::ok(body))
    }

    async fn create(
        state: &ServerState,
        user: AuthenticatedUser,
        render: RenderQuery,
        data: Value,
    ) -> Result<Reply> {
        let mut related = related_for_input(state, &data).await?;
        if let Some(author) = state.db_client.fetch_user(user.user_id()).await? {
            related.insert_user(author);
        }

        let context = SerializerContext::new(&related, &state.settings.links)
            .with_user(Some(user.user_id()));
        let new_comment = CommentSerializer::new(context).validate_create(&data)?;

        let comment = state.db_client.create_comment(&new_comment).await?;
        info!(comment_id = %comment.id, post_id = %comment.post, user_id = %comment.user, "Comment created");

        let body = Renderer::new(state, &render).comment(&comment).await?;
        Ok(Reply::created(body))
    }

    async fn update(
        state: &ServerState,
        user: AuthenticatedUser,
        id: Id<CommentMarker>,
        render: RenderQuery,
        data: Value,
        partial: bool,
    ) -> Result<Reply> {
        fetch_own_comment(state, user, id).await?;

        let related = related_for_input(state, &data).await?;
        let changes = CommentSerializer::new(SerializerContext::new(&related, &state.settings.links))
            .validate_update(&data, partial)?;

        let comment = state
            .db_client
            .update_comment(id, changes)
            .await?
            .ok_or(ServerError::CommentByIdNotFound(id))?;
        info!(comment_id = %id, partial, "Comment updated");

        let body = Renderer::new(state, &render).comment(&comment).await?;
        Ok(Reply::ok(body))
    }

    async fn destroy(
        state: &ServerState,
        user: AuthenticatedUser,
        id: Id<CommentMarker>,
    ) -> Result<Reply> {
        fetch_own_comment(state, user, id).await?;

        if !state.db_client.delete_comment(id).await? {
            return Err(ServerError::CommentByIdNotFound(id));
        }
        info!(comment_id = %id, "Comment deleted");

        Ok(Reply::no_content())
    }
}

async fn my_comments(
    State(state): State<ServerState>,
    user: AuthenticatedUser,
    uri: Uri,
    Query(render): Query<RenderQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Reply> {
    let comments = state.db_client.list_comments_by_user(user.user_id()).await?;

    comment_page(&state, comments, &ListRequest::new(&uri, render, page)).await
}
