//! Queries against the PostgreSQL schema in `migrations/`.

use crate::{
    client::{DbError, Result},
    record::{AuthenticationRecord, CommentRecord, PostRecord, UserRecord, to_primitive},
};
use sqlx::{PgPool, query, query_as};
use weiche_common::model::{
    Id,
    auth::{AccessTokenHash, Authentication},
    comment::{Comment, CommentChanges, CommentMarker, NewComment},
    post::{Post, PostChanges, PostMarker},
    user::{CreateUser, User, UserHandle, UserMarker},
};

fn snowflake<Marker>(id: Id<Marker>) -> i64 {
    id.get().cast_signed()
}

fn snowflakes<Marker>(ids: &[Id<Marker>]) -> Vec<i64> {
    ids.iter().copied().map(snowflake).collect()
}

fn foreign_key_violation(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DbError::MissingReference
        }
        _ => DbError::Sqlx(err),
    }
}

pub(crate) async fn fetch_user(pool: &PgPool, id: Id<UserMarker>) -> Result<Option<User>> {
    let record = query_as::<_, UserRecord>(
        "
        SELECT user_snowflake, handle
        FROM users.users
        WHERE user_snowflake = $1
        ",
    )
    .bind(snowflake(id))
    .fetch_optional(pool)
    .await?;

    Ok(record.map(User::try_from).transpose()?)
}

pub(crate) async fn fetch_users(pool: &PgPool, ids: &[Id<UserMarker>]) -> Result<Vec<User>> {
    let records = query_as::<_, UserRecord>(
        "
        SELECT user_snowflake, handle
        FROM users.users
        WHERE user_snowflake = ANY($1)
        ORDER BY user_snowflake
        ",
    )
    .bind(snowflakes(ids))
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(User::try_from)
        .collect::<Result<_, _>>()?)
}

pub(crate) async fn fetch_user_by_handle(pool: &PgPool, handle: &UserHandle) -> Result<Option<User>> {
    let record = query_as::<_, UserRecord>(
        "
        SELECT user_snowflake, handle
        FROM users.users
        WHERE handle = $1
        ",
    )
    .bind(handle.get())
    .fetch_optional(pool)
    .await?;

    Ok(record.map(User::try_from).transpose()?)
}

pub(crate) async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    let records = query_as::<_, UserRecord>(
        "
        SELECT user_snowflake, handle
        FROM users.users
        ORDER BY user_snowflake
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(User::try_from)
        .collect::<Result<_, _>>()?)
}

pub(crate) async fn create_user(pool: &PgPool, id: Id<UserMarker>, user: &CreateUser) -> Result<User> {
    let record = query_as::<_, UserRecord>(
        "
        INSERT INTO users.users (user_snowflake, handle)
        VALUES ($1, $2)
        RETURNING user_snowflake, handle
        ",
    )
    .bind(snowflake(id))
    .bind(user.handle.get())
    .fetch_one(pool)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::HandleTaken(user.handle.get().to_owned())
        }
        _ => DbError::Sqlx(err),
    })?;

    Ok(User::try_from(record)?)
}

pub(crate) async fn delete_user(pool: &PgPool, id: Id<UserMarker>) -> Result<bool> {
    let result = query("DELETE FROM users.users WHERE user_snowflake = $1")
        .bind(snowflake(id))
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn fetch_auth(
    pool: &PgPool,
    token_hash: &AccessTokenHash,
) -> Result<Option<Authentication>> {
    let record = query_as::<_, AuthenticationRecord>(
        "
        SELECT user_snowflake, token_hash, created_at, expires_after_seconds
        FROM users.authentications
        WHERE token_hash = $1
        ",
    )
    .bind(&token_hash.0[..])
    .fetch_optional(pool)
    .await?;

    Ok(record.map(Authentication::try_from).transpose()?)
}

pub(crate) async fn create_auth(pool: &PgPool, authentication: &Authentication) -> Result<()> {
    query(
        "
        INSERT INTO users.authentications (token_hash, user_snowflake, created_at, expires_after_seconds)
        VALUES ($1, $2, $3, $4)
        ",
    )
    .bind(&authentication.token_hash.0[..])
    .bind(snowflake(authentication.user))
    .bind(to_primitive(authentication.created_at))
    .bind(
        authentication
            .expires_after
            .map(|expires_after| expires_after.whole_seconds()),
    )
    .execute(pool)
    .await
    .map_err(foreign_key_violation)?;

    Ok(())
}

pub(crate) async fn fetch_post(pool: &PgPool, id: Id<PostMarker>) -> Result<Option<Post>> {
    let record = query_as::<_, PostRecord>(
        "
        SELECT post_snowflake, title, content, created_at
        FROM posts.posts
        WHERE post_snowflake = $1
        ",
    )
    .bind(snowflake(id))
    .fetch_optional(pool)
    .await?;

    Ok(record.map(Post::try_from).transpose()?)
}

pub(crate) async fn fetch_posts(pool: &PgPool, ids: &[Id<PostMarker>]) -> Result<Vec<Post>> {
    let records = query_as::<_, PostRecord>(
        "
        SELECT post_snowflake, title, content, created_at
        FROM posts.posts
        WHERE post_snowflake = ANY($1)
        ORDER BY post_snowflake
        ",
    )
    .bind(snowflakes(ids))
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(Post::try_from)
        .collect::<Result<_, _>>()?)
}

pub(crate) async fn list_posts(pool: &PgPool) -> Result<Vec<Post>> {
    let records = query_as::<_, PostRecord>(
        "
        SELECT post_snowflake, title, content, created_at
        FROM posts.posts
        ORDER BY post_snowflake
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(Post::try_from)
        .collect::<Result<_, _>>()?)
}

pub(crate) async fn create_post(pool: &PgPool, post: Post) -> Result<Post> {
    let record = query_as::<_, PostRecord>(
        "
        INSERT INTO posts.posts (post_snowflake, title, content, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING post_snowflake, title, content, created_at
        ",
    )
    .bind(snowflake(post.id))
    .bind(post.title.get())
    .bind(&post.text)
    .bind(to_primitive(post.created))
    .fetch_one(pool)
    .await?;

    Ok(Post::try_from(record)?)
}

pub(crate) async fn update_post(
    pool: &PgPool,
    id: Id<PostMarker>,
    changes: PostChanges,
) -> Result<Option<Post>> {
    let record = query_as::<_, PostRecord>(
        "
        UPDATE posts.posts
        SET title = COALESCE($2, title), content = COALESCE($3, content)
        WHERE post_snowflake = $1
        RETURNING post_snowflake, title, content, created_at
        ",
    )
    .bind(snowflake(id))
    .bind(changes.title.as_ref().map(|title| title.get()))
    .bind(changes.text.as_deref())
    .fetch_optional(pool)
    .await?;

    Ok(record.map(Post::try_from).transpose()?)
}

/// Comments of the post go with it through `ON DELETE CASCADE`.
pub(crate) async fn delete_post(pool: &PgPool, id: Id<PostMarker>) -> Result<bool> {
    let result = query("DELETE FROM posts.posts WHERE post_snowflake = $1")
        .bind(snowflake(id))
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn fetch_comment(pool: &PgPool, id: Id<CommentMarker>) -> Result<Option<Comment>> {
    let record = query_as::<_, CommentRecord>(
        "
        SELECT comment_snowflake, post_snowflake, user_snowflake, content
        FROM posts.comments
        WHERE comment_snowflake = $1
        ",
    )
    .bind(snowflake(id))
    .fetch_optional(pool)
    .await?;

    Ok(record.map(Comment::from))
}

pub(crate) async fn list_comments(pool: &PgPool) -> Result<Vec<Comment>> {
    let records = query_as::<_, CommentRecord>(
        "
        SELECT comment_snowflake, post_snowflake, user_snowflake, content
        FROM posts.comments
        ORDER BY comment_snowflake
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(Comment::from).collect())
}

pub(crate) async fn list_comments_of_posts(
    pool: &PgPool,
    posts: &[Id<PostMarker>],
) -> Result<Vec<Comment>> {
    let records = query_as::<_, CommentRecord>(
        "
        SELECT comment_snowflake, post_snowflake, user_snowflake, content
        FROM posts.comments
        WHERE post_snowflake = ANY($1)
        ORDER BY comment_snowflake
        ",
    )
    .bind(snowflakes(posts))
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(Comment::from).collect())
}

pub(crate) async fn list_comments_by_user(pool: &PgPool, user: Id<UserMarker>) -> Result<Vec<Comment>> {
    let records = query_as::<_, CommentRecord>(
        "
        SELECT comment_snowflake, post_snowflake, user_snowflake, content
        FROM posts.comments
        WHERE user_snowflake = $1
        ORDER BY comment_snowflake
        ",
    )
    .bind(snowflake(user))
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(Comment::from).collect())
}

pub(crate) async fn create_comment(
    pool: &PgPool,
    id: Id<CommentMarker>,
    comment: &NewComment,
) -> Result<Comment> {
    let record = query_as::<_, CommentRecord>(
        "
        INSERT INTO posts.comments (comment_snowflake, post_snowflake, user_snowflake, content)
        VALUES ($1, $2, $3, $4)
        RETURNING comment_snowflake, post_snowflake, user_snowflake, content
        ",
    )
    .bind(snowflake(id))
    .bind(snowflake(comment.post))
    .bind(snowflake(comment.user))
    .bind(&comment.text)
    .fetch_one(pool)
    .await
    .map_err(foreign_key_violation)?;

    Ok(Comment::from(record))
}

pub(crate) async fn update_comment(
    pool: &PgPool,
    id: Id<CommentMarker>,
    changes: CommentChanges,
) -> Result<Option<Comment>> {
    let record = query_as::<_, CommentRecord>(
        "
        UPDATE posts.comments
        SET post_snowflake = COALESCE($2, post_snowflake), content = COALESCE($3, content)
        WHERE comment_snowflake = $1
        RETURNING comment_snowflake, post_snowflake, user_snowflake, content
        ",
    )
    .bind(snowflake(id))
    .bind(changes.post.map(snowflake))
    .bind(changes.text.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(foreign_key_violation)?;

    Ok(record.map(Comment::from))
}

pub(crate) async fn delete_comment(pool: &PgPool, id: Id<CommentMarker>) -> Result<bool> {
    let result = query("DELETE FROM posts.comments WHERE comment_snowflake = $1")
        .bind(snowflake(id))
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
