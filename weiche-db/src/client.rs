use crate::{memory::MemoryStore, postgres};
use sqlx::{PgPool, migrate::Migrator, postgres::PgPoolOptions};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, PoisonError},
};
use thiserror::Error;
use tracing::{debug, info};
use weiche_common::{
    model::{
        Id, ModelValidationError, WeicheSnowflakeGenerator,
        auth::{AccessTokenHash, Authentication},
        comment::{Comment, CommentChanges, CommentMarker, NewComment},
        post::{NewPost, Post, PostChanges, PostMarker},
        user::{CreateUser, User, UserHandle, UserMarker},
    },
    serializer::RelatedRecords,
    snowflake::{ProcessId, SnowflakeError, WorkerId},
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate an id: {0}")]
    Snowflake(#[from] SnowflakeError),
    #[error("The handle {0:?} is already taken")]
    HandleTaken(String),
    #[error("A referenced object does not exist")]
    MissingReference,
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug)]
enum Backend {
    Memory(MemoryStore),
    Postgres(PgPool),
}

/// Access to users, their authentications, posts and comments.
///
/// Collections are always returned ordered by id.
#[derive(Debug)]
pub struct DbClient {
    backend: Backend,
    snowflake_generator: Mutex<WeicheSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self::with_backend(Backend::Postgres(pool), worker_id, process_id)
    }

    /// A client keeping everything in process memory, empty on start.
    #[must_use]
    pub fn in_memory(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self::with_backend(
            Backend::Memory(MemoryStore::default()),
            worker_id,
            process_id,
        )
    }

    /// Connects to PostgreSQL and brings the schema up to date.
    pub async fn connect(database_url: &str, worker_id: WorkerId, process_id: ProcessId) -> Result<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;
        MIGRATOR.run(&pool).await?;
        info!("Database migrations completed");

        Ok(Self::new(pool, worker_id, process_id))
    }

    fn with_backend(backend: Backend, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator = Mutex::new(WeicheSnowflakeGenerator::new(worker_id, process_id));

        Self {
            backend,
            snowflake_generator,
        }
    }

    fn next_id<Marker>(&self) -> Result<Id<Marker>> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        Ok(snowflake.into())
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.fetch_user(user_id)),
            Backend::Postgres(pool) => postgres::fetch_user(pool, user_id).await,
        }
    }

    /// Users among `user_ids` that exist.
    pub async fn fetch_users(&self, user_ids: &[Id<UserMarker>]) -> Result<Vec<User>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.fetch_users(user_ids)),
            Backend::Postgres(pool) => postgres::fetch_users(pool, user_ids).await,
        }
    }

    pub async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.fetch_user_by_handle(handle)),
            Backend::Postgres(pool) => postgres::fetch_user_by_handle(pool, handle).await,
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.list_users()),
            Backend::Postgres(pool) => postgres::list_users(pool).await,
        }
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let user_id = self.next_id()?;

        let user = match &self.backend {
            Backend::Memory(store) => store.create_user(user_id, user),
            Backend::Postgres(pool) => postgres::create_user(pool, user_id, user).await,
        }?;

        debug!(user_id = %user.id, "Created user");
        Ok(user)
    }

    /// Deletes the user, its authentications and its comments.
    pub async fn delete_user(&self, user_id: Id<UserMarker>) -> Result<bool> {
        let deleted = match &self.backend {
            Backend::Memory(store) => store.delete_user(user_id),
            Backend::Postgres(pool) => postgres::delete_user(pool, user_id).await?,
        };

        if deleted {
            debug!(%user_id, "Deleted user");
        }
        Ok(deleted)
    }

    pub async fn fetch_auth(&self, token_hash: &AccessTokenHash) -> Result<Option<Authentication>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.fetch_auth(token_hash)),
            Backend::Postgres(pool) => postgres::fetch_auth(pool, token_hash).await,
        }
    }

    pub async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        match &self.backend {
            Backend::Memory(store) => store.create_auth(authentication),
            Backend::Postgres(pool) => postgres::create_auth(pool, authentication).await,
        }
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.fetch_post(post_id)),
            Backend::Postgres(pool) => postgres::fetch_post(pool, post_id).await,
        }
    }

    pub async fn fetch_posts(&self, post_ids: &[Id<PostMarker>]) -> Result<Vec<Post>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.fetch_posts(post_ids)),
            Backend::Postgres(pool) => postgres::fetch_posts(pool, post_ids).await,
        }
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.list_posts()),
            Backend::Postgres(pool) => postgres::list_posts(pool).await,
        }
    }

    /// Stores a new post, stamped with the time its id was generated.
    pub async fn create_post(&self, post: NewPost) -> Result<Post> {
        let post_id: Id<PostMarker> = self.next_id()?;
        let post = Post {
            id: post_id,
            title: post.title,
            text: post.text,
            created: post_id.snowflake().created_at(),
        };

        let post = match &self.backend {
            Backend::Memory(store) => store.create_post(post),
            Backend::Postgres(pool) => postgres::create_post(pool, post).await?,
        };

        debug!(post_id = %post.id, "Created post");
        Ok(post)
    }

    pub async fn update_post(&self, post_id: Id<PostMarker>, changes: PostChanges) -> Result<Option<Post>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.update_post(post_id, changes)),
            Backend::Postgres(pool) => postgres::update_post(pool, post_id, changes).await,
        }
    }

    /// Deletes the post and its comments. Returns whether the post existed.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let deleted = match &self.backend {
            Backend::Memory(store) => store.delete_post(post_id),
            Backend::Postgres(pool) => postgres::delete_post(pool, post_id).await?,
        };

        if deleted {
            debug!(%post_id, "Deleted post");
        }
        Ok(deleted)
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.fetch_comment(comment_id)),
            Backend::Postgres(pool) => postgres::fetch_comment(pool, comment_id).await,
        }
    }

    pub async fn list_comments(&self) -> Result<Vec<Comment>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.list_comments()),
            Backend::Postgres(pool) => postgres::list_comments(pool).await,
        }
    }

    /// All comments on any of `post_ids`.
    pub async fn list_comments_of_posts(&self, post_ids: &[Id<PostMarker>]) -> Result<Vec<Comment>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        match &self.backend {
            Backend::Memory(store) => Ok(store.list_comments_of_posts(post_ids)),
            Backend::Postgres(pool) => postgres::list_comments_of_posts(pool, post_ids).await,
        }
    }

    pub async fn list_comments_by_user(&self, user_id: Id<UserMarker>) -> Result<Vec<Comment>> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.list_comments_by_user(user_id)),
            Backend::Postgres(pool) => postgres::list_comments_by_user(pool, user_id).await,
        }
    }

    pub async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let comment_id = self.next_id()?;

        let comment = match &self.backend {
            Backend::Memory(store) => store.create_comment(comment_id, comment),
            Backend::Postgres(pool) => postgres::create_comment(pool, comment_id, comment).await,
        }?;

        debug!(comment_id = %comment.id, post_id = %comment.post, "Created comment");
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        changes: CommentChanges,
    ) -> Result<Option<Comment>> {
        match &self.backend {
            Backend::Memory(store) => store.update_comment(comment_id, changes),
            Backend::Postgres(pool) => postgres::update_comment(pool, comment_id, changes).await,
        }
    }

    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let deleted = match &self.backend {
            Backend::Memory(store) => store.delete_comment(comment_id),
            Backend::Postgres(pool) => postgres::delete_comment(pool, comment_id).await?,
        };

        if deleted {
            debug!(%comment_id, "Deleted comment");
        }
        Ok(deleted)
    }

    /// Loads what rendering `posts` and `comments` with nesting `depth` looks
    /// at, one level at a time.
    ///
    /// Every rendered post lists its comments, so their ids are loaded on every
    /// level. Records below `depth` are only referenced and never loaded.
    pub async fn load_related(
        &self,
        posts: &[Post],
        comments: &[Comment],
        depth: u8,
    ) -> Result<RelatedRecords> {
        let mut related = RelatedRecords::new();

        let mut post_level: BTreeSet<Id<PostMarker>> = posts.iter().map(|post| post.id).collect();
        for post in posts {
            related.insert_post(post.clone());
        }
        let mut comment_level: BTreeMap<Id<CommentMarker>, Comment> = comments
            .iter()
            .map(|comment| (comment.id, comment.clone()))
            .collect();

        for level in 0..=depth {
            self.load_comments_of(&mut related, &post_level).await?;
            if level == depth {
                break;
            }

            let wanted_posts: Vec<_> = comment_level
                .values()
                .map(|comment| comment.post)
                .filter(|post| !related.has_post(*post))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for post in self.fetch_posts(&wanted_posts).await? {
                related.insert_post(post);
            }

            let wanted_users: Vec<_> = comment_level
                .values()
                .map(|comment| comment.user)
                .filter(|user| !related.has_user(*user))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for user in self.fetch_users(&wanted_users).await? {
                related.insert_user(user);
            }

            let next_comments = post_level
                .iter()
                .flat_map(|post| related.comments_of(*post).unwrap_or_default())
                .filter_map(|comment| related.comment(*comment))
                .map(|comment| (comment.id, comment.clone()))
                .collect();

            post_level = comment_level
                .values()
                .map(|comment| comment.post)
                .filter(|post| related.has_post(*post))
                .collect();
            comment_level = next_comments;
        }

        Ok(related)
    }

    async fn load_comments_of(
        &self,
        related: &mut RelatedRecords,
        posts: &BTreeSet<Id<PostMarker>>,
    ) -> Result<()> {
        let missing: Vec<_> = posts
            .iter()
            .copied()
            .filter(|post| !related.has_comments_of(*post))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let mut by_post: BTreeMap<_, Vec<_>> =
            missing.iter().map(|post| (*post, Vec::new())).collect();
        for comment in self.list_comments_of_posts(&missing).await? {
            by_post.entry(comment.post).or_default().push(comment);
        }

        for (post, comments) in by_post {
            related.insert_comments_of(post, comments);
        }
        Ok(())
    }
}
