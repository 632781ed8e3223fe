//! Turning records into response bodies.

use crate::server::{Result, ServerState};
use axum::http::Uri;
use serde::Deserialize;
use serde_json::{Value, json};
use weiche_common::{
    model::{comment::Comment, post::Post, user::User},
    pagination::{Page, PageCursor, PageQuery},
    serializer::{
        CommentSerializer, FieldSelection, Links, PostSerializer, RelatedRecords,
        SerializerContext, Serializer, UserSerializer,
    },
    util::saturating,
};

/// Rendering options of a single request, `?fields=a,b&omit=c&depth=1`.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct RenderQuery {
    pub fields: Option<String>,
    pub omit: Option<String>,
    /// Larger than any maximum depth when too large for a `u8`.
    #[serde(default, deserialize_with = "saturating")]
    pub depth: Option<u8>,
}

/// Everything a list endpoint needs to know about its request.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct ListRequest {
    /// Path of the request, the base of `next` and `previous` links.
    pub path: String,
    pub render: RenderQuery,
    pub page: PageQuery,
}

impl ListRequest {
    #[must_use]
    pub fn new(uri: &Uri, render: RenderQuery, page: PageQuery) -> Self {
        Self {
            path: uri.path().to_owned(),
            render,
            page,
        }
    }
}

pub struct Renderer<'s> {
    state: &'s ServerState,
    fields: FieldSelection,
    depth: u8,
}

impl<'s> Renderer<'s> {
    #[must_use]
    pub fn new(state: &'s ServerState, query: &RenderQuery) -> Self {
        Self {
            state,
            fields: FieldSelection::parse(query.fields.as_deref(), query.omit.as_deref()),
            depth: state.settings.depth(query.depth),
        }
    }

    fn links(&self) -> &'s Links {
        &self.state.settings.links
    }

    fn context<'a>(&'a self, related: &'a RelatedRecords) -> SerializerContext<'a> {
        SerializerContext::new(related, self.links())
            .with_depth(self.depth)
            .with_fields(&self.fields)
    }

    pub async fn posts(&self, posts: &[Post]) -> Result<Vec<Value>> {
        let related = self
            .state
            .db_client
            .load_related(posts, &[], self.depth)
            .await?;

        Ok(PostSerializer::new(self.context(&related)).to_values(posts))
    }

    pub async fn post(&self, post: &Post) -> Result<Value> {
        let mut values = self.posts(std::slice::from_ref(post)).await?;
        Ok(values.pop().unwrap_or_default())
    }

    pub async fn comments(&self, comments: &[Comment]) -> Result<Vec<Value>> {
        let related = self
            .state
            .db_client
            .load_related(&[], comments, self.depth)
            .await?;

        Ok(CommentSerializer::new(self.context(&related)).to_values(comments))
    }

    pub async fn comment(&self, comment: &Comment) -> Result<Value> {
        let mut values = self.comments(std::slice::from_ref(comment)).await?;
        Ok(values.pop().unwrap_or_default())
    }

    #[must_use]
    pub fn users(&self, users: &[User]) -> Vec<Value> {
        let related = RelatedRecords::new();
        UserSerializer::new(self.context(&related)).to_values(users)
    }

    #[must_use]
    pub fn user(&self, user: &User) -> Value {
        let related = RelatedRecords::new();
        UserSerializer::new(self.context(&related)).to_value(user)
    }

    /// The paginated body `{count, next, previous, results}` with absolute
    /// links to the neighbouring pages.
    #[must_use]
    pub fn page<T>(&self, path: &str, page: &Page<T>, results: Vec<Value>) -> Value {
        let link = |cursor: PageCursor| {
            let base = self.links().absolute(path.trim_start_matches('/'));
            match cursor.query() {
                query if query.is_empty() => base,
                query => format!("{base}?{query}"),
            }
        };

        json!({
            "count": page.count,
            "next": page.next.map(&link),
            "previous": page.previous.map(&link),
            "results": results,
        })
    }
}
