use crate::model::{
    Id,
    comment::{Comment, CommentMarker},
    post::{Post, PostMarker},
    user::{User, UserMarker},
};
use std::collections::BTreeMap;

/// Records a serializer may look at besides the instance it renders.
///
/// Filled by whoever drives the serializer before rendering or validating.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct RelatedRecords {
    posts: BTreeMap<Id<PostMarker>, Post>,
    comments: BTreeMap<Id<CommentMarker>, Comment>,
    users: BTreeMap<Id<UserMarker>, User>,
    comments_by_post: BTreeMap<Id<PostMarker>, Vec<Id<CommentMarker>>>,
}

impl RelatedRecords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the post was not known before.
    pub fn insert_post(&mut self, post: Post) -> bool {
        self.posts.insert(post.id, post).is_none()
    }

    pub fn insert_user(&mut self, user: User) -> bool {
        self.users.insert(user.id, user).is_none()
    }

    pub fn insert_comment(&mut self, comment: Comment) -> bool {
        self.comments.insert(comment.id, comment).is_none()
    }

    /// Records the complete list of comments on `post`.
    pub fn insert_comments_of(&mut self, post: Id<PostMarker>, comments: Vec<Comment>) {
        let mut ids: Vec<_> = comments.iter().map(|comment| comment.id).collect();
        ids.sort_unstable();

        for comment in comments {
            self.insert_comment(comment);
        }
        self.comments_by_post.insert(post, ids);
    }

    #[must_use]
    pub fn post(&self, id: Id<PostMarker>) -> Option<&Post> {
        self.posts.get(&id)
    }

    #[must_use]
    pub fn user(&self, id: Id<UserMarker>) -> Option<&User> {
        self.users.get(&id)
    }

    #[must_use]
    pub fn comment(&self, id: Id<CommentMarker>) -> Option<&Comment> {
        self.comments.get(&id)
    }

    /// Ids of the comments on `post`, `None` if they were never loaded.
    #[must_use]
    pub fn comments_of(&self, post: Id<PostMarker>) -> Option<&[Id<CommentMarker>]> {
        self.comments_by_post.get(&post).map(Vec::as_slice)
    }

    #[must_use]
    pub fn has_comments_of(&self, post: Id<PostMarker>) -> bool {
        self.comments_by_post.contains_key(&post)
    }

    #[must_use]
    pub fn has_user(&self, user: Id<UserMarker>) -> bool {
        self.users.contains_key(&user)
    }

    #[must_use]
    pub fn has_post(&self, post: Id<PostMarker>) -> bool {
        self.posts.contains_key(&post)
    }
}
