//! Backing collections kept in process memory.

use crate::client::{DbError, Result};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use weiche_common::model::{
    Id,
    auth::{AccessTokenHash, Authentication},
    comment::{Comment, CommentChanges, CommentMarker, NewComment},
    post::{Post, PostChanges, PostMarker},
    user::{CreateUser, User, UserHandle, UserMarker},
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<Id<UserMarker>, User>,
    authentications: HashMap<AccessTokenHash, Authentication>,
    posts: BTreeMap<Id<PostMarker>, Post>,
    comments: BTreeMap<Id<CommentMarker>, Comment>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn fetch_user(&self, id: Id<UserMarker>) -> Option<User> {
        self.read().users.get(&id).cloned()
    }

    pub(crate) fn fetch_users(&self, ids: &[Id<UserMarker>]) -> Vec<User> {
        let tables = self.read();
        ids.iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect()
    }

    pub(crate) fn fetch_user_by_handle(&self, handle: &UserHandle) -> Option<User> {
        self.read()
            .users
            .values()
            .find(|user| user.handle == *handle)
            .cloned()
    }

    pub(crate) fn list_users(&self) -> Vec<User> {
        self.read().users.values().cloned().collect()
    }

    pub(crate) fn create_user(&self, id: Id<UserMarker>, user: &CreateUser) -> Result<User> {
        let mut tables = self.write();
        if tables.users.values().any(|other| other.handle == user.handle) {
            return Err(DbError::HandleTaken(user.handle.get().to_owned()));
        }

        let user = User {
            id,
            handle: user.handle.clone(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    /// Removes the user together with everything referencing it.
    pub(crate) fn delete_user(&self, id: Id<UserMarker>) -> bool {
        let mut tables = self.write();
        if tables.users.remove(&id).is_none() {
            return false;
        }

        tables.authentications.retain(|_, auth| auth.user != id);
        tables.comments.retain(|_, comment| comment.user != id);
        true
    }

    pub(crate) fn fetch_auth(&self, token_hash: &AccessTokenHash) -> Option<Authentication> {
        self.read().authentications.get(token_hash).cloned()
    }

    pub(crate) fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let mut tables = self.write();
        if !tables.users.contains_key(&authentication.user) {
            return Err(DbError::MissingReference);
        }

        tables
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());
        Ok(())
    }

    pub(crate) fn fetch_post(&self, id: Id<PostMarker>) -> Option<Post> {
        self.read().posts.get(&id).cloned()
    }

    pub(crate) fn fetch_posts(&self, ids: &[Id<PostMarker>]) -> Vec<Post> {
        let tables = self.read();
        ids.iter()
            .filter_map(|id| tables.posts.get(id).cloned())
            .collect()
    }

    pub(crate) fn list_posts(&self) -> Vec<Post> {
        self.read().posts.values().cloned().collect()
    }

    pub(crate) fn create_post(&self, post: Post) -> Post {
        self.write().posts.insert(post.id, post.clone());
        post
    }

    pub(crate) fn update_post(&self, id: Id<PostMarker>, changes: PostChanges) -> Option<Post> {
        let mut tables = self.write();
        let post = tables.posts.get_mut(&id)?;
        post.apply(changes);
        Some(post.clone())
    }

    /// Removes the post together with its comments.
    pub(crate) fn delete_post(&self, id: Id<PostMarker>) -> bool {
        let mut tables = self.write();
        let removed = tables.posts.remove(&id).is_some();
        if removed {
            tables.comments.retain(|_, comment| comment.post != id);
        }
        removed
    }

    pub(crate) fn fetch_comment(&self, id: Id<CommentMarker>) -> Option<Comment> {
        self.read().comments.get(&id).cloned()
    }

    pub(crate) fn list_comments(&self) -> Vec<Comment> {
        self.read().comments.values().cloned().collect()
    }

    pub(crate) fn list_comments_of_posts(&self, posts: &[Id<PostMarker>]) -> Vec<Comment> {
        self.read()
            .comments
            .values()
            .filter(|comment| posts.contains(&comment.post))
            .cloned()
            .collect()
    }

    pub(crate) fn list_comments_by_user(&self, user: Id<UserMarker>) -> Vec<Comment> {
        self.read()
            .comments
            .values()
            .filter(|comment| comment.is_written_by(user))
            .cloned()
            .collect()
    }

    pub(crate) fn create_comment(&self, id: Id<CommentMarker>, comment: &NewComment) -> Result<Comment> {
        let mut tables = self.write();
        if !tables.posts.contains_key(&comment.post) || !tables.users.contains_key(&comment.user) {
            return Err(DbError::MissingReference);
        }

        let comment = Comment {
            id,
            post: comment.post,
            user: comment.user,
            text: comment.text.clone(),
        };
        tables.comments.insert(id, comment.clone());
        Ok(comment)
    }

    pub(crate) fn update_comment(
        &self,
        id: Id<CommentMarker>,
        changes: CommentChanges,
    ) -> Result<Option<Comment>> {
        let mut tables = self.write();
        if let Some(post) = changes.post
            && !tables.posts.contains_key(&post)
        {
            return Err(DbError::MissingReference);
        }

        let Some(comment) = tables.comments.get_mut(&id) else {
            return Ok(None);
        };
        comment.apply(changes);
        Ok(Some(comment.clone()))
    }

    pub(crate) fn delete_comment(&self, id: Id<CommentMarker>) -> bool {
        self.write().comments.remove(&id).is_some()
    }
}
