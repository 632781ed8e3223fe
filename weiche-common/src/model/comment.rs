use crate::model::{Id, post::PostMarker, user::UserMarker};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub user: Id<UserMarker>,
    pub text: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct NewComment {
    pub post: Id<PostMarker>,
    pub user: Id<UserMarker>,
    pub text: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CommentChanges {
    pub post: Option<Id<PostMarker>>,
    pub text: Option<String>,
}

impl Comment {
    pub fn apply(&mut self, changes: CommentChanges) {
        if let Some(post) = changes.post {
            self.post = post;
        }
        if let Some(text) = changes.text {
            self.text = text;
        }
    }

    #[must_use]
    pub fn is_written_by(&self, user: Id<UserMarker>) -> bool {
        self.user == user
    }
}
