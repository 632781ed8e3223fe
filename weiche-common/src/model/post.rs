use crate::model::Id;
use thiserror::Error;
use time::UtcDateTime;

pub const POST_TITLE_MAX_LEN: usize = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: PostTitle,
    pub text: String,
    /// Set once on creation, never changed afterwards.
    pub created: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewPost {
    pub title: PostTitle,
    pub text: String,
}

/// Fields to replace on an existing post. `None` keeps the current value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostChanges {
    pub title: Option<PostTitle>,
    pub text: Option<String>,
}

impl Post {
    pub fn apply(&mut self, changes: PostChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(text) = changes.text {
            self.text = text;
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostTitle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The post title is invalid: {0:?}")]
pub struct InvalidPostTitleError(String);

impl PostTitle {
    pub fn new(title: String) -> Result<Self, InvalidPostTitleError> {
        if !title.trim().is_empty() && title.chars().count() <= POST_TITLE_MAX_LEN {
            Ok(Self(title))
        } else {
            Err(InvalidPostTitleError(title))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}
