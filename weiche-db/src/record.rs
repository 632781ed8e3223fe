use sqlx::FromRow;
use time::{PrimitiveDateTime, UtcDateTime};
use weiche_common::{
    model::{
        ModelValidationError,
        auth::{AccessTokenHash, Authentication},
        comment::Comment,
        post::{Post, PostTitle},
        user::{User, UserHandle},
    },
    util::PositiveDuration,
};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub struct UserRecord {
    pub user_snowflake: i64,
    pub handle: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub struct PostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub content: String,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub content: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            handle: UserHandle::new(value.handle)?,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            title: PostTitle::new(value.title)?,
            text: value.content,
            created: value.created_at.as_utc(),
        })
    }
}

impl From<CommentRecord> for Comment {
    fn from(value: CommentRecord) -> Self {
        Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            user: value.user_snowflake.cast_unsigned().into(),
            text: value.content,
        }
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        let expires_after = value
            .expires_after_seconds
            .map(PositiveDuration::from_seconds)
            .transpose()?;

        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: AccessTokenHash::try_from(value.token_hash.into_boxed_slice())?,
            created_at: value.created_at.as_utc(),
            expires_after,
        })
    }
}

/// Timestamps are stored without offset, always in UTC.
#[must_use]
pub fn to_primitive(time: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(time.date(), time.time())
}
