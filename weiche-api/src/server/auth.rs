use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use std::{hash::Hash, sync::Arc};
use time::UtcDateTime;
use tracing::debug;
use weiche_common::model::{Id, auth::AccessToken, user::UserMarker};
use weiche_db::client::DbClient;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The user a request acts for, proven by a bearer token.
///
/// Rejects with 401 when the header is missing, the token does not decode, is
/// unknown or has expired.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AccessToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let authentication = Arc::<DbClient>::from_ref(state)
            .fetch_auth(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if authentication.user != request_token.user_id {
            return Err(ServerError::InvalidToken);
        }

        if authentication.is_expired_at(UtcDateTime::now()) {
            debug!(user_id = %authentication.user, "Rejecting expired token");
            return Err(ServerError::InvalidToken);
        }

        Ok(Self {
            id: authentication.user,
        })
    }
}
