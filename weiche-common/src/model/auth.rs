//! Bearer tokens identifying a [`User`](crate::model::user::User).
//!
//! A token reads `{user_id}.{core}.{salt}` with `core` and `salt` in URL-safe
//! base64 without padding. Only the Argon2 hash of core and salt is stored.

use crate::{
    model::{Id, user::UserMarker},
    util::PositiveDuration,
};
use argon2::{Argon2, Params};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_URL_SAFE_NO_PAD};
use std::{
    fmt::{Debug, Display, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::UtcDateTime;

pub const ACCESS_TOKEN_CORE_LEN: usize = 24;
pub const ACCESS_TOKEN_SALT_LEN: usize = 18;
pub const ACCESS_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

const SEPARATOR: char = '.';

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing access token failed: {0}")]
pub struct AccessTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AccessTokenDecodeError {
    #[error("Not enough parts separated by '.'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AccessToken {
    pub user_id: Id<UserMarker>,
    pub core: [u8; ACCESS_TOKEN_CORE_LEN],
    pub salt: [u8; ACCESS_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AccessTokenHash(pub Box<[u8; ACCESS_TOKEN_HASH_LEN]>);

/// A stored token hash together with the user it authenticates.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub user: Id<UserMarker>,
    pub token_hash: AccessTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Authentication {
    #[must_use]
    pub fn is_expired_at(&self, now: UtcDateTime) -> bool {
        self.expires_after
            .is_some_and(|expires_after| self.created_at + expires_after.get() < now)
    }
}

impl AccessToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        Self {
            user_id,
            core: rand::random(),
            salt: rand::random(),
        }
    }

    pub fn hash(&self) -> Result<AccessTokenHash, AccessTokenHashError> {
        let mut hash = Box::new([0; ACCESS_TOKEN_HASH_LEN]);
        Argon2::default()
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(AccessTokenHashError)?;

        Ok(AccessTokenHash(hash))
    }
}

impl Display for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let encoded_core = Base64Display::new(&self.core, &BASE64_URL_SAFE_NO_PAD);
        let encoded_salt = Base64Display::new(&self.salt, &BASE64_URL_SAFE_NO_PAD);

        write!(
            f,
            "{}{SEPARATOR}{encoded_core}{SEPARATOR}{encoded_salt}",
            self.user_id
        )
    }
}

impl FromStr for AccessToken {
    type Err = AccessTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, SEPARATOR);

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let core_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = u64::from_str(user_id_part)
            .map_err(Self::Err::InvalidUserId)?
            .into();
        let core = BASE64_URL_SAFE_NO_PAD
            .decode(core_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidCoreLength)?;
        let salt = BASE64_URL_SAFE_NO_PAD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            core,
            salt,
        })
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AccessTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The access token hash had an invalid length")]
pub struct InvalidAccessTokenHashError;

impl TryFrom<Box<[u8]>> for AccessTokenHash {
    type Error = InvalidAccessTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        Ok(Self(
            value.try_into().map_err(|_| InvalidAccessTokenHashError)?,
        ))
    }
}
