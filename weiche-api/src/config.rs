use serde::Deserialize;
use std::{net::IpAddr, num::NonZeroUsize};
use thiserror::Error;
use weiche_common::{
    pagination::{DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE, PaginationPolicy, PaginationStyle},
    serializer::{Links, RelationStyle},
    snowflake::{ProcessId, WorkerId},
    util::{NonPositiveDurationError, PositiveDuration},
};

pub const DEFAULT_MAX_DEPTH: u8 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOKEN_LIFETIME_SECONDS must be positive: {0}")]
    TokenLifetime(#[from] NonPositiveDurationError),
    #[error("DEFAULT_DEPTH {default_depth} is above MAX_DEPTH {max_depth}")]
    DefaultDepth { default_depth: u8, max_depth: u8 },
    #[error("PAGE_SIZE {page_size} is above MAX_PAGE_SIZE {max_page_size}")]
    PageSize {
        page_size: NonZeroUsize,
        max_page_size: NonZeroUsize,
    },
}

/// The process environment, after `.env` has been applied.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    /// Everything is kept in memory when unset.
    pub database_url: Option<String>,
    #[serde(default)]
    pub worker_id: WorkerId,
    #[serde(default)]
    pub process_id: ProcessId,
    pub public_base_url: Option<String>,
    #[serde(default)]
    pub relation_style: RelationStyle,
    #[serde(default)]
    pub pagination_style: PaginationStyle,
    #[serde(default = "default_page_size")]
    pub page_size: NonZeroUsize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: NonZeroUsize,
    #[serde(default)]
    pub default_depth: u8,
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,
    pub token_lifetime_seconds: Option<i64>,
}

fn default_page_size() -> NonZeroUsize {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> NonZeroUsize {
    DEFAULT_MAX_PAGE_SIZE
}

fn default_max_depth() -> u8 {
    DEFAULT_MAX_DEPTH
}

impl Env {
    pub fn settings(&self) -> Result<ApiSettings, ConfigError> {
        if self.default_depth > self.max_depth {
            return Err(ConfigError::DefaultDepth {
                default_depth: self.default_depth,
                max_depth: self.max_depth,
            });
        }
        if self.page_size > self.max_page_size {
            return Err(ConfigError::PageSize {
                page_size: self.page_size,
                max_page_size: self.max_page_size,
            });
        }

        let base_url = self.public_base_url.clone().unwrap_or_else(|| {
            let host = match self.server_address {
                IpAddr::V4(address) => address.to_string(),
                IpAddr::V6(address) => format!("[{address}]"),
            };
            format!("http://{host}:{}", self.server_port)
        });

        Ok(ApiSettings {
            links: Links::new(self.relation_style, &base_url),
            pagination: PaginationPolicy {
                style: self.pagination_style,
                page_size: self.page_size,
                max_page_size: self.max_page_size,
            },
            default_depth: self.default_depth,
            max_depth: self.max_depth,
            token_lifetime: self
                .token_lifetime_seconds
                .map(PositiveDuration::from_seconds)
                .transpose()?,
        })
    }
}

/// How the API renders and pages its resources.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ApiSettings {
    pub links: Links,
    pub pagination: PaginationPolicy,
    pub default_depth: u8,
    pub max_depth: u8,
    /// Issued tokens never expire when `None`.
    pub token_lifetime: Option<PositiveDuration>,
}

impl ApiSettings {
    /// The nesting depth to render with, clamped to the maximum.
    #[must_use]
    pub fn depth(&self, requested: Option<u8>) -> u8 {
        requested.unwrap_or(self.default_depth).min(self.max_depth)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            links: Links::new(RelationStyle::default(), "http://localhost"),
            pagination: PaginationPolicy::default(),
            default_depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            token_lifetime: None,
        }
    }
}
