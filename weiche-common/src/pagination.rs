//! Slicing ordered collections into pages.

use crate::util::saturating;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `?page=2&page_size=20`, pages counted from 1.
    #[default]
    PageNumber,
    /// `?limit=20&offset=40`.
    LimitOffset,
}

/// Page sizes for one deployment.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct PaginationPolicy {
    pub style: PaginationStyle,
    pub page_size: NonZeroUsize,
    pub max_page_size: NonZeroUsize,
}

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(10).unwrap();
pub const DEFAULT_MAX_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(100).unwrap();

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            style: PaginationStyle::default(),
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

/// Pagination parameters of a request. Which of them are read depends on the
/// [`PaginationStyle`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "saturating")]
    pub page: Option<usize>,
    #[serde(default, deserialize_with = "saturating")]
    pub page_size: Option<usize>,
    #[serde(default, deserialize_with = "saturating")]
    pub limit: Option<usize>,
    #[serde(default, deserialize_with = "saturating")]
    pub offset: Option<usize>,
}

/// Where a neighbouring page starts.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum PageCursor {
    Number {
        page: usize,
        /// Only set when the request chose its own size.
        page_size: Option<usize>,
    },
    Offset {
        limit: usize,
        offset: usize,
    },
}

impl PageCursor {
    /// Query string selecting this page, without the leading `?`. The first
    /// page and offset zero are left implicit.
    #[must_use]
    pub fn query(&self) -> String {
        let mut parameters = Vec::with_capacity(2);
        match *self {
            PageCursor::Number { page, page_size } => {
                if page > 1 {
                    parameters.push(format!("page={page}"));
                }
                if let Some(page_size) = page_size {
                    parameters.push(format!("page_size={page_size}"));
                }
            }
            PageCursor::Offset { limit, offset } => {
                parameters.push(format!("limit={limit}"));
                if offset > 0 {
                    parameters.push(format!("offset={offset}"));
                }
            }
        }
        parameters.join("&")
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Page<T> {
    /// Size of the whole collection.
    pub count: usize,
    pub next: Option<PageCursor>,
    pub previous: Option<PageCursor>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum PaginationError {
    #[error("Invalid page {0}.")]
    InvalidPage(usize),
}

impl PaginationPolicy {
    /// The effective size for a requested one: capped at the maximum, with zero
    /// or no request meaning the default.
    #[must_use]
    pub fn size_for(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(requested) if requested > 0 => requested.min(self.max_page_size.get()),
            _ => self.page_size.get(),
        }
    }

    pub fn paginate<T>(&self, items: Vec<T>, query: &PageQuery) -> Result<Page<T>, PaginationError> {
        match self.style {
            PaginationStyle::PageNumber => self.paginate_by_number(items, query),
            PaginationStyle::LimitOffset => Ok(self.paginate_by_offset(items, query)),
        }
    }

    fn paginate_by_number<T>(
        &self,
        items: Vec<T>,
        query: &PageQuery,
    ) -> Result<Page<T>, PaginationError> {
        let requested_size = query.page_size.filter(|size| *size > 0);
        let page_size = self.size_for(requested_size);
        let cursor_size = requested_size.map(|_| page_size);

        let count = items.len();
        // An empty collection still has one (empty) page.
        let page_count = count.div_ceil(page_size).max(1);
        let page = query.page.unwrap_or(1);
        if page == 0 || page > page_count {
            return Err(PaginationError::InvalidPage(page));
        }

        let results = items
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Ok(Page {
            count,
            next: (page < page_count).then_some(PageCursor::Number {
                page: page + 1,
                page_size: cursor_size,
            }),
            previous: (page > 1).then_some(PageCursor::Number {
                page: page - 1,
                page_size: cursor_size,
            }),
            results,
        })
    }

    fn paginate_by_offset<T>(&self, items: Vec<T>, query: &PageQuery) -> Page<T> {
        let limit = self.size_for(query.limit);
        let offset = query.offset.unwrap_or(0);

        let count = items.len();
        let results = items.into_iter().skip(offset).take(limit).collect();

        Page {
            count,
            next: (offset.saturating_add(limit) < count).then_some(PageCursor::Offset {
                limit,
                offset: offset + limit,
            }),
            previous: (offset > 0).then_some(PageCursor::Offset {
                limit,
                offset: offset.saturating_sub(limit),
            }),
            results,
        }
    }
}
