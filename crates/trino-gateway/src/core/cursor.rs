//! Stateless continuation cursors.
//!
//! A cursor carries everything needed to produce the next page, so the server
//! keeps no per-query state between requests.

use url::{form_urlencoded, Url};

use crate::core::limits::Page;
use crate::error::{AppError, AppResult};

const QUERY: &str = "query";
const LIMIT: &str = "limit";
const OFFSET: &str = "offset";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
}

impl Cursor {
    /// The cursor for the page after `page`, or `None` when `page` was final.
    pub fn following(query: &str, page: Page, returned: usize) -> Option<Self> {
        if !page.has_more(returned) {
            return None;
        }
        let next = page.next()?;
        Some(Self {
            query: query.to_string(),
            limit: next.limit,
            offset: next.offset,
        })
    }
}

/// Builds `nextUri`s on the externally reachable address.
#[derive(Debug, Clone)]
pub struct CursorEncoder {
    base: Url,
}

impl CursorEncoder {
    pub fn new(scheme: &str, host: &str) -> AppResult<Self> {
        let base = Url::parse(&format!("{scheme}://{host}/")).map_err(|e| {
            AppError::InvalidConfig(format!("external address {scheme}://{host}: {e}"))
        })?;
        if base.cannot_be_a_base() || base.host().is_none() {
            return Err(AppError::InvalidConfig(format!(
                "external address {scheme}://{host} has no host"
            )));
        }
        Ok(Self { base })
    }

    /// Re-roots the current request (`path`, raw `query_string`) on the external
    /// address and points it at the cursor's page. Unrelated parameters survive.
    pub fn encode(&self, path: &str, query_string: Option<&str>, cursor: &Cursor) -> String {
        let mut url = self.base.clone();
        url.set_path(path);

        let kept: Vec<(String, String)> = query_string
            .map(|qs| {
                form_urlencoded::parse(qs.as_bytes())
                    .filter(|(k, _)| k != QUERY && k != LIMIT && k != OFFSET)
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(LIMIT, &cursor.limit.to_string())
            .append_pair(OFFSET, &cursor.offset.to_string())
            .append_pair(QUERY, &cursor.query);
        url.to_string()
    }
}
