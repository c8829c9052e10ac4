use crate::error::{AppError, AppResult};

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// Caps `limit` at `max_rows`; a zero limit is rejected.
    pub fn new(limit: usize, offset: usize, max_rows: usize) -> AppResult<Self> {
        if limit == 0 {
            return Err(AppError::InvalidRequest("limit must be at least 1".into()));
        }
        Ok(Self {
            limit: limit.min(max_rows.max(1)),
            offset,
        })
    }

    /// Parses raw `limit`/`offset` request parameters.
    pub fn parse(limit: Option<&str>, offset: Option<&str>, max_rows: usize) -> AppResult<Self> {
        let limit = parse_param("limit", limit)?;
        let offset = parse_param("offset", offset)?;
        Self::new(limit, offset, max_rows)
    }

    /// A full page means more rows may follow. This cannot tell "exactly `limit`
    /// rows remained" from "more remained", so the last page may be empty.
    pub fn has_more(&self, returned: usize) -> bool {
        returned == self.limit
    }

    pub fn next(&self) -> Option<Page> {
        let offset = self.offset.checked_add(self.limit)?;
        Some(Page {
            limit: self.limit,
            offset,
        })
    }
}

fn parse_param(name: &str, raw: Option<&str>) -> AppResult<usize> {
    let raw = raw.ok_or_else(|| AppError::InvalidRequest(format!("missing parameter: {name}")))?;
    raw.trim()
        .parse::<usize>()
        .map_err(|e| AppError::InvalidRequest(format!("invalid {name} {raw:?}: {e}")))
}
