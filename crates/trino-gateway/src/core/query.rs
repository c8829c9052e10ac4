use duckdb::{params_from_iter, Connection};

use crate::core::limits::Page;
use crate::core::materialize::materialize;
use crate::core::types::{ResultPage, Statement};
use crate::error::AppResult;

/// Runs one page of `statement` by wrapping it in an outer LIMIT/OFFSET.
pub fn run_page(conn: &Connection, statement: &Statement, page: Page) -> AppResult<ResultPage> {
    let sql = paginate(&statement.sql, page);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;
    let result = materialize(&mut rows)?;
    tracing::debug!(
        rows = result.row_count(),
        limit = page.limit,
        offset = page.offset,
        "page materialized"
    );
    Ok(result)
}

/// The inner text sits on its own lines so a trailing `--` comment cannot
/// swallow the closing parenthesis.
pub(crate) fn paginate(sql: &str, page: Page) -> String {
    let inner = sql.trim_end_matches(|c: char| c.is_whitespace() || c == ';');
    format!(
        "SELECT * FROM (\n{inner}\n) LIMIT {} OFFSET {}",
        page.limit, page.offset
    )
}
