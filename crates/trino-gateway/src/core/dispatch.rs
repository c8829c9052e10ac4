//! Rewrites Trino introspection commands into DuckDB `information_schema` queries.
//!
//! Recognition is pattern based. Anything that does not match one of the
//! commands below goes to the engine unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::types::Statement;

#[allow(clippy::expect_used)]
static SHOW_CATALOGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*show\s+catalogs\s*$").expect("valid regex"));

#[allow(clippy::expect_used)]
static SHOW_SCHEMAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*show\s+schemas\s+from\s+(?P<catalog>[0-9A-Za-z_-]+)\s*$")
        .expect("valid regex")
});

#[allow(clippy::expect_used)]
static SHOW_TABLES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*show\s+tables\s+from\s+",
        r"(?P<catalog>[0-9A-Za-z_-]+)\.(?P<schema>[0-9A-Za-z_-]+)\s*$",
    ))
    .expect("valid regex")
});

const LIST_CATALOGS: &str =
    r#"SELECT DISTINCT catalog_name AS "Catalog" FROM information_schema.schemata ORDER BY 1"#;

const LIST_SCHEMAS: &str = concat!(
    r#"SELECT DISTINCT schema_name AS "Schema" FROM information_schema.schemata "#,
    "WHERE catalog_name = ? ORDER BY 1",
);

const LIST_TABLES: &str = concat!(
    r#"SELECT table_name AS "Table" FROM information_schema.tables "#,
    "WHERE table_catalog = ? AND table_schema = ? ORDER BY 1",
);

/// Captured identifiers are bound as parameters, never spliced into the SQL.
pub fn dispatch(query: &str) -> Statement {
    if SHOW_CATALOGS.is_match(query) {
        return rewritten(LIST_CATALOGS, Vec::new());
    }
    if let Some(caps) = SHOW_SCHEMAS.captures(query) {
        return rewritten(LIST_SCHEMAS, vec![caps["catalog"].to_string()]);
    }
    if let Some(caps) = SHOW_TABLES.captures(query) {
        return rewritten(
            LIST_TABLES,
            vec![caps["catalog"].to_string(), caps["schema"].to_string()],
        );
    }
    Statement::verbatim(query)
}

fn rewritten(sql: &str, params: Vec<String>) -> Statement {
    tracing::debug!(rewrite = sql, ?params, "compatibility command rewritten");
    Statement {
        sql: sql.to_string(),
        params,
        rewritten: true,
    }
}
