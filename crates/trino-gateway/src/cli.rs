use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "trino-gateway", version, about)]
pub struct Args {
    /// DuckDB database file served read-only.
    #[arg(long, env = "DUCKDB_FILE")]
    pub database: PathBuf,

    /// Address the HTTP server binds to.
    #[arg(long, env = "BIND_HOST", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Host (and port) clients use to reach this server; used for `nextUri`.
    /// Defaults to the bind address.
    #[arg(long, env = "EXTERNAL_HOST")]
    pub external_host: Option<String>,

    /// Scheme used for `nextUri`.
    #[arg(long, env = "EXTERNAL_SCHEME", default_value = "https")]
    pub external_scheme: String,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Rows in the first page of a submitted statement.
    #[arg(long, env = "PAGE_SIZE", default_value_t = 1024)]
    pub page_size: usize,

    /// Maximum rows returned per page (larger requested limits are capped).
    #[arg(long, env = "MAX_ROWS", default_value_t = 100_000)]
    pub max_rows: usize,

    /// Deadline for a single query.
    #[arg(long, env = "QUERY_TIMEOUT_MS", default_value_t = 300_000)]
    pub timeout_ms: u64,
}

impl Args {
    pub fn external_host(&self) -> &str {
        self.external_host.as_deref().unwrap_or(&self.bind)
    }
}
