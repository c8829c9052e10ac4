use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use duckdb::{AccessMode, Config, Connection, InterruptHandle};

use crate::{
    core::{limits::Page, query, types::ResultPage, types::Statement},
    error::{AppError, AppResult},
};

/// Settings applied to the shared engine handle on open. `lock_configuration`
/// goes last so the others are in place before the configuration freezes.
const HARDENING: [(&str, &str); 4] = [
    ("enable_external_access", "false"),
    ("autoload_known_extensions", "false"),
    ("autoinstall_known_extensions", "false"),
    ("lock_configuration", "true"),
];

/// Process-wide, read-only engine handle. Requests get their own connection
/// cloned from the root one.
#[derive(Clone)]
pub struct ConnectionManager {
    root: Arc<Mutex<Connection>>,
    pub db_path: PathBuf,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = open_conn(path).map_err(|source| AppError::DbOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "database opened read-only");
        Ok(Self {
            root: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        })
    }

    /// A fresh connection to the shared database. It must not outlive `self`.
    pub fn acquire(&self) -> AppResult<Connection> {
        let guard = self
            .root
            .lock()
            .map_err(|_| AppError::Internal("poisoned lock".into()))?;
        guard
            .try_clone()
            .map_err(|e| AppError::ConnectionUnavailable(e.to_string()))
    }

    /// Runs one page on a blocking worker with a connection scoped to this call.
    /// Dropping the returned future before it resolves interrupts the query.
    pub async fn query_page(&self, statement: Statement, page: Page) -> AppResult<ResultPage> {
        let conn = self.acquire()?;
        let guard = InterruptOnDrop::new(conn.interrupt_handle());
        let root = Arc::clone(&self.root);

        let task = tokio::task::spawn_blocking(move || {
            let res = query::run_page(&conn, &statement, page);
            // The clone borrows the root's database; release it first.
            drop(conn);
            drop(root);
            res
        });
        let res = task
            .await
            .map_err(|e| AppError::Internal(format!("query worker failed: {e}")))?;
        guard.disarm();
        res
    }
}

struct InterruptOnDrop {
    handle: Option<Arc<InterruptHandle>>,
}

impl InterruptOnDrop {
    fn new(handle: Arc<InterruptHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("request abandoned; interrupting query");
            handle.interrupt();
        }
    }
}

fn open_conn(path: &Path) -> duckdb::Result<Connection> {
    let config = HARDENING
        .iter()
        .try_fold(Config::default().access_mode(AccessMode::ReadOnly)?, |config, (key, value)| {
            config.with(key, value)
        })?;
    Connection::open_with_flags(path, config)
}
