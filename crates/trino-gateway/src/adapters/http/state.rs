use crate::cli::Args;
use crate::core::connection::ConnectionManager;
use crate::core::cursor::CursorEncoder;

#[derive(Debug, Clone)]
pub struct AppState {
    pub connections: ConnectionManager,
    pub cursors: CursorEncoder,
    pub settings: Settings,
}

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Rows in the first page of a submitted statement.
    pub page_size: usize,
    pub max_rows: usize,
    pub timeout_ms: u64,
}

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Self {
            page_size: args.page_size,
            max_rows: args.max_rows,
            timeout_ms: args.timeout_ms,
        }
    }
}
