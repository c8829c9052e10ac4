use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Logs go to stderr. `RUST_LOG` wins over `--log-level`; an unparseable level
/// falls back to `info` and is reported once the subscriber is up.
pub fn init(log_level: &str) {
    let (filter, rejected) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => match EnvFilter::try_new(log_level) {
            Ok(filter) => (filter, None),
            Err(e) => (EnvFilter::new("info"), Some(e)),
        },
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();

    if let Some(e) = rejected {
        tracing::warn!(log_level, error = %e, "invalid log level; using info");
    }
}
