mod handler;
pub mod protocol;
pub mod state;
#[cfg(test)]
mod tests;

use axum::{routing::get, Json, Router};
use tokio::{net::TcpListener, signal};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    cli::Args,
    core::{connection::ConnectionManager, cursor::CursorEncoder},
    error::AppResult,
};

use self::state::{AppState, Settings};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/statement",
            get(handler::fetch).post(handler::submit),
        )
        .route("/health", get(|| async { Json("OK") }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}

pub async fn run(args: Args) -> AppResult<()> {
    let connections = ConnectionManager::open(&args.database)?;
    let cursors = CursorEncoder::new(&args.external_scheme, args.external_host())?;
    let state = AppState {
        connections,
        cursors,
        settings: Settings::from(&args),
    };

    let listener = TcpListener::bind(&args.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        external = %format!("{}://{}", args.external_scheme, args.external_host()),
        "listening"
    );

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::warn!("Ctrl+C received, starting graceful shutdown"),
        () = terminate => tracing::warn!("SIGTERM received, starting graceful shutdown"),
    }
}
