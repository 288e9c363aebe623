//! Router assembly and the serve loop.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue},
    routing::post,
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info};

use super::handlers::{webhook, AppState};

const SERVER_BANNER: &str = concat!("drag/", env!("CARGO_PKG_VERSION"));

/// Value of the `Server` header on every response.
pub fn server_banner() -> &'static str {
    SERVER_BANNER
}

/// Build the router: POST on any path goes to [`webhook`].
///
/// Other methods get axum's stock 405. A panic anywhere below still produces
/// a 500 response.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook))
        .route("/*path", post(webhook))
        .layer(CatchPanicLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static(SERVER_BANNER),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `0.0.0.0:<port>` and serve until SIGINT/SIGTERM.
pub async fn listen(state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(address = %addr, "web_server_listening");

    serve(listener, state).await
}

/// Serve webhooks on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
