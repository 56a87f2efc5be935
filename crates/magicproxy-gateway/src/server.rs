//! Router assembly and the serve loop.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;

use crate::context::AppContext;
use crate::error::GatewayResult;
use crate::handler::{health, proxy};

/// Path of the local health check. Never forwarded.
pub const HEALTH_PATH: &str = "/__health";

/// The proxy's router: the health route plus a catch-all forwarding fallback.
#[must_use]
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .fallback(proxy)
        .with_state(ctx)
}

/// Serve on `listener` until `shutdown` resolves, then drain in-flight requests.
///
/// # Errors
///
/// Returns [`crate::GatewayError::Io`] if the accept loop fails.
pub async fn serve<F>(
    listener: TcpListener,
    ctx: Arc<AppContext>,
    shutdown: F,
) -> GatewayResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, upstream = ctx.forwarder().base_url(), "magicproxy listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("magicproxy stopped");
    Ok(())
}

/// Bind `addr` and serve until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns [`crate::GatewayError::Io`] if binding or serving fails.
pub async fn run(addr: &str, ctx: Arc<AppContext>) -> GatewayResult<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, ctx, shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = sigterm => {},
    }
    tracing::info!("shutdown signal received");
}
