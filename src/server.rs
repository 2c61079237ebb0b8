use axum::{extract::DefaultBodyLimit, http::HeaderValue, middleware::from_fn, Router};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::AppConfig;
use crate::middleware::{request_context_middleware, REQUEST_ID_HEADER};
use crate::state::AppState;
use crate::{db, error, routes};

const MAX_BODY_BYTES: usize = 1024 * 1024;
const POOL_SIZE: u32 = 16;

/// The full application: routes plus the middleware stack.
pub fn build_app(state: AppState) -> Router {
    layered(routes::router(), state)
}

/// Wraps `router` in the request pipeline, outermost first:
/// request context → CORS → compression → tracing → panic guard → body limit.
pub fn layered(router: Router<AppState>, state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    router
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(request_context_middleware))
}

fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([REQUEST_ID_HEADER.clone()]);

    if cfg.allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring unusable CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();
    if origins.is_empty() && cfg.debug {
        // Local development with a separately served frontend
        return CorsLayer::permissive().expose_headers([REQUEST_ID_HEADER.clone()]);
    }
    base.allow_origin(AllowOrigin::list(origins))
}

/// Connects, migrates and serves until Ctrl-C / SIGTERM.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let pool = db::connect(&cfg.database_url, POOL_SIZE).await?;
    let applied = db::migrate(&pool).await?;
    if !applied.is_empty() {
        info!("Database schema migrated ({} migration(s) applied)", applied.len());
    }

    let addr = cfg.listen_addr()?;
    let app_name = cfg.app_name.clone();
    let app = build_app(AppState::new(pool.clone(), cfg));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("{} listening on http://{}", app_name, listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
