//! Read-only HTTP dashboard over a [`PhaseTracker`]: JSON stats, sessions
//! and phases plus an embedded auto-refreshing HTML page.

pub mod embed;
pub mod error;
pub mod routes;
pub mod state;

use aisop_core::PhaseTracker;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all dashboard routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(tracker: PhaseTracker) -> Router {
    let app_state = state::AppState::new(tracker);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(embed::dashboard_page))
        .route("/dashboard", get(embed::dashboard_page))
        .route("/api/stats", get(routes::stats::get_stats))
        .route("/api/sessions", get(routes::sessions::list_sessions))
        .route("/api/sessions/{id}", get(routes::sessions::get_session))
        .route("/api/phases", get(routes::phases::list_phases))
        .fallback(embed::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Start the dashboard on `port`, optionally opening it in a browser.
pub async fn serve(tracker: PhaseTracker, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(tracker, listener, open_browser).await
}

/// Start the dashboard on a pre-bound listener.
///
/// Lets the caller read the actual port before starting (useful when
/// `port = 0` and the OS picks a free port).
pub async fn serve_on(
    tracker: PhaseTracker,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let port = listener.local_addr()?.port();
    let app = build_router(tracker);

    let url = format!("http://localhost:{port}");
    tracing::info!("AI-SOP dashboard listening on {url}");
    tracing::info!("API: {url}/api/stats, {url}/api/sessions, {url}/api/phases");

    if open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open browser");
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}
