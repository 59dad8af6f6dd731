use std::path::PathBuf;

use aparajito_bridge::BridgeHandle;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// The HTTP surface: the bridge gateway plus, when a web directory is
/// given, the UI bundle with an `index.html` fallback for client routes.
pub fn build_app(bridge: BridgeHandle, web_dir: Option<&PathBuf>) -> Router {
    let router = aparajito_ws::gateway_router().with_state(bridge);

    let router = match web_dir {
        Some(dir) => {
            let spa_fallback = ServeFile::new(dir.join("index.html"));
            let serve_dir = ServeDir::new(dir).not_found_service(spa_fallback);
            router.fallback_service(serve_dir)
        }
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

/// Resolve the web UI directory: CLI first, then config. Missing
/// directories are skipped with a warning.
pub fn resolve_web_dir(cli: Option<String>, configured: Option<String>) -> Option<PathBuf> {
    cli.or(configured).map(PathBuf::from).filter(|p| {
        if p.is_dir() {
            true
        } else {
            tracing::warn!(
                "Web UI directory {:?} does not exist, skipping static file serving",
                p
            );
            false
        }
    })
}
