mod handler;

use aparajito_bridge::BridgeHandle;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::IntoResponse,
    routing::get,
    Router,
};

pub use handler::handle_connection;

/// Path the UI connects to.
pub const GATEWAY_PATH: &str = "/bridge";

pub fn gateway_router() -> Router<BridgeHandle> {
    Router::new().route(GATEWAY_PATH, get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(bridge): State<BridgeHandle>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handler::handle_connection(socket, bridge))
}
