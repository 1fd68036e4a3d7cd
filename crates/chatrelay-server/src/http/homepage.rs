//! `GET /`: the chat page.

use axum::extract::State;
use axum::response::Html;
use chatrelay_settings::ClientTransport;

use crate::state::AppState;

const PAGE: &str = include_str!("../../assets/index.html");
const WS_CLIENT: &str = include_str!("../../assets/ws_client.js");
const HTTP_CLIENT: &str = include_str!("../../assets/http_client.js");
const SCRIPT_SLOT: &str = "<!-- client-script -->";

/// Page markup with the client script for `transport` embedded.
pub fn render_page(transport: ClientTransport) -> String {
    let script = match transport {
        ClientTransport::Http => HTTP_CLIENT,
        ClientTransport::Websocket => WS_CLIENT,
    };
    PAGE.replacen(SCRIPT_SLOT, script, 1)
}

/// Serve the chat page.
pub async fn homepage(State(state): State<AppState>) -> Html<String> {
    Html(render_page(state.settings.ui.transport))
}
