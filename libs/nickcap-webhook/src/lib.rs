use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tokio_util::sync::CancellationToken;

pub mod dispatch;
pub mod normalize;

use dispatch::{CallbackReply, Dispatcher};

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

/// Webhook HTTP server. One route, one reply per request.
pub async fn run(
    port: u16,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
) -> Result<(), String> {
    let state = AppState { dispatcher };

    let app = Router::new()
        .route("/callback", post(handle_callback))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| format!("bind webhook :{port}: {e}"))?;

    tracing::info!(port, "webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| format!("axum serve: {e}"))?;

    Ok(())
}

// --- POST /callback ---

async fn handle_callback(State(state): State<AppState>, body: String) -> Response {
    state.dispatcher.handle(&body).into_response()
}

impl IntoResponse for CallbackReply {
    fn into_response(self) -> Response {
        match self {
            CallbackReply::Signed(payload) => axum::Json(payload).into_response(),
            CallbackReply::Ack => StatusCode::NO_CONTENT.into_response(),
            CallbackReply::ServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
