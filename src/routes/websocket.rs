use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{
    error::AppError,
    routes::matches::{Participant, parse_code},
    services::{match_service, websocket_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/match/{code}/ws",
    tag = "fanout",
    params(
        ("code" = String, Path, description = "Match code"),
        ("participantId" = String, Query, description = "Caller identity when the header cannot be set")
    ),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown match code")
    )
)]
/// Upgrade to a match WebSocket once the caller is known to be a participant.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Participant(participant): Participant,
    Path(code): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let code = parse_code(&code)?;
    match_service::get_match(&state, &code, &participant).await?;

    Ok(ws.on_upgrade(move |socket| {
        websocket_service::handle_socket(state, socket, code, participant)
    }))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/match/{code}/ws", get(ws_handler))
}
