use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    routes::matches::{Participant, parse_code},
    services::sse_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/match/{code}/events",
    tag = "fanout",
    params(
        ("code" = String, Path, description = "Match code"),
        ("participantId" = String, Query, description = "Caller identity when the header cannot be set")
    ),
    responses(
        (status = 200, description = "`match.state` event stream", content_type = "text/event-stream", body = String),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown match code")
    )
)]
/// Stream `match.state` events of one match, starting with its current state.
pub async fn match_events(
    State(state): State<SharedState>,
    Participant(viewer): Participant,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let code = parse_code(&code)?;
    let (receiver, snapshot) = sse_service::subscribe_match(&state, &code, &viewer).await?;
    info!(%code, participant = %viewer, "new match SSE connection");
    Ok(sse_service::to_sse_stream(state, receiver, snapshot, code))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/match/{code}/events", get(match_events))
}
