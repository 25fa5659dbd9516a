use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    routing::{get, post},
};
use axum_valid::Valid;
use serde::Deserialize;

use crate::{
    dto::{
        match_dto::{ActionRequest, ActionResponse, CreateMatchRequest, MatchView},
        validation::validate_participant_id,
    },
    error::AppError,
    services::match_service,
    state::{
        SharedState,
        versus::{MatchAction, MatchCode, ParticipantId, Seat},
    },
};

/// Header carrying the caller identity.
pub const PARTICIPANT_HEADER: &str = "x-participant-id";

/// Match endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", post(create_match))
        .route("/match/{code}", get(get_match))
        .route("/match/{code}/action", post(perform_action))
}

/// Identity of the calling participant.
///
/// Read from the `X-Participant-Id` header, or from the `participantId` query
/// parameter for clients (browser WebSockets, `EventSource`) that cannot set
/// headers.
#[derive(Debug, Clone)]
pub struct Participant(pub ParticipantId);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantQuery {
    participant_id: Option<String>,
}

impl<S> FromRequestParts<S> for Participant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(PARTICIPANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);

        let id = match from_header {
            Some(id) => id,
            None => Query::<ParticipantQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(query)| query.participant_id)
                .map(|id| id.trim().to_owned())
                .filter(|id| !id.is_empty())
                .ok_or_else(AppError::unauthenticated)?,
        };

        validate_participant_id(&id).map_err(|err| {
            AppError::Unauthorized(
                "UNAUTHENTICATED",
                err.message
                    .map(|message| message.into_owned())
                    .unwrap_or_else(|| "invalid participant id".into()),
            )
        })?;

        Ok(Participant(id))
    }
}

/// Parse a path segment into a match code; malformed codes cannot exist.
pub fn parse_code(raw: &str) -> Result<MatchCode, AppError> {
    MatchCode::parse(raw).ok_or_else(|| AppError::unknown_match(raw))
}

#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    params(("X-Participant-Id" = String, Header, description = "Caller identity")),
    responses(
        (status = 201, description = "Pending match created", body = MatchView),
        (status = 400, description = "Invalid invite"),
        (status = 401, description = "Missing participant identity"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Invite an opponent to a new match.
pub async fn create_match(
    State(state): State<SharedState>,
    Participant(initiator): Participant,
    Valid(Json(request)): Valid<Json<CreateMatchRequest>>,
) -> Result<(StatusCode, Json<MatchView>), AppError> {
    let game = match_service::create_match(&state, &initiator, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(MatchView::project(&game, Some(Seat::A))),
    ))
}

#[utoipa::path(
    get,
    path = "/match/{code}",
    tag = "matches",
    params(
        ("code" = String, Path, description = "Match code"),
        ("X-Participant-Id" = String, Header, description = "Caller identity")
    ),
    responses(
        (status = 200, description = "Current match state", body = MatchView),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown match code")
    )
)]
/// Return the caller's view of a match.
pub async fn get_match(
    State(state): State<SharedState>,
    Participant(viewer): Participant,
    Path(code): Path<String>,
) -> Result<Json<MatchView>, AppError> {
    let code = parse_code(&code)?;
    let (game, seat) = match_service::get_match(&state, &code, &viewer).await?;
    Ok(Json(MatchView::project(&game, Some(seat))))
}

#[utoipa::path(
    post,
    path = "/match/{code}/action",
    tag = "matches",
    request_body = ActionRequest,
    params(
        ("code" = String, Path, description = "Match code"),
        ("X-Participant-Id" = String, Header, description = "Caller identity")
    ),
    responses(
        (status = 200, description = "Action applied", body = ActionResponse),
        (status = 400, description = "Invalid action or lifecycle stage"),
        (status = 401, description = "Missing participant identity"),
        (status = 403, description = "Not a participant, not permitted or not your turn"),
        (status = 404, description = "Unknown match code"),
        (status = 409, description = "Already submitted, already buzzed or concurrent update"),
        (status = 500, description = "Generator or scorer failure"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Apply an action on behalf of the caller.
pub async fn perform_action(
    State(state): State<SharedState>,
    Participant(actor): Participant,
    Path(code): Path<String>,
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    let code = parse_code(&code)?;
    let Json(request) = payload
        .map_err(|rejection| AppError::BadRequest("INVALID_ACTION", rejection.body_text()))?;

    let outcome =
        match_service::perform_action(&state, &code, &actor, MatchAction::from(request)).await?;
    Ok(Json(ActionResponse::new(
        &outcome.game,
        outcome.seat,
        outcome.waiting_for_opponent,
    )))
}
