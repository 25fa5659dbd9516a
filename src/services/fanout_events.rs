use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dto::{
        match_dto::{ActionResponse, MatchView},
        sse::{ActionRejected, MATCH_ACK_EVENT, MATCH_ERROR_EVENT, MATCH_STATE_EVENT, ServerEvent},
    },
    error::ServiceError,
    services::match_service::ActionOutcome,
    state::{SharedState, versus::Match},
};

/// `match.state` event carrying the public projection of `game`.
pub fn match_state_event(game: &Match) -> Option<ServerEvent> {
    build_event(MATCH_STATE_EVENT, &MatchView::project(game, None))
}

/// `match.ack` event telling a WebSocket client how its own action resolved.
pub fn action_ack_event(outcome: &ActionOutcome) -> Option<ServerEvent> {
    let payload = ActionResponse::new(&outcome.game, outcome.seat, outcome.waiting_for_opponent);
    build_event(MATCH_ACK_EVENT, &payload)
}

/// `match.error` event answering a rejected WebSocket action.
pub fn action_rejected_event(err: &ServiceError) -> Option<ServerEvent> {
    let payload = ActionRejected {
        code: err.code().to_string(),
        message: err.to_string(),
    };
    build_event(MATCH_ERROR_EVENT, &payload)
}

/// Push the state written by a successful mutation to every subscriber.
///
/// Runs after the write; failures are logged and never reach the caller.
pub fn broadcast_match_state(state: &SharedState, game: &Match) {
    let Some(event) = match_state_event(game) else {
        return;
    };

    match state.notifier().publish(&game.code, event) {
        Ok(delivered) => debug!(
            code = %game.code,
            version = game.version,
            delivered,
            "published match state"
        ),
        Err(err) => warn!(code = %game.code, error = %err, "failed to publish match state"),
    }
}

fn build_event(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize match event payload");
            None
        }
    }
}
