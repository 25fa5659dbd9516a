//! Next-state computation for a validated action.
//!
//! Everything here is pure: the coordinator feeds in the record it read and
//! persists the returned record with a single conditional write.

use rand::Rng;

use crate::state::{
    modes::{Advance, EngineRules, ModeState, Turn, barrier::BarrierState},
    validator::MatchError,
    versus::{FinishReason, Lifecycle, Match, MatchAction, Seat, Winner},
};

/// Compute the complete record that follows `action` by `seat`.
///
/// `start` is not handled here because it needs generated content; see
/// [`started`].
pub fn apply(
    game: &Match,
    seat: Seat,
    action: &MatchAction,
    rules: &EngineRules,
    rng: &mut impl Rng,
) -> Result<Match, MatchError> {
    let mut next = game.clone();

    match action {
        MatchAction::Accept => next.lifecycle = Lifecycle::Active,
        MatchAction::Decline => next.complete(Winner::Draw, FinishReason::Declined),
        MatchAction::Cancel => next.complete(Winner::Draw, FinishReason::Cancelled),
        MatchAction::Start => {
            return Err(MatchError::InvalidAction(
                "start needs generated content".into(),
            ));
        }
        _ => {
            let state = game
                .mode_state
                .as_ref()
                .ok_or(MatchError::MatchNotActive("match has not started yet"))?;
            let advance = state.advance(
                &Turn {
                    actor: seat,
                    action,
                    participants: &game.participants,
                    scores: &game.scores,
                },
                rules,
                rng,
            )?;

            next.mode_state = Some(advance.state);
            next.scores = advance.scores;
            if let Some((winner, reason)) = advance.finish {
                next.complete(winner, reason);
            }
        }
    }

    Ok(next)
}

/// Record that follows a successful `start` with the prepared `mode_state`.
pub fn started(game: &Match, mode_state: ModeState) -> Match {
    let mut next = game.clone();
    if let ModeState::Elimination(state) = &mode_state {
        next.scores = state.scores();
    }
    next.mode_state = Some(mode_state);
    next
}

/// Record that follows a resolved submission barrier.
pub fn scored(game: &Match, advance: Advance<BarrierState>) -> Match {
    let mut next = game.clone();
    next.mode_state = Some(ModeState::SubmissionBarrier(advance.state));
    next.scores = advance.scores;
    if let Some((winner, reason)) = advance.finish {
        next.complete(winner, reason);
    }
    next
}
