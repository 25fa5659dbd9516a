//! Legality checks run before any mode engine computes a next state.
//!
//! The common lifecycle rules live here; mode-specific preconditions are
//! delegated to [`ModeState::check`] so every rejection flows through the same
//! [`MatchError`] path.

use thiserror::Error;

use crate::state::{
    modes::{ModeState, Turn, barrier::BarrierState},
    versus::{Match, MatchAction, MatchStatus, Seat},
};

/// Reasons an action is rejected by the validator or a mode engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The actor is neither participant of the match.
    #[error("not a participant of this match")]
    NotParticipant,
    /// The action is not valid for the current lifecycle stage.
    #[error("match is not active: {0}")]
    MatchNotActive(&'static str),
    /// The match already completed.
    #[error("match is already over")]
    MatchAlreadyOver,
    /// The action is reserved to the other participant.
    #[error("action `{action}` is not permitted for this participant")]
    ActionNotPermitted {
        /// Wire name of the rejected action.
        action: &'static str,
    },
    /// `start` was issued after content was already fetched.
    #[error("match has already started")]
    AlreadyStarted,
    /// Another participant holds the turn.
    #[error("it is not your turn")]
    NotYourTurn,
    /// Second submission from the same participant.
    #[error("answer already submitted")]
    AlreadySubmitted,
    /// The current question was already claimed.
    #[error("question already buzzed")]
    AlreadyBuzzed,
    /// Parameters are missing, malformed or do not fit the mode.
    #[error("invalid action: {0}")]
    InvalidAction(String),
}

/// Accept or reject `action` from `actor`, returning the actor's seat.
pub fn validate(game: &Match, actor: &str, action: &MatchAction) -> Result<Seat, MatchError> {
    let seat = game.seat_of(actor).ok_or(MatchError::NotParticipant)?;

    match game.status() {
        MatchStatus::Completed => Err(MatchError::MatchAlreadyOver),
        MatchStatus::Pending => validate_pending(seat, action).map(|()| seat),
        MatchStatus::Active => validate_active(game, seat, action).map(|()| seat),
    }
}

/// Accept a scoring write (completion or recorded failure) for the barrier
/// round currently owned by `actor`'s request.
pub fn validate_scoring(game: &Match, actor: &str) -> Result<Seat, MatchError> {
    let seat = game.seat_of(actor).ok_or(MatchError::NotParticipant)?;

    match game.status() {
        MatchStatus::Completed => Err(MatchError::MatchAlreadyOver),
        MatchStatus::Pending => Err(MatchError::MatchNotActive("waiting for the opponent to accept")),
        MatchStatus::Active => {
            let awaiting = game
                .mode_state
                .as_ref()
                .and_then(ModeState::barrier)
                .is_some_and(BarrierState::awaiting_scores);
            if awaiting {
                Ok(seat)
            } else {
                Err(MatchError::InvalidAction("no scoring round is pending".into()))
            }
        }
    }
}

fn validate_pending(seat: Seat, action: &MatchAction) -> Result<(), MatchError> {
    match action {
        MatchAction::Accept if seat == Seat::A => Err(MatchError::ActionNotPermitted {
            action: action.name(),
        }),
        MatchAction::Accept | MatchAction::Decline | MatchAction::Cancel => Ok(()),
        _ => Err(MatchError::MatchNotActive("waiting for the opponent to accept")),
    }
}

fn validate_active(game: &Match, seat: Seat, action: &MatchAction) -> Result<(), MatchError> {
    if action.is_invite_response() {
        return Err(MatchError::MatchNotActive("invite was already accepted"));
    }

    if let MatchAction::Start = action {
        if seat != Seat::A {
            return Err(MatchError::ActionNotPermitted {
                action: action.name(),
            });
        }
        if game.mode_state.is_some() {
            return Err(MatchError::AlreadyStarted);
        }
        return Ok(());
    }

    if action.mode() != Some(game.mode) {
        return Err(MatchError::InvalidAction(format!(
            "`{}` is not available in {:?} matches",
            action.name(),
            game.mode
        )));
    }

    let state: &ModeState = game
        .mode_state
        .as_ref()
        .ok_or(MatchError::MatchNotActive("match has not started yet"))?;

    state.check(&Turn {
        actor: seat,
        action,
        participants: &game.participants,
        scores: &game.scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        content::Question,
        modes::{EngineRules, ModeState, buzz_race::BuzzRaceState},
        versus::{Difficulty, FinishReason, MatchCode, MatchMode, MatchSettings, Winner},
    };

    fn pending(mode: MatchMode) -> Match {
        Match::invite(
            MatchCode::generate(),
            mode,
            "p1".into(),
            "p2".into(),
            MatchSettings {
                topic: "DVA-C02".into(),
                difficulty: Difficulty::Easy,
            },
        )
    }

    fn question() -> Question {
        Question {
            prompt: "Which service stores objects?".into(),
            choices: vec!["EC2".into(), "S3".into()],
            answer_index: 1,
            explanation: None,
        }
    }

    fn all_actions() -> Vec<MatchAction> {
        vec![
            MatchAction::Accept,
            MatchAction::Decline,
            MatchAction::Cancel,
            MatchAction::Start,
            MatchAction::Pass {
                target: "p2".into(),
            },
            MatchAction::Wrong,
            MatchAction::Explode,
            MatchAction::Submit {
                answer: "use S3".into(),
                time_remaining: 10,
            },
            MatchAction::Finalize,
            MatchAction::Buzz,
            MatchAction::Answer { choice_index: 0 },
        ]
    }

    #[test]
    fn strangers_are_rejected_at_every_stage() {
        let mut game = pending(MatchMode::BuzzRace);
        let mut stages = vec![game.clone()];

        game.lifecycle = crate::state::versus::Lifecycle::Active;
        stages.push(game.clone());

        game.mode_state = Some(ModeState::BuzzRace(BuzzRaceState::new(vec![question()])));
        stages.push(game.clone());

        game.complete(Winner::Draw, FinishReason::QuestionsExhausted);
        stages.push(game);

        for stage in &stages {
            for action in all_actions() {
                assert_eq!(
                    validate(stage, "intruder", &action),
                    Err(MatchError::NotParticipant),
                    "{action:?} in {:?}",
                    stage.status()
                );
            }
        }
    }

    #[test]
    fn pending_only_allows_invite_responses() {
        let game = pending(MatchMode::Elimination);

        assert_eq!(validate(&game, "p2", &MatchAction::Accept), Ok(Seat::B));
        assert_eq!(validate(&game, "p1", &MatchAction::Cancel), Ok(Seat::A));
        assert_eq!(validate(&game, "p2", &MatchAction::Decline), Ok(Seat::B));
        assert_eq!(
            validate(&game, "p1", &MatchAction::Accept),
            Err(MatchError::ActionNotPermitted { action: "accept" })
        );
        assert!(matches!(
            validate(&game, "p1", &MatchAction::Start),
            Err(MatchError::MatchNotActive(_))
        ));
        assert!(matches!(
            validate(&game, "p1", &MatchAction::Wrong),
            Err(MatchError::MatchNotActive(_))
        ));
    }

    #[test]
    fn only_initiator_starts_and_only_once() {
        let mut game = pending(MatchMode::BuzzRace);
        game.lifecycle = crate::state::versus::Lifecycle::Active;

        assert_eq!(
            validate(&game, "p2", &MatchAction::Start),
            Err(MatchError::ActionNotPermitted { action: "start" })
        );
        assert_eq!(validate(&game, "p1", &MatchAction::Start), Ok(Seat::A));

        game.mode_state = Some(ModeState::BuzzRace(BuzzRaceState::new(vec![question()])));
        assert_eq!(
            validate(&game, "p1", &MatchAction::Start),
            Err(MatchError::AlreadyStarted)
        );
    }

    #[test]
    fn active_match_cannot_be_cancelled() {
        let mut game = pending(MatchMode::SubmissionBarrier);
        game.lifecycle = crate::state::versus::Lifecycle::Active;

        for action in [MatchAction::Accept, MatchAction::Decline, MatchAction::Cancel] {
            assert!(matches!(
                validate(&game, "p1", &action),
                Err(MatchError::MatchNotActive(_))
            ));
        }
    }

    #[test]
    fn gameplay_requires_start_and_matching_mode() {
        let mut game = pending(MatchMode::BuzzRace);
        game.lifecycle = crate::state::versus::Lifecycle::Active;

        assert!(matches!(
            validate(&game, "p1", &MatchAction::Buzz),
            Err(MatchError::MatchNotActive(_))
        ));
        assert!(matches!(
            validate(&game, "p1", &MatchAction::Explode),
            Err(MatchError::InvalidAction(_))
        ));

        game.mode_state = Some(
            ModeState::setup(
                MatchMode::BuzzRace,
                crate::state::content::ModeContent::Questions(vec![question()]),
                &EngineRules::default(),
                &mut rand::rng(),
            )
            .unwrap(),
        );
        assert_eq!(validate(&game, "p2", &MatchAction::Buzz), Ok(Seat::B));
    }

    #[test]
    fn completed_match_rejects_everything() {
        let mut game = pending(MatchMode::Elimination);
        game.complete(Winner::Seat(Seat::A), FinishReason::LastSurvivor);

        for action in all_actions() {
            assert_eq!(
                validate(&game, "p1", &action),
                Err(MatchError::MatchAlreadyOver)
            );
        }
    }

    #[test]
    fn scoring_writes_need_an_unclaimed_barrier() {
        use crate::state::{
            content::Brief,
            modes::barrier::{BarrierState, Submission},
        };

        let mut game = pending(MatchMode::SubmissionBarrier);
        game.lifecycle = crate::state::versus::Lifecycle::Active;
        let mut barrier = BarrierState::new(Brief {
            title: "Static site".into(),
            scenario: "Serve a brochure site".into(),
            requirements: vec![],
        });
        game.mode_state = Some(ModeState::SubmissionBarrier(barrier.clone()));
        assert!(matches!(
            validate_scoring(&game, "p1"),
            Err(MatchError::InvalidAction(_))
        ));

        for seat in Seat::BOTH {
            *barrier.submissions.get_mut(seat) = Some(Submission {
                answer: "S3".into(),
                time_remaining: 3,
                submitted_at: std::time::SystemTime::now(),
                score: None,
            });
        }
        game.mode_state = Some(ModeState::SubmissionBarrier(barrier.clone()));
        assert_eq!(validate_scoring(&game, "p2"), Ok(Seat::B));
        assert_eq!(
            validate_scoring(&game, "intruder"),
            Err(MatchError::NotParticipant)
        );

        game.mode_state = Some(ModeState::SubmissionBarrier(barrier.with_failed_scoring()));
        assert!(matches!(
            validate_scoring(&game, "p1"),
            Err(MatchError::InvalidAction(_))
        ));

        game.complete(Winner::Draw, FinishReason::SubmissionsScored);
        assert_eq!(
            validate_scoring(&game, "p1"),
            Err(MatchError::MatchAlreadyOver)
        );
    }
}
