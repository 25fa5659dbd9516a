use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{
    dao::storage::StorageError,
    state::{
        modes::ModeState,
        versus::{
            FinishReason, Lifecycle, Match, MatchCode, MatchMode, MatchSettings, MatchStatus,
            Outcome, Scores, Sides, Winner,
        },
    },
};

/// Match record as persisted by every storage backend.
///
/// The flat layout keeps the status, winner and reason as separate columns so
/// the record stays queryable; [`TryFrom<MatchEntity>`] re-checks that they
/// agree before handing a [`Match`] to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchEntity {
    /// Primary key.
    pub code: String,
    /// Immutable rule set.
    pub mode: MatchMode,
    /// Initiator.
    pub participant_a: String,
    /// Invited opponent.
    pub participant_b: String,
    /// Lifecycle stage.
    pub status: MatchStatus,
    /// Initiator score.
    pub score_a: u32,
    /// Opponent score.
    pub score_b: u32,
    /// Set iff completed.
    #[serde(default)]
    pub winner: Option<Winner>,
    /// Set iff completed.
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
    /// Mode payload, tagged by mode.
    #[serde(default)]
    pub mode_state: Option<ModeState>,
    /// Generator parameters.
    pub settings: MatchSettings,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Set iff completed.
    #[serde(default)]
    pub completed_at: Option<SystemTime>,
    /// Conditional-write counter.
    pub version: u64,
}

impl From<Match> for MatchEntity {
    fn from(game: Match) -> Self {
        let status = game.status();
        let (winner, finish_reason, completed_at) = match &game.lifecycle {
            Lifecycle::Completed(outcome) => (
                Some(outcome.winner),
                Some(outcome.reason),
                Some(outcome.completed_at),
            ),
            Lifecycle::Pending | Lifecycle::Active => (None, None, None),
        };

        Self {
            code: game.code.to_string(),
            mode: game.mode,
            participant_a: game.participants.a,
            participant_b: game.participants.b,
            status,
            score_a: game.scores.a,
            score_b: game.scores.b,
            winner,
            finish_reason,
            mode_state: game.mode_state,
            settings: game.settings,
            created_at: game.created_at,
            completed_at,
            version: game.version,
        }
    }
}

impl TryFrom<MatchEntity> for Match {
    type Error = StorageError;

    fn try_from(entity: MatchEntity) -> Result<Self, Self::Error> {
        let code = MatchCode::parse(&entity.code)
            .ok_or_else(|| StorageError::corrupted(&entity.code, "malformed match code"))?;

        if let Some(state_mode) = entity.mode_state.as_ref().map(ModeState::mode) {
            if state_mode != entity.mode {
                return Err(StorageError::corrupted(
                    &entity.code,
                    format!(
                        "mode state for {state_mode:?} stored on a {:?} match",
                        entity.mode
                    ),
                ));
            }
        }

        let lifecycle = match (
            entity.status,
            entity.winner,
            entity.finish_reason,
            entity.completed_at,
        ) {
            (MatchStatus::Pending, None, None, None) if entity.mode_state.is_none() => {
                Lifecycle::Pending
            }
            (MatchStatus::Active, None, None, None) => Lifecycle::Active,
            (MatchStatus::Completed, Some(winner), Some(reason), Some(completed_at)) => {
                Lifecycle::Completed(Outcome {
                    winner,
                    reason,
                    completed_at,
                })
            }
            (status, winner, ..) => {
                return Err(StorageError::corrupted(
                    &entity.code,
                    format!("status {status:?} is inconsistent with winner {winner:?}"),
                ));
            }
        };

        Ok(Match {
            code,
            mode: entity.mode,
            participants: Sides::new(entity.participant_a, entity.participant_b),
            lifecycle,
            scores: Scores::new(entity.score_a, entity.score_b),
            mode_state: entity.mode_state,
            settings: entity.settings,
            created_at: entity.created_at,
            version: entity.version,
        })
    }
}
