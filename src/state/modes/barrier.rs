//! Submission-barrier engine.
//!
//! Each participant submits exactly once. Scoring happens outside the engine
//! (it needs the external scorer); [`BarrierState::scored`] folds the returned
//! scores into the terminal state.
//!
//! Scoring runs once per barrier. The writer that stores the second
//! submission owns the first round; `finalize` is only legal after a round
//! failed and claims the retry by clearing [`BarrierState::scoring_failed`].

use std::time::SystemTime;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::{
    content::Brief,
    modes::{Advance, EngineRules, ModeEngine, Turn, foreign_action},
    validator::MatchError,
    versus::{FinishReason, MatchAction, MatchMode, Scores, Seat, Sides, Winner},
};

/// One participant's answer to the brief.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Submitted answer.
    pub answer: String,
    /// Seconds left on the client timer.
    pub time_remaining: u32,
    /// Server time of the accepted submission.
    pub submitted_at: SystemTime,
    /// Score returned by the scorer, once the barrier resolved.
    pub score: Option<u32>,
}

/// Barrier payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierState {
    /// Shared scenario.
    pub brief: Brief,
    /// Per-seat submissions, unset until submitted.
    pub submissions: Sides<Option<Submission>>,
    /// The last scoring round failed and nobody has claimed the retry yet.
    #[serde(default)]
    pub scoring_failed: bool,
}

impl BarrierState {
    /// Fresh barrier with no submissions.
    pub fn new(brief: Brief) -> Self {
        Self {
            brief,
            submissions: Sides::default(),
            scoring_failed: false,
        }
    }

    /// Whether `seat` already submitted.
    pub fn has_submitted(&self, seat: Seat) -> bool {
        self.submissions.get(seat).is_some()
    }

    /// The barrier condition.
    pub fn both_submitted(&self) -> bool {
        Seat::BOTH.into_iter().all(|seat| self.has_submitted(seat))
    }

    /// Whether a scoring round may complete or fail this barrier right now.
    pub fn awaiting_scores(&self) -> bool {
        self.both_submitted() && !self.scoring_failed
    }

    /// State recording that the scorer could not be reached.
    pub fn with_failed_scoring(&self) -> Self {
        Self {
            scoring_failed: true,
            ..self.clone()
        }
    }

    /// Terminal state for the given scorer results. The higher score wins.
    pub fn scored(&self, scores: Scores) -> Advance<Self> {
        let mut next = self.clone();
        for seat in Seat::BOTH {
            if let Some(submission) = next.submissions.get_mut(seat) {
                submission.score = Some(*scores.get(seat));
            }
        }

        Advance {
            state: next,
            finish: Some((Winner::by_score(&scores), FinishReason::SubmissionsScored)),
            scores,
        }
    }
}

impl ModeEngine for BarrierState {
    fn check(&self, turn: &Turn<'_>) -> Result<(), MatchError> {
        match turn.action {
            MatchAction::Submit { answer, .. } => {
                if self.has_submitted(turn.actor) {
                    return Err(MatchError::AlreadySubmitted);
                }
                if answer.trim().is_empty() {
                    return Err(MatchError::InvalidAction("answer must not be empty".into()));
                }
                Ok(())
            }
            MatchAction::Finalize if !self.both_submitted() => Err(MatchError::InvalidAction(
                "both participants must submit before scoring".into(),
            )),
            MatchAction::Finalize if !self.scoring_failed => Err(MatchError::InvalidAction(
                "submissions are already being scored".into(),
            )),
            MatchAction::Finalize => Ok(()),
            other => Err(foreign_action(other, MatchMode::SubmissionBarrier)),
        }
    }

    fn advance(
        &self,
        turn: &Turn<'_>,
        _rules: &EngineRules,
        _rng: &mut impl Rng,
    ) -> Result<Advance<Self>, MatchError> {
        let mut next = self.clone();
        match turn.action {
            MatchAction::Submit {
                answer,
                time_remaining,
            } => {
                *next.submissions.get_mut(turn.actor) = Some(Submission {
                    answer: answer.clone(),
                    time_remaining: *time_remaining,
                    submitted_at: SystemTime::now(),
                    score: None,
                });
            }
            // Claims the retry; scores arrive through `scored`.
            MatchAction::Finalize => next.scoring_failed = false,
            other => return Err(foreign_action(other, MatchMode::SubmissionBarrier)),
        }

        Ok(Advance {
            state: next,
            scores: turn.scores.clone(),
            finish: None,
        })
    }
}
