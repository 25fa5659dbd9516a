//! Mode engines. Each engine is a pure function from (state, actor, action) to
//! the complete next state, so the coordinator can persist it in one write.

pub mod barrier;
pub mod buzz_race;
pub mod elimination;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::{
    content::ModeContent,
    validator::MatchError,
    versus::{FinishReason, MatchAction, MatchMode, ParticipantId, Scores, Seat, Sides, Winner},
};

use self::{barrier::BarrierState, buzz_race::BuzzRaceState, elimination::EliminationState};

/// What a buzz-race engine does with a question after a wrong answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrongAnswerRule {
    /// Clear the buzz; both players may buzz the same question again.
    #[default]
    Rebuzz,
    /// Skip to the next question.
    Forfeit,
}

/// Tunable constants shared by the engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineRules {
    /// Size of the elimination question set.
    pub elimination_questions: usize,
    /// Fuse length after `start` and after every `pass`.
    pub fuse_seconds: u32,
    /// Fuse length after an explosion hands the bomb on.
    pub short_fuse_seconds: u32,
    /// Size of the buzz-race question set.
    pub buzz_questions: usize,
    /// Points for a correct buzz-race answer.
    pub buzz_points: u32,
    /// Wrong-answer handling in buzz race.
    pub wrong_answer_rule: WrongAnswerRule,
}

impl Default for EngineRules {
    fn default() -> Self {
        Self {
            elimination_questions: 5,
            fuse_seconds: 30,
            short_fuse_seconds: 15,
            buzz_questions: 10,
            buzz_points: 10,
            wrong_answer_rule: WrongAnswerRule::Rebuzz,
        }
    }
}

impl EngineRules {
    /// Number of questions `start` requests for `mode`, `None` when the mode uses a brief.
    pub fn question_count(&self, mode: MatchMode) -> Option<usize> {
        match mode {
            MatchMode::Elimination => Some(self.elimination_questions),
            MatchMode::BuzzRace => Some(self.buzz_questions),
            MatchMode::SubmissionBarrier => None,
        }
    }
}

/// Inputs an engine sees for one action.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    /// Seat of the acting participant.
    pub actor: Seat,
    /// Requested action.
    pub action: &'a MatchAction,
    /// Identities, used to resolve action targets.
    pub participants: &'a Sides<ParticipantId>,
    /// Scores before the action.
    pub scores: &'a Scores,
}

/// Complete next state computed by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance<S> {
    /// Next mode payload.
    pub state: S,
    /// Next scores.
    pub scores: Scores,
    /// Set when the action satisfied a termination rule.
    pub finish: Option<(Winner, FinishReason)>,
}

impl<S> Advance<S> {
    fn map<T>(self, wrap: impl FnOnce(S) -> T) -> Advance<T> {
        Advance {
            state: wrap(self.state),
            scores: self.scores,
            finish: self.finish,
        }
    }
}

/// Common action-dispatch contract of the three mode engines.
pub trait ModeEngine: Sized {
    /// Mode-specific preconditions, run by the validator.
    fn check(&self, turn: &Turn<'_>) -> Result<(), MatchError>;

    /// Compute the next state for an action that passed [`ModeEngine::check`].
    fn advance(
        &self,
        turn: &Turn<'_>,
        rules: &EngineRules,
        rng: &mut impl Rng,
    ) -> Result<Advance<Self>, MatchError>;
}

/// Mode payload of a match, tagged by mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ModeState {
    /// Bomb-passing state.
    Elimination(EliminationState),
    /// Timed-scoring state.
    SubmissionBarrier(BarrierState),
    /// Quiz-battle state.
    BuzzRace(BuzzRaceState),
}

impl ModeState {
    /// Build the initial payload for `mode` from freshly generated content.
    pub fn setup(
        mode: MatchMode,
        content: ModeContent,
        rules: &EngineRules,
        rng: &mut impl Rng,
    ) -> Result<Self, MatchError> {
        match (mode, content) {
            (MatchMode::Elimination, ModeContent::Questions(questions)) => {
                EliminationState::new(questions, rules, rng).map(ModeState::Elimination)
            }
            (MatchMode::BuzzRace, ModeContent::Questions(questions)) => {
                BuzzRaceState::try_new(questions).map(ModeState::BuzzRace)
            }
            (MatchMode::SubmissionBarrier, ModeContent::Brief(brief)) => {
                Ok(ModeState::SubmissionBarrier(BarrierState::new(brief)))
            }
            (mode, _) => Err(MatchError::InvalidAction(format!(
                "generated content does not fit {mode:?} matches"
            ))),
        }
    }

    /// Mode this payload belongs to.
    pub fn mode(&self) -> MatchMode {
        match self {
            ModeState::Elimination(_) => MatchMode::Elimination,
            ModeState::SubmissionBarrier(_) => MatchMode::SubmissionBarrier,
            ModeState::BuzzRace(_) => MatchMode::BuzzRace,
        }
    }

    /// Barrier payload, if this is a submission-barrier match.
    pub fn barrier(&self) -> Option<&BarrierState> {
        match self {
            ModeState::SubmissionBarrier(state) => Some(state),
            _ => None,
        }
    }

    /// Dispatch [`ModeEngine::check`].
    pub fn check(&self, turn: &Turn<'_>) -> Result<(), MatchError> {
        match self {
            ModeState::Elimination(state) => state.check(turn),
            ModeState::SubmissionBarrier(state) => state.check(turn),
            ModeState::BuzzRace(state) => state.check(turn),
        }
    }

    /// Dispatch [`ModeEngine::advance`].
    pub fn advance(
        &self,
        turn: &Turn<'_>,
        rules: &EngineRules,
        rng: &mut impl Rng,
    ) -> Result<Advance<ModeState>, MatchError> {
        Ok(match self {
            ModeState::Elimination(state) => {
                state.advance(turn, rules, rng)?.map(ModeState::Elimination)
            }
            ModeState::SubmissionBarrier(state) => state
                .advance(turn, rules, rng)?
                .map(ModeState::SubmissionBarrier),
            ModeState::BuzzRace(state) => state.advance(turn, rules, rng)?.map(ModeState::BuzzRace),
        })
    }
}

/// Error for an action routed to the wrong engine; the validator normally
/// filters these out first.
fn foreign_action(action: &MatchAction, mode: MatchMode) -> MatchError {
    MatchError::InvalidAction(format!(
        "`{}` is not available in {mode:?} matches",
        action.name()
    ))
}
