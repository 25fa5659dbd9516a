//! Buzz-race engine: the first buzz claims the question, the claimant answers.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::{
    content::Question,
    modes::{Advance, EngineRules, ModeEngine, Turn, WrongAnswerRule, foreign_action},
    validator::MatchError,
    versus::{FinishReason, MatchAction, MatchMode, Seat, Winner},
};

/// Buzz-race payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuzzRaceState {
    /// Question set fetched at `start`.
    pub questions: Vec<Question>,
    /// Index of the question in play.
    pub question_index: usize,
    /// Seat holding answer rights on the current question.
    pub buzzed_by: Option<Seat>,
}

impl BuzzRaceState {
    /// Fresh race over `questions`.
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            question_index: 0,
            buzzed_by: None,
        }
    }

    /// Like [`BuzzRaceState::new`] but refuses unplayable question sets.
    pub fn try_new(questions: Vec<Question>) -> Result<Self, MatchError> {
        if questions.is_empty() || !questions.iter().all(Question::is_playable) {
            return Err(MatchError::InvalidAction(
                "buzz race needs a non-empty set of playable questions".into(),
            ));
        }
        Ok(Self::new(questions))
    }

    /// Question in play, `None` once exhausted.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.question_index)
    }
}

impl ModeEngine for BuzzRaceState {
    fn check(&self, turn: &Turn<'_>) -> Result<(), MatchError> {
        match turn.action {
            MatchAction::Buzz => match self.buzzed_by {
                Some(_) => Err(MatchError::AlreadyBuzzed),
                None => Ok(()),
            },
            MatchAction::Answer { choice_index } => {
                if self.buzzed_by != Some(turn.actor) {
                    return Err(MatchError::NotYourTurn);
                }
                let question = self.current_question().ok_or_else(|| {
                    MatchError::InvalidAction("no question left to answer".into())
                })?;
                if *choice_index >= question.choices.len() {
                    return Err(MatchError::InvalidAction(format!(
                        "choice {choice_index} is out of range (question has {} choices)",
                        question.choices.len()
                    )));
                }
                Ok(())
            }
            other => Err(foreign_action(other, MatchMode::BuzzRace)),
        }
    }

    fn advance(
        &self,
        turn: &Turn<'_>,
        rules: &EngineRules,
        _rng: &mut impl Rng,
    ) -> Result<Advance<Self>, MatchError> {
        let mut next = self.clone();
        let mut scores = turn.scores.clone();

        match turn.action {
            MatchAction::Buzz => {
                next.buzzed_by = Some(turn.actor);
            }
            MatchAction::Answer { choice_index } => {
                let correct = self
                    .current_question()
                    .is_some_and(|question| question.answer_index == *choice_index);

                if correct {
                    *scores.get_mut(turn.actor) += rules.buzz_points;
                    next.question_index += 1;
                } else {
                    next.buzzed_by = None;
                    if rules.wrong_answer_rule == WrongAnswerRule::Forfeit {
                        next.question_index += 1;
                    }
                }
            }
            other => return Err(foreign_action(other, MatchMode::BuzzRace)),
        }

        let finish = if next.question_index >= next.questions.len() {
            next.buzzed_by = None;
            Some((Winner::by_score(&scores), FinishReason::QuestionsExhausted))
        } else {
            None
        };

        Ok(Advance {
            state: next,
            scores,
            finish,
        })
    }
}
