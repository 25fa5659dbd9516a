//! Bomb-passing elimination engine.
//!
//! The holder answers the current question: a correct answer passes the bomb,
//! a wrong answer keeps it for the next question, and a burnt fuse eliminates
//! the holder with a one point penalty.

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::state::{
    content::Question,
    modes::{Advance, EngineRules, ModeEngine, Turn, foreign_action},
    validator::MatchError,
    versus::{FinishReason, MatchAction, MatchMode, Scores, Seat, Winner},
};

/// Per-player elimination counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BombPlayer {
    /// Seat of the player.
    pub seat: Seat,
    /// Still in the game.
    pub alive: bool,
    /// Correct answers, minus explosion penalties.
    pub correct_count: u32,
    /// Questions answered either way.
    pub answered_count: u32,
}

impl BombPlayer {
    fn new(seat: Seat) -> Self {
        Self {
            seat,
            alive: true,
            correct_count: 0,
            answered_count: 0,
        }
    }
}

/// Elimination payload. `holder` is always an alive player while the match runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationState {
    /// Players in seat order.
    pub players: Vec<BombPlayer>,
    /// Player currently holding the bomb.
    pub holder: Seat,
    /// Index of the question the holder is answering.
    pub question_index: usize,
    /// Fuse length granted to the holder.
    pub remaining_fuse_seconds: u32,
    /// Question set fetched at `start`.
    pub questions: Vec<Question>,
}

impl EliminationState {
    /// Seat every participant alive and hand the bomb to a random one.
    pub fn new(
        questions: Vec<Question>,
        rules: &EngineRules,
        rng: &mut impl Rng,
    ) -> Result<Self, MatchError> {
        if questions.is_empty() || !questions.iter().all(Question::is_playable) {
            return Err(MatchError::InvalidAction(
                "elimination needs a non-empty set of playable questions".into(),
            ));
        }

        let holder = Seat::BOTH.choose(rng).copied().unwrap_or(Seat::A);
        Ok(Self {
            players: Seat::BOTH.into_iter().map(BombPlayer::new).collect(),
            holder,
            question_index: 0,
            remaining_fuse_seconds: rules.fuse_seconds,
            questions,
        })
    }

    /// Question the holder is answering, `None` once the set is exhausted.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.question_index)
    }

    /// Counters for `seat`.
    pub fn player(&self, seat: Seat) -> Option<&BombPlayer> {
        self.players.iter().find(|player| player.seat == seat)
    }

    fn player_mut(&mut self, seat: Seat) -> Option<&mut BombPlayer> {
        self.players.iter_mut().find(|player| player.seat == seat)
    }

    /// Seats still in the game.
    pub fn alive_seats(&self) -> Vec<Seat> {
        self.players
            .iter()
            .filter(|player| player.alive)
            .map(|player| player.seat)
            .collect()
    }

    fn is_alive(&self, seat: Seat) -> bool {
        self.player(seat).is_some_and(|player| player.alive)
    }

    /// Match scores mirror the correct counts.
    pub fn scores(&self) -> Scores {
        let correct = |seat| self.player(seat).map_or(0, |player| player.correct_count);
        Scores::new(correct(Seat::A), correct(Seat::B))
    }

    fn exhausted_finish(&self) -> Option<(Winner, FinishReason)> {
        (self.question_index >= self.questions.len())
            .then(|| (Winner::by_score(&self.scores()), FinishReason::QuestionsExhausted))
    }

    fn require_holder(&self, actor: Seat) -> Result<(), MatchError> {
        if actor == self.holder {
            Ok(())
        } else {
            Err(MatchError::NotYourTurn)
        }
    }

    fn resolve_target(&self, turn: &Turn<'_>, target: &str) -> Result<Seat, MatchError> {
        let seat = Seat::BOTH
            .into_iter()
            .find(|seat| turn.participants.get(*seat) == target)
            .ok_or_else(|| MatchError::InvalidAction(format!("`{target}` is not in this match")))?;

        if seat == turn.actor {
            return Err(MatchError::InvalidAction(
                "cannot pass the bomb to yourself".into(),
            ));
        }
        if !self.is_alive(seat) {
            return Err(MatchError::InvalidAction(format!(
                "`{target}` has already been eliminated"
            )));
        }
        Ok(seat)
    }
}

impl ModeEngine for EliminationState {
    fn check(&self, turn: &Turn<'_>) -> Result<(), MatchError> {
        match turn.action {
            MatchAction::Pass { target } => {
                self.require_holder(turn.actor)?;
                if self.alive_seats().len() < 2 {
                    return Err(MatchError::InvalidAction(
                        "nobody is left to receive the bomb".into(),
                    ));
                }
                self.resolve_target(turn, target).map(|_| ())
            }
            MatchAction::Wrong | MatchAction::Explode => self.require_holder(turn.actor),
            other => Err(foreign_action(other, MatchMode::Elimination)),
        }
    }

    fn advance(
        &self,
        turn: &Turn<'_>,
        rules: &EngineRules,
        rng: &mut impl Rng,
    ) -> Result<Advance<Self>, MatchError> {
        let mut next = self.clone();
        let holder = self.holder;

        let finish = match turn.action {
            MatchAction::Pass { target } => {
                let target = self.resolve_target(turn, target)?;
                if let Some(player) = next.player_mut(holder) {
                    player.correct_count += 1;
                    player.answered_count += 1;
                }
                next.question_index += 1;
                next.holder = target;
                next.remaining_fuse_seconds = rules.fuse_seconds;
                next.exhausted_finish()
            }
            MatchAction::Wrong => {
                if let Some(player) = next.player_mut(holder) {
                    player.answered_count += 1;
                }
                next.question_index += 1;
                next.exhausted_finish()
            }
            MatchAction::Explode => {
                if let Some(player) = next.player_mut(holder) {
                    player.alive = false;
                    player.correct_count = player.correct_count.saturating_sub(1);
                }

                let survivors = next.alive_seats();
                if survivors.len() <= 1 {
                    let winner = survivors.first().copied().map_or(Winner::Draw, Winner::Seat);
                    if let Some(survivor) = survivors.first() {
                        next.holder = *survivor;
                    }
                    Some((winner, FinishReason::LastSurvivor))
                } else {
                    next.holder = survivors.choose(rng).copied().unwrap_or(holder);
                    next.remaining_fuse_seconds = rules.short_fuse_seconds;
                    None
                }
            }
            other => return Err(foreign_action(other, MatchMode::Elimination)),
        };

        Ok(Advance {
            scores: next.scores(),
            state: next,
            finish,
        })
    }
}
