//! Match records shared by the validator, the mode engines and the coordinator.

use std::{fmt, time::SystemTime};

use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::modes::ModeState;

/// Opaque identity of a competitor, as supplied by the authentication layer.
pub type ParticipantId = String;

/// Characters used for shareable codes (no `0/O`, `1/I/L` look-alikes).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
/// Number of characters in a match code.
pub const MATCH_CODE_LENGTH: usize = 6;

/// Human-shareable identifier of a match and primary key of the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchCode(String);

impl MatchCode {
    /// Draw a fresh random code.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..MATCH_CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Normalise user input into a code, rejecting anything outside the alphabet.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        let valid = code.len() == MATCH_CODE_LENGTH
            && code.bytes().all(|byte| CODE_ALPHABET.contains(&byte));
        valid.then_some(Self(code))
    }

    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rule set governing actions, scoring and termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Turn-passing bomb game.
    Elimination,
    /// Both players answer a shared brief; scored once both have submitted.
    SubmissionBarrier,
    /// First to buzz answers the current question.
    BuzzRace,
}

/// Coarse lifecycle stage exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Invite issued, waiting for the opponent.
    Pending,
    /// Both players are in.
    Active,
    /// A winner decision has been recorded.
    Completed,
}

/// Position of a participant inside a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    /// The initiator.
    A,
    /// The invited opponent.
    B,
}

impl Seat {
    /// Both seats in display order.
    pub const BOTH: [Seat; 2] = [Seat::A, Seat::B];

    /// The other seat.
    pub fn opponent(self) -> Seat {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }
}

/// A value held once per seat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sides<T> {
    /// Value for the initiator.
    pub a: T,
    /// Value for the opponent.
    pub b: T,
}

impl<T> Sides<T> {
    /// Build from both values.
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    /// Value for `seat`.
    pub fn get(&self, seat: Seat) -> &T {
        match seat {
            Seat::A => &self.a,
            Seat::B => &self.b,
        }
    }

    /// Mutable value for `seat`.
    pub fn get_mut(&mut self, seat: Seat) -> &mut T {
        match seat {
            Seat::A => &mut self.a,
            Seat::B => &mut self.b,
        }
    }
}

/// Per-seat score totals.
pub type Scores = Sides<u32>;

/// Final decision of a completed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    /// The participant in this seat won.
    Seat(Seat),
    /// Nobody won.
    Draw,
}

impl Winner {
    /// Higher score wins, equal scores draw.
    pub fn by_score(scores: &Scores) -> Self {
        match scores.a.cmp(&scores.b) {
            std::cmp::Ordering::Greater => Winner::Seat(Seat::A),
            std::cmp::Ordering::Less => Winner::Seat(Seat::B),
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }
}

/// Termination rule that completed the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The question list ran out.
    QuestionsExhausted,
    /// Elimination left at most one player alive.
    LastSurvivor,
    /// Both submissions were scored.
    SubmissionsScored,
    /// The opponent turned the invite down.
    Declined,
    /// The invite was withdrawn before it was accepted.
    Cancelled,
}

/// Recorded once, when the match completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Who won.
    pub winner: Winner,
    /// Why the match ended.
    pub reason: FinishReason,
    /// When the completing write was computed.
    pub completed_at: SystemTime,
}

/// Lifecycle stage; the completed stage carries the outcome so a winner cannot
/// exist without completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// Invite issued.
    Pending,
    /// Invite accepted.
    Active,
    /// Terminal.
    Completed(Outcome),
}

/// Difficulty forwarded to the content generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Associate-level warm-up.
    Easy,
    /// Default.
    #[default]
    Medium,
    /// Professional-level.
    Hard,
}

/// Generator parameters fixed when the invite is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSettings {
    /// Certification or service area the content is generated for.
    pub topic: String,
    /// Requested difficulty.
    pub difficulty: Difficulty,
}

/// Actions a participant can request against a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchAction {
    /// Opponent joins a pending match.
    Accept,
    /// Opponent refuses a pending match.
    Decline,
    /// Withdraw a pending match.
    Cancel,
    /// Initiator fetches content and begins play.
    Start,
    /// Elimination: answered correctly, hand the bomb to `target`.
    Pass {
        /// Participant receiving the bomb.
        target: ParticipantId,
    },
    /// Elimination: answered incorrectly, keep the bomb.
    Wrong,
    /// Elimination: the fuse ran out on the holder.
    Explode,
    /// Submission barrier: hand in an answer to the brief.
    Submit {
        /// Free-form answer.
        answer: String,
        /// Seconds left on the client timer when submitting.
        time_remaining: u32,
    },
    /// Submission barrier: re-run scoring after both sides submitted.
    Finalize,
    /// Buzz race: claim the current question.
    Buzz,
    /// Buzz race: answer the claimed question.
    Answer {
        /// Index into the current question's choices.
        choice_index: usize,
    },
}

impl MatchAction {
    /// Wire name of the action.
    pub fn name(&self) -> &'static str {
        match self {
            MatchAction::Accept => "accept",
            MatchAction::Decline => "decline",
            MatchAction::Cancel => "cancel",
            MatchAction::Start => "start",
            MatchAction::Pass { .. } => "pass",
            MatchAction::Wrong => "wrong",
            MatchAction::Explode => "explode",
            MatchAction::Submit { .. } => "submit",
            MatchAction::Finalize => "finalize",
            MatchAction::Buzz => "buzz",
            MatchAction::Answer { .. } => "answer",
        }
    }

    /// Whether the action manages the invite rather than gameplay.
    pub fn is_invite_response(&self) -> bool {
        matches!(
            self,
            MatchAction::Accept | MatchAction::Decline | MatchAction::Cancel
        )
    }

    /// Mode the gameplay action belongs to, `None` for lifecycle actions.
    pub fn mode(&self) -> Option<MatchMode> {
        match self {
            MatchAction::Pass { .. } | MatchAction::Wrong | MatchAction::Explode => {
                Some(MatchMode::Elimination)
            }
            MatchAction::Submit { .. } | MatchAction::Finalize => {
                Some(MatchMode::SubmissionBarrier)
            }
            MatchAction::Buzz | MatchAction::Answer { .. } => Some(MatchMode::BuzzRace),
            MatchAction::Accept | MatchAction::Decline | MatchAction::Cancel | MatchAction::Start => {
                None
            }
        }
    }
}

/// One two-participant competitive session.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Primary key.
    pub code: MatchCode,
    /// Immutable rule set.
    pub mode: MatchMode,
    /// Initiator and opponent identities.
    pub participants: Sides<ParticipantId>,
    /// Lifecycle stage.
    pub lifecycle: Lifecycle,
    /// Running totals, mutated only by mode engines.
    pub scores: Scores,
    /// Mode payload, populated by a successful `start`.
    pub mode_state: Option<ModeState>,
    /// Generator parameters.
    pub settings: MatchSettings,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Write counter checked by the store's conditional write.
    pub version: u64,
}

impl Match {
    /// Build a pending match where `initiator` challenges `opponent`.
    pub fn invite(
        code: MatchCode,
        mode: MatchMode,
        initiator: ParticipantId,
        opponent: ParticipantId,
        settings: MatchSettings,
    ) -> Self {
        Self {
            code,
            mode,
            participants: Sides::new(initiator, opponent),
            lifecycle: Lifecycle::Pending,
            scores: Scores::default(),
            mode_state: None,
            settings,
            created_at: SystemTime::now(),
            version: 0,
        }
    }

    /// Coarse status.
    pub fn status(&self) -> MatchStatus {
        match self.lifecycle {
            Lifecycle::Pending => MatchStatus::Pending,
            Lifecycle::Active => MatchStatus::Active,
            Lifecycle::Completed(_) => MatchStatus::Completed,
        }
    }

    /// Outcome, once completed.
    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.lifecycle {
            Lifecycle::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Winner decision, once completed.
    pub fn winner(&self) -> Option<Winner> {
        self.outcome().map(|outcome| outcome.winner)
    }

    /// Seat held by `participant`, if any.
    pub fn seat_of(&self, participant: &str) -> Option<Seat> {
        Seat::BOTH
            .into_iter()
            .find(|seat| self.participants.get(*seat) == participant)
    }

    /// Identity seated at `seat`.
    pub fn participant(&self, seat: Seat) -> &str {
        self.participants.get(seat)
    }

    /// Move to the terminal stage.
    pub fn complete(&mut self, winner: Winner, reason: FinishReason) {
        self.lifecycle = Lifecycle::Completed(Outcome {
            winner,
            reason,
            completed_at: SystemTime::now(),
        });
    }
}
