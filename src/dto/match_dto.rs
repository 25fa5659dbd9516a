//! Request and response bodies of the match endpoints, plus the public
//! projection pushed to fan-out subscribers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{
        format_system_time,
        validation::{validate_participant_id, validate_topic},
    },
    state::{
        content::{Brief, Question},
        modes::{
            ModeState, barrier::BarrierState, buzz_race::BuzzRaceState,
            elimination::EliminationState,
        },
        versus::{
            Difficulty, FinishReason, Match, MatchAction, MatchMode, MatchStatus, Seat, Winner,
        },
    },
};

/// Payload issuing an invite to `opponentId`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    /// Invited participant.
    #[validate(custom(function = "validate_participant_id"))]
    pub opponent_id: String,
    /// Rule set of the new match.
    pub mode: MatchMode,
    /// Certification or service area, e.g. `SAA-C03`.
    #[validate(length(max = 64), custom(function = "validate_topic"))]
    pub topic: String,
    /// Requested difficulty, `medium` when omitted.
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// Action body accepted by `POST /match/{code}/action` and over the WebSocket.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    Accept,
    Decline,
    Cancel,
    Start,
    Pass {
        #[serde(rename = "targetId")]
        target_id: String,
    },
    Wrong,
    Explode,
    Submit {
        answer: String,
        #[serde(rename = "timeRemaining")]
        time_remaining: u32,
    },
    Finalize,
    Buzz,
    Answer {
        #[serde(rename = "choiceIndex")]
        choice_index: usize,
    },
}

impl From<ActionRequest> for MatchAction {
    fn from(request: ActionRequest) -> Self {
        match request {
            ActionRequest::Accept => MatchAction::Accept,
            ActionRequest::Decline => MatchAction::Decline,
            ActionRequest::Cancel => MatchAction::Cancel,
            ActionRequest::Start => MatchAction::Start,
            ActionRequest::Pass { target_id } => MatchAction::Pass { target: target_id },
            ActionRequest::Wrong => MatchAction::Wrong,
            ActionRequest::Explode => MatchAction::Explode,
            ActionRequest::Submit {
                answer,
                time_remaining,
            } => MatchAction::Submit {
                answer,
                time_remaining,
            },
            ActionRequest::Finalize => MatchAction::Finalize,
            ActionRequest::Buzz => MatchAction::Buzz,
            ActionRequest::Answer { choice_index } => MatchAction::Answer { choice_index },
        }
    }
}

/// Winner of a completed match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WinnerView {
    /// Winning participant, absent on a draw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    /// Nobody won.
    pub draw: bool,
}

impl WinnerView {
    fn new(game: &Match, winner: Winner) -> Self {
        match winner {
            Winner::Seat(seat) => Self {
                participant_id: Some(game.participant(seat).to_owned()),
                draw: false,
            },
            Winner::Draw => Self {
                participant_id: None,
                draw: true,
            },
        }
    }
}

/// Public projection of a match.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub code: String,
    pub mode: MatchMode,
    pub status: MatchStatus,
    pub participant_a: String,
    pub participant_b: String,
    pub score_a: u32,
    pub score_b: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<WinnerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    pub topic: String,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode_state: Option<ModeStateView>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub version: u64,
}

impl MatchView {
    /// Projection for `viewer`; `None` produces the broadcast view, which shows
    /// no submitted answer until the match completes.
    pub fn project(game: &Match, viewer: Option<Seat>) -> Self {
        let outcome = game.outcome();
        Self {
            code: game.code.to_string(),
            mode: game.mode,
            status: game.status(),
            participant_a: game.participants.a.clone(),
            participant_b: game.participants.b.clone(),
            score_a: game.scores.a,
            score_b: game.scores.b,
            winner: outcome.map(|outcome| WinnerView::new(game, outcome.winner)),
            finish_reason: outcome.map(|outcome| outcome.reason),
            topic: game.settings.topic.clone(),
            difficulty: game.settings.difficulty,
            mode_state: game
                .mode_state
                .as_ref()
                .map(|state| ModeStateView::project(game, state, viewer)),
            created_at: format_system_time(game.created_at),
            completed_at: outcome.map(|outcome| format_system_time(outcome.completed_at)),
            version: game.version,
        }
    }
}

/// Mode payload as exposed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ModeStateView {
    Elimination {
        players: Vec<BombPlayerView>,
        #[serde(rename = "holderId")]
        holder_id: String,
        #[serde(rename = "questionIndex")]
        question_index: usize,
        #[serde(rename = "remainingFuseSeconds")]
        remaining_fuse_seconds: u32,
        /// The holder grades themselves, so answers are included.
        questions: Vec<Question>,
    },
    SubmissionBarrier {
        brief: Brief,
        submissions: Vec<SubmissionView>,
        /// The last scoring round failed; `finalize` retries it.
        #[serde(rename = "scoringFailed")]
        scoring_failed: bool,
    },
    BuzzRace {
        #[serde(rename = "questionIndex")]
        question_index: usize,
        #[serde(rename = "questionCount")]
        question_count: usize,
        #[serde(rename = "buzzedBy", skip_serializing_if = "Option::is_none")]
        buzzed_by: Option<String>,
        #[serde(rename = "currentQuestion", skip_serializing_if = "Option::is_none")]
        current_question: Option<QuestionView>,
    },
}

impl ModeStateView {
    fn project(game: &Match, state: &ModeState, viewer: Option<Seat>) -> Self {
        match state {
            ModeState::Elimination(state) => Self::elimination(game, state),
            ModeState::SubmissionBarrier(state) => Self::barrier(game, state, viewer),
            ModeState::BuzzRace(state) => Self::buzz_race(game, state),
        }
    }

    fn elimination(game: &Match, state: &EliminationState) -> Self {
        ModeStateView::Elimination {
            players: state
                .players
                .iter()
                .map(|player| BombPlayerView {
                    participant_id: game.participant(player.seat).to_owned(),
                    alive: player.alive,
                    correct_count: player.correct_count,
                    answered_count: player.answered_count,
                })
                .collect(),
            holder_id: game.participant(state.holder).to_owned(),
            question_index: state.question_index,
            remaining_fuse_seconds: state.remaining_fuse_seconds,
            questions: state.questions.clone(),
        }
    }

    fn barrier(game: &Match, state: &BarrierState, viewer: Option<Seat>) -> Self {
        let reveal_all = game.status() == MatchStatus::Completed;
        let submissions = Seat::BOTH
            .into_iter()
            .map(|seat| {
                let submission = state.submissions.get(seat).as_ref();
                let visible = reveal_all || viewer == Some(seat);
                SubmissionView {
                    participant_id: game.participant(seat).to_owned(),
                    submitted: submission.is_some(),
                    submitted_at: submission.map(|s| format_system_time(s.submitted_at)),
                    time_remaining: submission.map(|s| s.time_remaining),
                    answer: submission
                        .filter(|_| visible)
                        .map(|s| s.answer.clone()),
                    score: submission.and_then(|s| s.score),
                }
            })
            .collect();

        ModeStateView::SubmissionBarrier {
            brief: state.brief.clone(),
            submissions,
            scoring_failed: state.scoring_failed,
        }
    }

    fn buzz_race(game: &Match, state: &BuzzRaceState) -> Self {
        ModeStateView::BuzzRace {
            question_index: state.question_index,
            question_count: state.questions.len(),
            buzzed_by: state
                .buzzed_by
                .map(|seat| game.participant(seat).to_owned()),
            current_question: state.current_question().map(QuestionView::from),
        }
    }
}

/// Elimination counters of one participant.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BombPlayerView {
    pub participant_id: String,
    pub alive: bool,
    pub correct_count: u32,
    pub answered_count: u32,
}

/// Submission status of one participant.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub participant_id: String,
    pub submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u32>,
    /// Only shown to its author until the match completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// Buzz-race question without its answer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionView {
    pub prompt: String,
    pub choices: Vec<String>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            prompt: question.prompt.clone(),
            choices: question.choices.clone(),
        }
    }
}

/// Result of an accepted action.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub state: MatchView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_over: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<WinnerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_for_opponent: Option<bool>,
}

impl ActionResponse {
    /// Build the response for `viewer` after an action.
    pub fn new(game: &Match, viewer: Seat, waiting_for_opponent: bool) -> Self {
        let state = MatchView::project(game, Some(viewer));
        let game_over = state.status == MatchStatus::Completed;
        Self {
            winner: if game_over { state.winner.clone() } else { None },
            game_over: game_over.then_some(true),
            waiting_for_opponent: (waiting_for_opponent && !game_over).then_some(true),
            state,
        }
    }
}
