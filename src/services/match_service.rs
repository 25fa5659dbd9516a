//! Match coordinator.
//!
//! Every mutation follows the same path: load the record, validate the action,
//! compute the complete next record, then persist it with a conditional write
//! on the version that was read. Fan-out only happens after the write landed.

use std::{future::Future, time::Duration};

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        match_store::MatchStore,
        models::MatchEntity,
        storage::{StorageError, WriteOutcome},
    },
    dto::match_dto::CreateMatchRequest,
    error::ServiceError,
    services::{
        fanout_events,
        generator::{BriefRequest, GeneratorError, QuestionRequest, ScoreRequest},
    },
    state::{
        SharedState,
        content::{ModeContent, Question},
        modes::{ModeState, barrier::BarrierState},
        transitions,
        validator::{self, MatchError},
        versus::{
            Match, MatchAction, MatchCode, MatchSettings, MatchStatus, ParticipantId, Scores,
            Seat,
        },
    },
};

/// Load, validate, compute and write; a lost race is retried this many times in total.
const MAX_WRITE_ATTEMPTS: u32 = 2;
/// Fresh codes drawn before giving up on an invite.
const MAX_CODE_ATTEMPTS: u32 = 5;

/// Result of an accepted action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// Record as persisted by the action (or by the writer that completed it).
    pub game: Match,
    /// Seat of the acting participant.
    pub seat: Seat,
    /// The caller submitted and the opponent has not yet.
    pub waiting_for_opponent: bool,
}

/// Issue an invite from `initiator` and persist it as a pending match.
pub async fn create_match(
    state: &SharedState,
    initiator: &str,
    request: CreateMatchRequest,
) -> Result<Match, ServiceError> {
    if request.opponent_id == initiator {
        return Err(ServiceError::InvalidInput(
            "a participant cannot challenge themselves".into(),
        ));
    }

    let store = state.require_match_store().await?;
    let settings = MatchSettings {
        topic: request.topic.trim().to_owned(),
        difficulty: request.difficulty,
    };

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let game = Match::invite(
            MatchCode::generate(),
            request.mode,
            ParticipantId::from(initiator),
            request.opponent_id.clone(),
            settings.clone(),
        );

        match store.insert_match(MatchEntity::from(game.clone())).await {
            Ok(()) => {
                info!(
                    code = %game.code,
                    mode = ?game.mode,
                    initiator,
                    opponent = %request.opponent_id,
                    "match invite created"
                );
                return Ok(game);
            }
            Err(StorageError::Duplicate { code }) => {
                debug!(%code, attempt, "match code already taken; drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(attempts = MAX_CODE_ATTEMPTS, "could not allocate a free match code");
    Err(ServiceError::StoreConflict)
}

/// Load a match on behalf of one of its participants.
pub async fn get_match(
    state: &SharedState,
    code: &MatchCode,
    viewer: &str,
) -> Result<(Match, Seat), ServiceError> {
    let store = state.require_match_store().await?;
    let game = load(store.as_ref(), code).await?;
    let seat = game.seat_of(viewer).ok_or(MatchError::NotParticipant)?;
    Ok((game, seat))
}

/// Run `action` from `actor` against the match stored under `code`.
pub async fn perform_action(
    state: &SharedState,
    code: &MatchCode,
    actor: &str,
    action: MatchAction,
) -> Result<ActionOutcome, ServiceError> {
    match action {
        MatchAction::Start => start_match(state, code, actor).await,
        MatchAction::Submit { .. } => submit(state, code, actor, action).await,
        MatchAction::Finalize => finalize(state, code, actor).await,
        action => {
            let rules = state.config().rules.clone();
            let (game, seat) = commit_action(state, code, actor, &action, |current, seat| {
                Ok(transitions::apply(
                    current,
                    seat,
                    &action,
                    &rules,
                    &mut rand::rng(),
                )?)
            })
            .await?;
            Ok(ActionOutcome {
                game,
                seat,
                waiting_for_opponent: false,
            })
        }
    }
}

/// Fetch the content for the mode, then install the initial mode state.
///
/// A generator failure leaves the record untouched, so the initiator can retry.
async fn start_match(
    state: &SharedState,
    code: &MatchCode,
    actor: &str,
) -> Result<ActionOutcome, ServiceError> {
    let store = state.require_match_store().await?;
    let game = load(store.as_ref(), code).await?;
    validator::validate(&game, actor, &MatchAction::Start)?;

    let content = fetch_content(state, &game).await.inspect_err(|err| {
        warn!(code = %code, error = %err, "content generation failed; match stays unstarted");
    })?;
    let mode_state = ModeState::setup(
        game.mode,
        content,
        &state.config().rules,
        &mut rand::rng(),
    )
    .map_err(|err| GeneratorError::Malformed(err.to_string()))?;

    let (game, seat) = commit_action(state, code, actor, &MatchAction::Start, |current, _| {
        Ok(transitions::started(current, mode_state.clone()))
    })
    .await?;
    info!(code = %code, mode = ?game.mode, "match started");

    Ok(ActionOutcome {
        game,
        seat,
        waiting_for_opponent: false,
    })
}

async fn fetch_content(state: &SharedState, game: &Match) -> Result<ModeContent, GeneratorError> {
    let generator = state.generator();
    let topic = game.settings.topic.clone();
    let difficulty = game.settings.difficulty;

    let call = async {
        match state.config().rules.question_count(game.mode) {
            Some(count) => generator
                .questions(QuestionRequest {
                    topic,
                    difficulty,
                    count,
                })
                .await
                .and_then(|questions| exact_count(questions, count))
                .map(ModeContent::Questions),
            None => generator
                .brief(BriefRequest { topic, difficulty })
                .await
                .map(ModeContent::Brief),
        }
    };

    bounded(state.config().generator.timeout, call).await
}

/// Question sets are fixed-size; anything else is a generator fault.
fn exact_count(questions: Vec<Question>, count: usize) -> Result<Vec<Question>, GeneratorError> {
    if questions.len() == count {
        Ok(questions)
    } else {
        Err(GeneratorError::Malformed(format!(
            "expected {count} questions, got {}",
            questions.len()
        )))
    }
}

/// Persist the submission; the writer that observes both submissions scores them.
async fn submit(
    state: &SharedState,
    code: &MatchCode,
    actor: &str,
    action: MatchAction,
) -> Result<ActionOutcome, ServiceError> {
    let rules = state.config().rules.clone();
    let (game, seat) = commit_action(state, code, actor, &action, |current, seat| {
        Ok(transitions::apply(
            current,
            seat,
            &action,
            &rules,
            &mut rand::rng(),
        )?)
    })
    .await?;

    let barrier_reached = game
        .mode_state
        .as_ref()
        .and_then(ModeState::barrier)
        .is_some_and(BarrierState::both_submitted);

    if !barrier_reached {
        debug!(code = %code, "submission stored; waiting for the opponent");
        return Ok(ActionOutcome {
            game,
            seat,
            waiting_for_opponent: true,
        });
    }

    let game = resolve_barrier(state, code, actor, &game).await?;
    Ok(ActionOutcome {
        game,
        seat,
        waiting_for_opponent: false,
    })
}

/// Retry scoring after a failed round.
///
/// The claim is a conditional write, so of two concurrent `finalize` calls
/// only one reaches the scorer.
async fn finalize(
    state: &SharedState,
    code: &MatchCode,
    actor: &str,
) -> Result<ActionOutcome, ServiceError> {
    let rules = state.config().rules.clone();
    let (claimed, seat) =
        commit_action(state, code, actor, &MatchAction::Finalize, |current, seat| {
            Ok(transitions::apply(
                current,
                seat,
                &MatchAction::Finalize,
                &rules,
                &mut rand::rng(),
            )?)
        })
        .await?;
    info!(code = %code, participant = actor, "scoring retry claimed");

    let game = resolve_barrier(state, code, actor, &claimed).await?;
    Ok(ActionOutcome {
        game,
        seat,
        waiting_for_opponent: false,
    })
}

/// Score both submissions of `snapshot` and persist the completed match.
///
/// Only a still-active record can be completed; when another writer got there
/// first, the record it wrote is returned instead.
async fn resolve_barrier(
    state: &SharedState,
    code: &MatchCode,
    actor: &str,
    snapshot: &Match,
) -> Result<Match, ServiceError> {
    let barrier = snapshot
        .mode_state
        .as_ref()
        .and_then(ModeState::barrier)
        .ok_or_else(|| MatchError::InvalidAction("match has no submissions to score".into()))?;

    let scores = match score_submissions(state, barrier).await {
        Ok(scores) => scores,
        Err(err) => {
            warn!(
                code = %code,
                error = %err,
                "scoring failed; submissions are kept and `finalize` can retry"
            );
            mark_scoring_failed(state, code, actor).await;
            return Err(err.into());
        }
    };

    let completion = commit(
        state,
        code,
        "score",
        |current| validator::validate_scoring(current, actor),
        |current, _| {
            let barrier = current
                .mode_state
                .as_ref()
                .and_then(ModeState::barrier)
                .ok_or_else(|| {
                    MatchError::InvalidAction("match has no submissions to score".into())
                })?;
            Ok(transitions::scored(current, barrier.scored(scores.clone())))
        },
    )
    .await;

    match completion {
        Ok((game, _)) => Ok(game),
        Err(ServiceError::Match(MatchError::MatchAlreadyOver)) => {
            debug!(code = %code, "barrier already resolved by the other writer");
            let store = state.require_match_store().await?;
            load(store.as_ref(), code).await
        }
        Err(err) => Err(err),
    }
}

/// Persist that the current scoring round failed, which unlocks `finalize`.
async fn mark_scoring_failed(state: &SharedState, code: &MatchCode, actor: &str) {
    let marked = commit(
        state,
        code,
        "scoring_failed",
        |current| validator::validate_scoring(current, actor),
        |current, _| {
            let mut next = current.clone();
            if let Some(ModeState::SubmissionBarrier(barrier)) = next.mode_state.as_mut() {
                *barrier = barrier.with_failed_scoring();
            }
            Ok(next)
        },
    )
    .await;

    if let Err(err) = marked {
        warn!(code = %code, error = %err, "could not record the failed scoring round");
    }
}

/// Call the scorer for both submissions concurrently; both must succeed.
async fn score_submissions(
    state: &SharedState,
    barrier: &BarrierState,
) -> Result<Scores, GeneratorError> {
    let generator = state.generator();
    let limit = state.config().generator.timeout;
    let request = |seat: Seat| {
        barrier
            .submissions
            .get(seat)
            .as_ref()
            .map(|submission| ScoreRequest {
                brief: barrier.brief.clone(),
                answer: submission.answer.clone(),
                time_remaining: submission.time_remaining,
            })
            .ok_or_else(|| GeneratorError::Malformed(format!("seat {seat:?} has not submitted")))
    };
    let (request_a, request_b) = (request(Seat::A)?, request(Seat::B)?);

    let (score_a, score_b) = futures::join!(
        bounded(limit, generator.score(request_a)),
        bounded(limit, generator.score(request_b)),
    );
    Ok(Scores::new(score_a?, score_b?))
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, GeneratorError>>,
) -> Result<T, GeneratorError> {
    timeout(limit, call)
        .await
        .map_err(|_| GeneratorError::Timeout(limit))?
}

/// [`commit`] guarded by the regular action validator.
async fn commit_action<F>(
    state: &SharedState,
    code: &MatchCode,
    actor: &str,
    action: &MatchAction,
    compute: F,
) -> Result<(Match, Seat), ServiceError>
where
    F: FnMut(&Match, Seat) -> Result<Match, ServiceError>,
{
    commit(
        state,
        code,
        action.name(),
        |current| validator::validate(current, actor, action),
        compute,
    )
    .await
}

/// Optimistic read-modify-write of the record under `code`.
///
/// `guard` decides on the freshly loaded record whether the write is still
/// legal and yields the actor's seat; `compute` returns the complete next
/// record. A lost race re-reads and re-runs both.
async fn commit<G, F>(
    state: &SharedState,
    code: &MatchCode,
    label: &'static str,
    mut guard: G,
    mut compute: F,
) -> Result<(Match, Seat), ServiceError>
where
    G: FnMut(&Match) -> Result<Seat, MatchError>,
    F: FnMut(&Match, Seat) -> Result<Match, ServiceError>,
{
    let store = state.require_match_store().await?;

    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let current = load(store.as_ref(), code).await?;
        let seat = guard(&current)?;

        let mut next = compute(&current, seat)?;
        next.version = current.version + 1;

        match store
            .replace_match(MatchEntity::from(next.clone()), current.version)
            .await?
        {
            WriteOutcome::Written => {
                if next.status() == MatchStatus::Completed {
                    info!(
                        code = %code,
                        action = label,
                        winner = ?next.winner(),
                        "match completed"
                    );
                } else {
                    debug!(
                        code = %code,
                        action = label,
                        version = next.version,
                        "match updated"
                    );
                }
                fanout_events::broadcast_match_state(state, &next);
                return Ok((next, seat));
            }
            WriteOutcome::Conflict => {
                debug!(
                    code = %code,
                    action = label,
                    attempt,
                    "conditional write lost the race; re-reading"
                );
            }
        }
    }

    Err(ServiceError::StoreConflict)
}

async fn load(store: &dyn MatchStore, code: &MatchCode) -> Result<Match, ServiceError> {
    let entity = store
        .find_match(code.to_string())
        .await?
        .ok_or_else(|| ServiceError::NotFound(code.to_string()))?;
    Ok(Match::try_from(entity)?)
}
