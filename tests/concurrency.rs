mod common;

use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use common::{
    AlwaysConflictStore, BrokenNotifier, INITIATOR, OPPONENT, ScriptedGenerator, act, app,
    invite, started,
};
use versus_back::{
    config::AppConfig,
    error::ServiceError,
    services::match_service,
    state::{
        AppState,
        modes::ModeState,
        validator::MatchError,
        versus::{MatchAction, MatchMode, MatchStatus, Seat, Winner},
    },
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_buzzes_accept_exactly_one() {
    for _ in 0..20 {
        let state = app(Arc::new(ScriptedGenerator::default())).await;
        let game = started(&state, MatchMode::BuzzRace).await;

        let buzz = |actor: &'static str| {
            let state = state.clone();
            let code = game.code.clone();
            tokio::spawn(async move {
                match_service::perform_action(&state, &code, actor, MatchAction::Buzz).await
            })
        };
        let (first, second) = tokio::join!(buzz(INITIATOR), buzz(OPPONENT));
        let results = [first.unwrap(), second.unwrap()];

        let accepted = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(accepted, 1);
        for result in &results {
            if let Err(err) = result {
                assert!(
                    matches!(err, ServiceError::Match(MatchError::AlreadyBuzzed)),
                    "unexpected rejection {err:?}"
                );
            }
        }

        let (stored, _) = match_service::get_match(&state, &game.code, INITIATOR)
            .await
            .unwrap();
        match stored.mode_state {
            Some(ModeState::BuzzRace(race)) => assert!(race.buzzed_by.is_some()),
            other => panic!("unexpected mode state {other:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_submissions_complete_once() {
    for _ in 0..20 {
        let generator = Arc::new(ScriptedGenerator::with_scores(&[
            ("alpha", 55),
            ("bravo", 75),
        ]));
        let state = app(generator.clone()).await;
        let game = started(&state, MatchMode::SubmissionBarrier).await;

        let submit = |actor: &'static str, answer: &'static str| {
            let state = state.clone();
            let code = game.code.clone();
            tokio::spawn(async move {
                match_service::perform_action(
                    &state,
                    &code,
                    actor,
                    MatchAction::Submit {
                        answer: answer.into(),
                        time_remaining: 10,
                    },
                )
                .await
            })
        };
        let (first, second) = tokio::join!(submit(INITIATOR, "alpha"), submit(OPPONENT, "bravo"));
        let outcomes = [first.unwrap().unwrap(), second.unwrap().unwrap()];

        // Exactly one writer persisted the second submission and ran the scorer.
        assert_eq!(generator.score_calls(), 2);
        assert_eq!(
            outcomes
                .iter()
                .filter(|outcome| outcome.waiting_for_opponent)
                .count(),
            1
        );

        let (stored, _) = match_service::get_match(&state, &game.code, INITIATOR)
            .await
            .unwrap();
        assert_eq!(stored.status(), MatchStatus::Completed);
        assert_eq!(stored.winner(), Some(Winner::Seat(Seat::B)));
        assert_eq!((stored.scores.a, stored.scores.b), (55, 75));
        // invite(0) accept(1) start(2) submit(3) submit(4) completion(5)
        assert_eq!(stored.version, 5);
    }
}

async fn submit_as(
    state: &versus_back::state::SharedState,
    code: &versus_back::state::versus::MatchCode,
    actor: &str,
    answer: &str,
) -> Result<match_service::ActionOutcome, ServiceError> {
    match_service::perform_action(
        state,
        code,
        actor,
        MatchAction::Submit {
            answer: answer.into(),
            time_remaining: 10,
        },
    )
    .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn finalize_cannot_rescore_while_the_barrier_is_being_scored() {
    let generator = Arc::new(ScriptedGenerator::with_scores(&[
        ("alpha", 30),
        ("bravo", 90),
    ]));
    if let Ok(mut delay) = generator.score_delay.lock() {
        *delay = Some(Duration::from_millis(200));
    }
    let state = app(generator.clone()).await;
    let game = started(&state, MatchMode::SubmissionBarrier).await;

    submit_as(&state, &game.code, INITIATOR, "alpha").await.unwrap();
    let second = {
        let state = state.clone();
        let code = game.code.clone();
        tokio::spawn(async move { submit_as(&state, &code, OPPONENT, "bravo").await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let early =
        match_service::perform_action(&state, &game.code, INITIATOR, MatchAction::Finalize).await;
    assert!(
        matches!(early, Err(ServiceError::Match(MatchError::InvalidAction(_)))),
        "unexpected finalize result {early:?}"
    );

    let completed = second.await.unwrap().unwrap();
    assert_eq!(completed.game.status(), MatchStatus::Completed);
    assert_eq!(completed.game.winner(), Some(Winner::Seat(Seat::B)));
    assert_eq!(generator.score_calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_finalize_retries_score_once() {
    for _ in 0..10 {
        // "bravo" is unknown at first, so the opening round fails.
        let generator = Arc::new(ScriptedGenerator::with_scores(&[("alpha", 30)]));
        let state = app(generator.clone()).await;
        let game = started(&state, MatchMode::SubmissionBarrier).await;

        submit_as(&state, &game.code, INITIATOR, "alpha").await.unwrap();
        assert!(submit_as(&state, &game.code, OPPONENT, "bravo").await.is_err());
        assert_eq!(generator.score_calls(), 2);

        if let Ok(mut table) = generator.scores.lock() {
            table.insert("bravo".into(), 20);
        }
        let finalize = |actor: &'static str| {
            let state = state.clone();
            let code = game.code.clone();
            tokio::spawn(async move {
                match_service::perform_action(&state, &code, actor, MatchAction::Finalize).await
            })
        };
        let (first, second) = tokio::join!(finalize(INITIATOR), finalize(OPPONENT));
        let results = [first.unwrap(), second.unwrap()];

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        assert_eq!(generator.score_calls(), 4);

        let (stored, _) = match_service::get_match(&state, &game.code, INITIATOR)
            .await
            .unwrap();
        assert_eq!(stored.winner(), Some(Winner::Seat(Seat::A)));
    }
}

#[tokio::test]
async fn repeated_conflicts_surface_as_store_conflict() {
    let store = AlwaysConflictStore::default();
    let state = AppState::new(
        AppConfig::default(),
        Arc::new(ScriptedGenerator::default()),
    );
    state.set_match_store(Arc::new(store.clone())).await;
    let game = invite(&state, MatchMode::Elimination).await;

    let result =
        match_service::perform_action(&state, &game.code, OPPONENT, MatchAction::Accept).await;
    assert!(matches!(result, Err(ServiceError::StoreConflict)));
    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn notifier_failures_do_not_fail_the_action() {
    let notifier = Arc::new(BrokenNotifier::default());
    let state = AppState::with_notifier(
        AppConfig::default(),
        Arc::new(ScriptedGenerator::default()),
        notifier.clone(),
    );
    state
        .set_match_store(Arc::new(
            versus_back::dao::match_store::memory::MemoryMatchStore::new(),
        ))
        .await;

    let game = invite(&state, MatchMode::BuzzRace).await;
    let accepted = act(&state, &game.code, OPPONENT, MatchAction::Accept).await;

    assert_eq!(accepted.game.status(), MatchStatus::Active);
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 1);
}
