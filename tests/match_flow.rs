mod common;

use std::{sync::Arc, time::Duration};

use common::{INITIATOR, OPPONENT, ScriptedGenerator, act, app, app_with_config, invite, started};
use versus_back::{
    config::AppConfig,
    dto::sse::MATCH_STATE_EVENT,
    error::ServiceError,
    services::{generator::GeneratorError, match_service},
    state::{
        AppState,
        modes::ModeState,
        validator::MatchError,
        versus::{FinishReason, MatchAction, MatchMode, MatchStatus, Seat, Winner},
    },
};

#[tokio::test]
async fn five_question_elimination_ends_after_five_passes() {
    let state = app(Arc::new(ScriptedGenerator::default())).await;
    let game = started(&state, MatchMode::Elimination).await;

    let first_holder = match &game.mode_state {
        Some(ModeState::Elimination(bomb)) => bomb.holder,
        other => panic!("unexpected mode state {other:?}"),
    };

    let mut holder = first_holder;
    let mut last = None;
    for _ in 0..5 {
        let actor = game.participant(holder).to_owned();
        let target = game.participant(holder.opponent()).to_owned();
        last = Some(act(&state, &game.code, &actor, MatchAction::Pass { target }).await);
        holder = holder.opponent();
    }

    let outcome = last.expect("five passes");
    assert_eq!(outcome.game.status(), MatchStatus::Completed);
    assert_eq!(*outcome.game.scores.get(first_holder), 3);
    assert_eq!(*outcome.game.scores.get(first_holder.opponent()), 2);
    assert_eq!(outcome.game.winner(), Some(Winner::Seat(first_holder)));
    assert_eq!(
        outcome.game.outcome().map(|outcome| outcome.reason),
        Some(FinishReason::QuestionsExhausted)
    );
}

#[tokio::test]
async fn barrier_scores_once_both_submitted_and_rejects_late_submissions() {
    let generator = Arc::new(ScriptedGenerator::with_scores(&[
        ("CloudFront in front of S3", 80),
        ("EC2 behind an ALB", 60),
    ]));
    let state = app(generator.clone()).await;
    let game = started(&state, MatchMode::SubmissionBarrier).await;

    let first = act(
        &state,
        &game.code,
        INITIATOR,
        MatchAction::Submit {
            answer: "CloudFront in front of S3".into(),
            time_remaining: 40,
        },
    )
    .await;
    assert!(first.waiting_for_opponent);
    assert_eq!(first.game.status(), MatchStatus::Active);
    assert_eq!(generator.score_calls(), 0);

    let second = act(
        &state,
        &game.code,
        OPPONENT,
        MatchAction::Submit {
            answer: "EC2 behind an ALB".into(),
            time_remaining: 12,
        },
    )
    .await;
    assert!(!second.waiting_for_opponent);
    assert_eq!(second.game.status(), MatchStatus::Completed);
    assert_eq!(second.game.winner(), Some(Winner::Seat(Seat::A)));
    assert_eq!(second.game.scores.a, 80);
    assert_eq!(second.game.scores.b, 60);
    assert_eq!(generator.score_calls(), 2);

    let late = match_service::perform_action(
        &state,
        &game.code,
        INITIATOR,
        MatchAction::Submit {
            answer: "again".into(),
            time_remaining: 0,
        },
    )
    .await;
    assert!(matches!(
        late,
        Err(ServiceError::Match(MatchError::MatchAlreadyOver))
    ));
}

#[tokio::test]
async fn second_submission_from_the_same_side_is_rejected() {
    let generator = Arc::new(ScriptedGenerator::with_scores(&[("first", 10)]));
    let state = app(generator).await;
    let game = started(&state, MatchMode::SubmissionBarrier).await;

    act(
        &state,
        &game.code,
        OPPONENT,
        MatchAction::Submit {
            answer: "first".into(),
            time_remaining: 3,
        },
    )
    .await;

    let again = match_service::perform_action(
        &state,
        &game.code,
        OPPONENT,
        MatchAction::Submit {
            answer: "overwrite".into(),
            time_remaining: 1,
        },
    )
    .await;
    assert!(matches!(
        again,
        Err(ServiceError::Match(MatchError::AlreadySubmitted))
    ));

    let (stored, _) = match_service::get_match(&state, &game.code, OPPONENT)
        .await
        .unwrap();
    let barrier = stored.mode_state.as_ref().and_then(ModeState::barrier).unwrap();
    assert_eq!(
        barrier.submissions.b.as_ref().map(|s| s.answer.as_str()),
        Some("first")
    );
}

#[tokio::test]
async fn finalize_recovers_from_a_scorer_failure() {
    // Only one answer is known to the scorer, so the first scoring round fails.
    let generator = Arc::new(ScriptedGenerator::with_scores(&[("known", 70)]));
    let state = app(generator.clone()).await;
    let game = started(&state, MatchMode::SubmissionBarrier).await;

    act(
        &state,
        &game.code,
        INITIATOR,
        MatchAction::Submit {
            answer: "known".into(),
            time_remaining: 5,
        },
    )
    .await;
    let failed = match_service::perform_action(
        &state,
        &game.code,
        OPPONENT,
        MatchAction::Submit {
            answer: "unknown".into(),
            time_remaining: 5,
        },
    )
    .await;
    assert!(matches!(failed, Err(ServiceError::Generator(_))));

    let (stored, _) = match_service::get_match(&state, &game.code, INITIATOR)
        .await
        .unwrap();
    assert_eq!(stored.status(), MatchStatus::Active);
    let barrier = stored.mode_state.as_ref().and_then(ModeState::barrier).unwrap();
    assert!(barrier.both_submitted());
    assert!(barrier.scoring_failed);

    if let Ok(mut table) = generator.scores.lock() {
        table.insert("unknown".into(), 90);
    }
    let finalized = act(&state, &game.code, INITIATOR, MatchAction::Finalize).await;
    assert_eq!(finalized.game.status(), MatchStatus::Completed);
    assert_eq!(finalized.game.winner(), Some(Winner::Seat(Seat::B)));
    assert_eq!(generator.score_calls(), 4);
}

#[tokio::test]
async fn finalize_before_both_submissions_is_rejected() {
    let generator = Arc::new(ScriptedGenerator::with_scores(&[("a", 40), ("b", 50)]));
    let state = app(generator.clone()).await;
    let game = started(&state, MatchMode::SubmissionBarrier).await;

    let early = match_service::perform_action(&state, &game.code, OPPONENT, MatchAction::Finalize)
        .await;
    assert!(matches!(
        early,
        Err(ServiceError::Match(MatchError::InvalidAction(_)))
    ));
    assert_eq!(generator.score_calls(), 0);
}

#[tokio::test]
async fn short_question_sets_do_not_start_the_match() {
    let generator = Arc::new(ScriptedGenerator::default());
    if let Ok(mut count) = generator.question_count.lock() {
        *count = Some(3);
    }
    let state = app(generator.clone()).await;
    let game = invite(&state, MatchMode::Elimination).await;
    act(&state, &game.code, OPPONENT, MatchAction::Accept).await;

    let result =
        match_service::perform_action(&state, &game.code, INITIATOR, MatchAction::Start).await;
    assert!(matches!(
        result,
        Err(ServiceError::Generator(GeneratorError::Malformed(_)))
    ));

    let (stored, _) = match_service::get_match(&state, &game.code, INITIATOR)
        .await
        .unwrap();
    assert_eq!(stored.status(), MatchStatus::Active);
    assert!(stored.mode_state.is_none());
}

#[tokio::test]
async fn buzz_race_awards_points_to_the_buzzer() {
    let state = app(Arc::new(ScriptedGenerator::default())).await;
    let game = started(&state, MatchMode::BuzzRace).await;

    act(&state, &game.code, OPPONENT, MatchAction::Buzz).await;

    let stolen = match_service::perform_action(
        &state,
        &game.code,
        INITIATOR,
        MatchAction::Answer { choice_index: 0 },
    )
    .await;
    assert!(matches!(
        stolen,
        Err(ServiceError::Match(MatchError::NotYourTurn))
    ));

    let answered = act(
        &state,
        &game.code,
        OPPONENT,
        MatchAction::Answer { choice_index: 0 },
    )
    .await;
    assert_eq!(answered.game.scores.b, 10);
    match &answered.game.mode_state {
        Some(ModeState::BuzzRace(race)) => {
            assert_eq!(race.question_index, 1);
            assert_eq!(race.buzzed_by, Some(Seat::B));
        }
        other => panic!("unexpected mode state {other:?}"),
    }
}

#[tokio::test]
async fn strangers_are_rejected() {
    let state = app(Arc::new(ScriptedGenerator::default())).await;
    let game = invite(&state, MatchMode::BuzzRace).await;

    assert!(matches!(
        match_service::get_match(&state, &game.code, "intruder").await,
        Err(ServiceError::Match(MatchError::NotParticipant))
    ));

    for action in [MatchAction::Accept, MatchAction::Cancel, MatchAction::Start] {
        assert!(matches!(
            match_service::perform_action(&state, &game.code, "intruder", action).await,
            Err(ServiceError::Match(MatchError::NotParticipant))
        ));
    }

    let started = {
        act(&state, &game.code, OPPONENT, MatchAction::Accept).await;
        act(&state, &game.code, INITIATOR, MatchAction::Start).await.game
    };
    assert!(matches!(
        match_service::perform_action(&state, &started.code, "intruder", MatchAction::Buzz).await,
        Err(ServiceError::Match(MatchError::NotParticipant))
    ));
}

#[tokio::test]
async fn decline_completes_the_invite_as_a_draw() {
    let state = app(Arc::new(ScriptedGenerator::default())).await;
    let game = invite(&state, MatchMode::Elimination).await;

    let declined = act(&state, &game.code, OPPONENT, MatchAction::Decline).await;
    assert_eq!(declined.game.status(), MatchStatus::Completed);
    assert_eq!(declined.game.winner(), Some(Winner::Draw));
    assert!(declined.game.mode_state.is_none());

    assert!(matches!(
        match_service::perform_action(&state, &game.code, OPPONENT, MatchAction::Accept).await,
        Err(ServiceError::Match(MatchError::MatchAlreadyOver))
    ));
}

#[tokio::test]
async fn invite_rejects_self_challenges() {
    let state = app(Arc::new(ScriptedGenerator::default())).await;
    let result = match_service::create_match(
        &state,
        INITIATOR,
        versus_back::dto::match_dto::CreateMatchRequest {
            opponent_id: INITIATOR.into(),
            mode: MatchMode::BuzzRace,
            topic: "SAA-C03".into(),
            difficulty: Default::default(),
        },
    )
    .await;
    assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
}

#[tokio::test]
async fn generator_failure_leaves_the_match_startable() {
    let generator = Arc::new(ScriptedGenerator::default());
    generator
        .fail_content
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let state = app(generator.clone()).await;
    let game = invite(&state, MatchMode::BuzzRace).await;
    act(&state, &game.code, OPPONENT, MatchAction::Accept).await;

    let failed =
        match_service::perform_action(&state, &game.code, INITIATOR, MatchAction::Start).await;
    assert!(matches!(failed, Err(ServiceError::Generator(_))));

    let (stored, _) = match_service::get_match(&state, &game.code, INITIATOR)
        .await
        .unwrap();
    assert_eq!(stored.status(), MatchStatus::Active);
    assert!(stored.mode_state.is_none());

    generator
        .fail_content
        .store(false, std::sync::atomic::Ordering::SeqCst);
    let retried = act(&state, &game.code, INITIATOR, MatchAction::Start).await;
    assert!(matches!(
        retried.game.mode_state,
        Some(ModeState::BuzzRace(_))
    ));
}

#[tokio::test]
async fn slow_generator_times_out() {
    let generator = Arc::new(ScriptedGenerator::default());
    if let Ok(mut delay) = generator.content_delay.lock() {
        *delay = Some(Duration::from_millis(500));
    }
    let mut config = AppConfig::default();
    config.generator.timeout = Duration::from_millis(20);
    let state = app_with_config(config, generator).await;

    let game = invite(&state, MatchMode::Elimination).await;
    act(&state, &game.code, OPPONENT, MatchAction::Accept).await;

    let result =
        match_service::perform_action(&state, &game.code, INITIATOR, MatchAction::Start).await;
    assert!(matches!(
        result,
        Err(ServiceError::Generator(GeneratorError::Timeout(_)))
    ));
}

#[tokio::test]
async fn unknown_codes_are_not_found() {
    let state = app(Arc::new(ScriptedGenerator::default())).await;
    let code = versus_back::state::versus::MatchCode::parse("ZZZZZZ").unwrap();
    assert!(matches!(
        match_service::get_match(&state, &code, INITIATOR).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn degraded_state_refuses_requests() {
    let state = AppState::new(
        AppConfig::default(),
        Arc::new(ScriptedGenerator::default()),
    );
    let code = versus_back::state::versus::MatchCode::parse("ABCDEF").unwrap();
    assert!(matches!(
        match_service::get_match(&state, &code, INITIATOR).await,
        Err(ServiceError::Degraded)
    ));
}

#[tokio::test]
async fn subscribers_receive_each_written_state() {
    let state = app(Arc::new(ScriptedGenerator::default())).await;
    let game = invite(&state, MatchMode::BuzzRace).await;
    let mut events = state.hub().subscribe(&game.code);

    act(&state, &game.code, OPPONENT, MatchAction::Accept).await;

    let event = events.recv().await.unwrap();
    assert_eq!(event.event.as_deref(), Some(MATCH_STATE_EVENT));
    let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
    assert_eq!(payload["status"], "active");
    assert_eq!(payload["code"], game.code.as_str());
    assert_eq!(payload["version"], 1);

    // Rejected actions publish nothing.
    let _ = match_service::perform_action(&state, &game.code, OPPONENT, MatchAction::Start).await;
    assert!(events.try_recv().is_err());
}
