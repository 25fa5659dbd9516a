#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use versus_back::{
    config::AppConfig,
    dao::{
        match_store::{MatchStore, memory::MemoryMatchStore},
        models::MatchEntity,
        storage::{StorageResult, WriteOutcome},
    },
    dto::{match_dto::CreateMatchRequest, sse::ServerEvent},
    services::{
        generator::{
            BriefRequest, ContentGenerator, GeneratorError, QuestionRequest, ScoreRequest,
        },
        match_service::{self, ActionOutcome},
    },
    state::{
        AppState, SharedState,
        content::{Brief, Question},
        fanout::{MatchNotifier, NotifyError},
        versus::{Difficulty, Match, MatchAction, MatchCode, MatchMode},
    },
};

pub const INITIATOR: &str = "p1";
pub const OPPONENT: &str = "p2";

/// Generator double: every question's correct choice is index 0 and scores are
/// looked up by answer text.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub fail_content: AtomicBool,
    pub content_delay: Mutex<Option<Duration>>,
    /// Questions returned regardless of the requested count.
    pub question_count: Mutex<Option<usize>>,
    pub score_delay: Mutex<Option<Duration>>,
    pub scores: Mutex<HashMap<String, u32>>,
    pub score_calls: AtomicUsize,
    pub content_calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn with_scores(scores: &[(&str, u32)]) -> Self {
        let generator = Self::default();
        if let Ok(mut table) = generator.scores.lock() {
            for (answer, score) in scores {
                table.insert((*answer).to_owned(), *score);
            }
        }
        generator
    }

    pub fn score_calls(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }

    fn content_outcome(&self) -> (Option<Duration>, bool) {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.content_delay.lock().ok().and_then(|delay| *delay);
        (delay, self.fail_content.load(Ordering::SeqCst))
    }
}

pub fn question(index: usize) -> Question {
    Question {
        prompt: format!("Question {index}"),
        choices: vec!["right".into(), "wrong".into(), "also wrong".into()],
        answer_index: 0,
        explanation: None,
    }
}

impl ContentGenerator for ScriptedGenerator {
    fn questions(
        &self,
        request: QuestionRequest,
    ) -> BoxFuture<'static, Result<Vec<Question>, GeneratorError>> {
        let (delay, fail) = self.content_outcome();
        let count = self
            .question_count
            .lock()
            .ok()
            .and_then(|count| *count)
            .unwrap_or(request.count);
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(GeneratorError::Other("scripted outage".into()));
            }
            Ok((0..count).map(question).collect())
        })
    }

    fn brief(&self, request: BriefRequest) -> BoxFuture<'static, Result<Brief, GeneratorError>> {
        let (delay, fail) = self.content_outcome();
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(GeneratorError::Other("scripted outage".into()));
            }
            Ok(Brief {
                title: format!("{} deployment", request.topic),
                scenario: "Serve a static site worldwide over HTTPS".into(),
                requirements: vec!["p99 latency under 100ms".into()],
            })
        })
    }

    fn score(&self, request: ScoreRequest) -> BoxFuture<'static, Result<u32, GeneratorError>> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        let score = self
            .scores
            .lock()
            .ok()
            .and_then(|table| table.get(&request.answer).copied());
        let delay = self.score_delay.lock().ok().and_then(|delay| *delay);
        Box::pin(async move {
            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
            score.ok_or_else(|| GeneratorError::Other(format!("no score for `{}`", request.answer)))
        })
    }
}

/// Store whose conditional writes always lose.
#[derive(Clone, Default)]
pub struct AlwaysConflictStore {
    pub inner: MemoryMatchStore,
    pub attempts: Arc<AtomicUsize>,
}

impl MatchStore for AlwaysConflictStore {
    fn backend_name(&self) -> &'static str {
        "always-conflict"
    }

    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.insert_match(entity)
    }

    fn find_match(&self, code: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        self.inner.find_match(code)
    }

    fn replace_match(
        &self,
        _entity: MatchEntity,
        _expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(WriteOutcome::Conflict) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

/// Notifier that refuses every event.
#[derive(Default)]
pub struct BrokenNotifier {
    pub attempts: AtomicUsize,
}

impl MatchNotifier for BrokenNotifier {
    fn publish(&self, _code: &MatchCode, _event: ServerEvent) -> Result<usize, NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError("socket gateway unreachable".into()))
    }
}

/// App state backed by an in-memory store.
pub async fn app(generator: Arc<ScriptedGenerator>) -> SharedState {
    app_with_config(AppConfig::default(), generator).await
}

pub async fn app_with_config(config: AppConfig, generator: Arc<ScriptedGenerator>) -> SharedState {
    let state = AppState::new(config, generator);
    state
        .set_match_store(Arc::new(MemoryMatchStore::new()))
        .await;
    state
}

pub async fn invite(state: &SharedState, mode: MatchMode) -> Match {
    match_service::create_match(
        state,
        INITIATOR,
        CreateMatchRequest {
            opponent_id: OPPONENT.into(),
            mode,
            topic: "SAA-C03".into(),
            difficulty: Difficulty::Medium,
        },
    )
    .await
    .expect("invite")
}

pub async fn act(
    state: &SharedState,
    code: &MatchCode,
    actor: &str,
    action: MatchAction,
) -> ActionOutcome {
    match_service::perform_action(state, code, actor, action)
        .await
        .unwrap_or_else(|err| panic!("{actor} action failed: {err}"))
}

/// Invite, accept and start a match of `mode`.
pub async fn started(state: &SharedState, mode: MatchMode) -> Match {
    let game = invite(state, mode).await;
    act(state, &game.code, OPPONENT, MatchAction::Accept).await;
    act(state, &game.code, INITIATOR, MatchAction::Start).await.game
}
