pub mod content;
pub mod fanout;
pub mod modes;
pub mod transitions;
pub mod validator;
pub mod versus;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::match_store::MatchStore,
    error::ServiceError,
    services::generator::ContentGenerator,
};

use self::fanout::{MatchHub, MatchNotifier};

pub type SharedState = Arc<AppState>;

/// Central application state: handles to the store, the fan-out hub and the
/// generator. Match data itself lives only in the store.
pub struct AppState {
    match_store: RwLock<Option<Arc<dyn MatchStore>>>,
    hub: Arc<MatchHub>,
    notifier: Arc<dyn MatchNotifier>,
    generator: Arc<dyn ContentGenerator>,
    config: AppConfig,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Events are published through the local [`MatchHub`]. The application
    /// starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, generator: Arc<dyn ContentGenerator>) -> SharedState {
        let hub = Arc::new(MatchHub::new(config.fanout_capacity));
        let notifier: Arc<dyn MatchNotifier> = hub.clone();
        Self::build(config, generator, hub, notifier)
    }

    /// Like [`AppState::new`] but publishing through `notifier` instead of the hub.
    pub fn with_notifier(
        config: AppConfig,
        generator: Arc<dyn ContentGenerator>,
        notifier: Arc<dyn MatchNotifier>,
    ) -> SharedState {
        let hub = Arc::new(MatchHub::new(config.fanout_capacity));
        Self::build(config, generator, hub, notifier)
    }

    fn build(
        config: AppConfig,
        generator: Arc<dyn ContentGenerator>,
        hub: Arc<MatchHub>,
        notifier: Arc<dyn MatchNotifier>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            match_store: RwLock::new(None),
            hub,
            notifier,
            generator,
            config,
            degraded: degraded_tx,
        })
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn set_match_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.match_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_match_store(&self) {
        {
            let mut guard = self.match_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current store, or [`ServiceError::Degraded`] while none is usable.
    pub async fn require_match_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        let guard = self.match_store.read().await;
        guard.as_ref().cloned().ok_or(ServiceError::Degraded)
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Local broadcast hub backing the WebSocket and SSE endpoints.
    pub fn hub(&self) -> &MatchHub {
        &self.hub
    }

    /// Sink every successful write is published to.
    pub fn notifier(&self) -> &dyn MatchNotifier {
        self.notifier.as_ref()
    }

    /// External content generator and scorer.
    pub fn generator(&self) -> &dyn ContentGenerator {
        self.generator.as_ref()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
