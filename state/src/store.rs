//! Application store: the single construction point for state and persistence
//!
//! `AppStore::open` rehydrates before returning, so nothing can observe the
//! default state that rehydration is about to replace.

use parking_lot::Mutex;
use std::sync::Arc;
use tasknest_core::{
    ErrorSink, KeyValueStore, PersistenceConfig, StoreResult, TaskId, Theme,
};
use tracing::info;

use crate::app::{prepare_task, Action, AppState, SliceKey};
use crate::container::{StateContainer, Subscription, Transition};
use crate::gateway::{resolve_whitelist, PersistenceGateway};
use crate::rehydrate::{RehydrationReport, Rehydrator};

/// Rehydrated, persistence-backed application store
pub struct AppStore {
    container: Arc<StateContainer<AppState>>,
    gateway: Arc<PersistenceGateway<AppState>>,
    persistence: Mutex<Option<Subscription>>,
    rehydration: RehydrationReport,
}

impl AppStore {
    /// Build the store: resolve the whitelist, rehydrate, then start
    /// mirroring transitions to `backend`.
    ///
    /// Storage failures never fail `open`; only configuration errors do.
    pub async fn open(
        config: &PersistenceConfig,
        backend: Arc<dyn KeyValueStore>,
        sink: Arc<dyn ErrorSink>,
    ) -> StoreResult<Self> {
        let whitelist: Vec<SliceKey> =
            resolve_whitelist::<AppState>(config.effective_whitelist())?;

        let gateway = Arc::new(
            PersistenceGateway::new(backend.clone(), whitelist.clone(), sink.clone())?
                .with_write_timeout(config.write_timeout()),
        );

        let container = Arc::new(StateContainer::new());
        let rehydration = Rehydrator::<AppState>::new(backend, whitelist, sink)
            .with_read_timeout(config.read_timeout())
            .rehydrate(&container)
            .await;

        let subscription = gateway.attach(&container);
        info!(
            slices = ?gateway.whitelist(),
            tasks = container.get_state().tasks.len(),
            "store ready"
        );

        Ok(Self {
            container,
            gateway,
            persistence: Mutex::new(Some(subscription)),
            rehydration,
        })
    }

    /// Apply an action synchronously
    pub fn dispatch(&self, action: Action) {
        self.container.dispatch(action);
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Transition<'_, AppState>) + Send + Sync + 'static,
    {
        self.container.subscribe(listener)
    }

    /// Latest applied state
    pub fn state(&self) -> Arc<AppState> {
        self.container.get_state()
    }

    pub fn container(&self) -> &Arc<StateContainer<AppState>> {
        &self.container
    }

    pub fn rehydration(&self) -> &RehydrationReport {
        &self.rehydration
    }

    /// Whether transitions are still mirrored to the backing store
    pub fn is_persisting(&self) -> bool {
        self.persistence.lock().is_some()
    }

    // ============ Task Operations ============

    /// Validate and add a task, returning its new identifier
    pub fn add_task(&self, title: &str) -> StoreResult<TaskId> {
        let task = prepare_task(title)?;
        let id = task.id.clone();
        self.dispatch(Action::AddTask(task));
        Ok(id)
    }

    pub fn toggle_task(&self, id: &TaskId) {
        self.dispatch(Action::ToggleTask(id.clone()));
    }

    pub fn remove_task(&self, id: &TaskId) {
        self.dispatch(Action::RemoveTask(id.clone()));
    }

    // ============ Theme Operations ============

    pub fn set_theme(&self, theme: Theme) {
        self.dispatch(Action::SetTheme(theme));
    }

    /// Flip the theme and return the new one
    pub fn toggle_theme(&self) -> Theme {
        self.dispatch(Action::ToggleTheme);
        *self.state().theme
    }

    // ============ Session Operations ============

    pub fn log_in(&self, email: &str, name: Option<&str>) -> StoreResult<()> {
        self.dispatch(Action::log_in(email, name)?);
        Ok(())
    }

    pub fn log_out(&self) {
        self.dispatch(Action::LogOut);
    }

    pub fn is_logged_in(&self) -> bool {
        self.state().session.is_logged_in
    }

    // ============ Profile Operations ============

    pub fn update_profile(&self, name: &str, bio: &str) -> StoreResult<()> {
        self.dispatch(Action::update_profile(name, bio)?);
        Ok(())
    }

    // ============ Lifecycle ============

    /// Wait for every scheduled write to settle
    pub async fn flush(&self) {
        self.gateway.flush().await;
    }

    /// Restore compiled-in defaults in memory. Persisted slices follow on the
    /// next write-through.
    pub fn reset(&self) {
        self.container.reset();
    }

    /// Stop mirroring and wait for in-flight writes
    pub async fn shutdown(&self) {
        let subscription = self.persistence.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        self.gateway.flush().await;
        info!("store shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{PROFILE_KEY, SESSION_KEY, TASKS_KEY, THEME_KEY};
    use crate::memory::MemoryKeyValueStore;
    use crate::persistent::SledKeyValueStore;
    use crate::rehydrate::SliceOutcome;
    use crate::sink::MemoryErrorSink;
    use crate::testing::FlakyStore;
    use tasknest_core::{StoreError, Task};
    use tempfile::TempDir;

    async fn open_memory(
        backend: Arc<MemoryKeyValueStore>,
    ) -> (AppStore, Arc<MemoryErrorSink>) {
        let sink = Arc::new(MemoryErrorSink::new());
        let store = AppStore::open(&PersistenceConfig::default(), backend, sink.clone())
            .await
            .unwrap();
        (store, sink)
    }

    #[tokio::test]
    async fn test_add_add_remove_scenario() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let (store, _) = open_memory(backend).await;

        let a = store.add_task("A").unwrap();
        store.add_task("B").unwrap();
        store.remove_task(&a);

        let tasks = store.state().tasks.clone();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "B");
    }

    #[tokio::test]
    async fn test_validation_error_never_reaches_container() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let (store, _) = open_memory(backend).await;
        let version = store.container().version();

        let err = store.add_task("  ").unwrap_err();

        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.container().version(), version);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let backend = Arc::new(MemoryKeyValueStore::new());

        let (first, _) = open_memory(backend.clone()).await;
        let id = first.add_task("Buy milk").unwrap();
        first.toggle_task(&id);
        first.toggle_theme();
        first.log_in("a@b.c", Some("Ada")).unwrap();
        first.update_profile("Ada", "memory only").unwrap();
        first.shutdown().await;
        let before = first.state();

        let (second, sink) = open_memory(backend.clone()).await;
        let after = second.state();

        assert_eq!(after.tasks, before.tasks);
        assert_eq!(*after.theme, Theme::Dark);
        assert!(after.session.is_logged_in);
        // Profile is not whitelisted by default
        assert!(after.profile.name.is_empty());
        assert!(!backend.contains(PROFILE_KEY));
        assert!(second.rehydration().is_clean());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_untitled_task_survives_restart() {
        let backend = Arc::new(MemoryKeyValueStore::new());

        let (first, _) = open_memory(backend.clone()).await;
        first.add_task("keep me").unwrap();
        first.add_task("and me").unwrap();
        first.dispatch(Action::AddTask(Task::with_id(TaskId::from("z"), "")));
        first.shutdown().await;
        let before = first.state();

        let (second, sink) = open_memory(backend).await;

        assert_eq!(second.state().tasks, before.tasks);
        assert_eq!(second.state().tasks.len(), 3);
        assert_eq!(second.rehydration().outcome(TASKS_KEY), Some(SliceOutcome::Restored));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_rehydration_does_not_rewrite_loaded_values() {
        let backend = Arc::new(MemoryKeyValueStore::with_entries([(THEME_KEY, " dark\n")]));
        let (store, _) = open_memory(backend.clone()).await;
        store.flush().await;

        assert_eq!(*store.state().theme, Theme::Dark);
        assert_eq!(backend.value(THEME_KEY).as_deref(), Some(" dark\n"));
        assert!(!backend.contains(TASKS_KEY));
    }

    #[tokio::test]
    async fn test_corrupt_tasks_still_opens() {
        let backend = Arc::new(MemoryKeyValueStore::with_entries([
            (TASKS_KEY, "not json at all"),
            (SESSION_KEY, r#"{"isLoggedIn":true}"#),
        ]));
        let (store, sink) = open_memory(backend).await;

        assert!(store.state().tasks.is_empty());
        assert!(store.is_logged_in());
        assert_eq!(store.rehydration().outcome(TASKS_KEY), Some(SliceOutcome::Corrupted));
        assert_eq!(sink.len(), 1);

        // Usable afterwards: the next add overwrites the corrupt value
        store.add_task("fresh").unwrap();
        store.flush().await;
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_storage_outage_is_contained() {
        let backend = Arc::new(FlakyStore::default());
        backend.fail_reads(true);
        backend.fail_writes(true);
        let sink = Arc::new(MemoryErrorSink::new());

        let store = AppStore::open(&PersistenceConfig::default(), backend, sink.clone())
            .await
            .unwrap();
        store.add_task("offline").unwrap();
        store.flush().await;

        assert_eq!(store.state().tasks.len(), 1);
        // Three failed reads, one failed write
        assert_eq!(sink.len(), 4);
        assert!(sink.reports().iter().all(|r| r.storage_unavailable));
    }

    #[tokio::test]
    async fn test_memory_only_config_writes_nothing() {
        let backend = Arc::new(MemoryKeyValueStore::with_entries([(THEME_KEY, "dark")]));
        let sink = Arc::new(MemoryErrorSink::new());

        let store = AppStore::open(&PersistenceConfig::memory_only(), backend.clone(), sink)
            .await
            .unwrap();
        assert_eq!(*store.state().theme, Theme::Light);

        store.add_task("ephemeral").unwrap();
        store.flush().await;
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_whitelist_entry_fails_open() {
        let config = PersistenceConfig {
            whitelist: vec!["tasks".to_string(), "wallet".to_string()],
            ..Default::default()
        };
        let result = AppStore::open(
            &config,
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MemoryErrorSink::new()),
        )
        .await;
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[tokio::test]
    async fn test_shutdown_detaches_persistence() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let (store, _) = open_memory(backend.clone()).await;

        store.shutdown().await;
        assert!(!store.is_persisting());

        store.add_task("after shutdown").unwrap();
        store.flush().await;
        assert!(!backend.contains(TASKS_KEY));
    }

    #[tokio::test]
    async fn test_reset_persists_defaults() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let (store, _) = open_memory(backend.clone()).await;

        store.add_task("A").unwrap();
        store.toggle_theme();
        store.reset();
        store.flush().await;

        assert_eq!(*store.state(), AppState::default());
        assert_eq!(backend.value(TASKS_KEY).as_deref(), Some("[]"));
        assert_eq!(backend.value(THEME_KEY).as_deref(), Some("light"));
    }

    #[tokio::test]
    async fn test_sled_backed_restart() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemoryErrorSink::new());

        let id = {
            let backend = Arc::new(SledKeyValueStore::open(tmp.path()).unwrap());
            let store = AppStore::open(&PersistenceConfig::default(), backend, sink.clone())
                .await
                .unwrap();
            let id = store.add_task("durable").unwrap();
            store.set_theme(Theme::Dark);
            store.shutdown().await;
            id
        };

        let backend = Arc::new(SledKeyValueStore::open(tmp.path()).unwrap());
        let store = AppStore::open(&PersistenceConfig::default(), backend, sink.clone())
            .await
            .unwrap();

        let state = store.state();
        assert_eq!(state.task(&id).map(|t| t.title.as_str()), Some("durable"));
        assert_eq!(*state.theme, Theme::Dark);
        assert!(sink.is_empty());
    }
}
