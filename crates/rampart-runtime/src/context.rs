//! Rampart runtime context
//!
//! Owns the pieces an application wires together at start-up: the error
//! log, the two storage areas, the health cache and the configured
//! limiters.

use std::fmt;
use std::sync::Arc;

use rampart_core::RampartResult;
use rampart_report::{ErrorLog, Failure};
use rampart_state::SafeState;
use rampart_storage::{FileStore, KeyValueStore, MemoryStore, SafeStorage};
use rampart_time::{Debounce, Throttle};

use crate::{HealthCache, RampartConfig};

/// Storage area handle used by the runtime
pub type SharedStorage = SafeStorage<Arc<dyn KeyValueStore>>;

/// Rampart runtime - the configured safety layer
pub struct Rampart {
    config: RampartConfig,
    log: Arc<ErrorLog>,
    local: SharedStorage,
    session: SharedStorage,
    health: HealthCache,
}

impl Rampart {
    /// Initialise against the process-wide error log.
    ///
    /// When the process-wide log already exists it is kept as is.
    pub fn init(config: RampartConfig) -> RampartResult<Self> {
        config.validate()?;
        let log = rampart_report::init(config.errors.clone());
        Ok(Self::build(config, log))
    }

    /// Initialise with a private error log
    pub fn isolated(config: RampartConfig) -> RampartResult<Self> {
        config.validate()?;
        let log = Arc::new(ErrorLog::with_config(config.errors.clone()));
        Ok(Self::build(config, log))
    }

    fn build(config: RampartConfig, log: Arc<ErrorLog>) -> Self {
        let local: Arc<dyn KeyValueStore> = match &config.storage.persistent_path {
            Some(path) => match FileStore::open(path) {
                Ok(store) => Arc::new(store),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "persistent storage unavailable, using memory"
                    );
                    Arc::new(MemoryStore::new())
                }
            },
            None => Arc::new(MemoryStore::new()),
        };

        let session: Arc<dyn KeyValueStore> = match config.storage.session_quota_bytes {
            Some(quota) => Arc::new(MemoryStore::with_quota(quota)),
            None => Arc::new(MemoryStore::new()),
        };

        let health = HealthCache::new(config.health.cache_ttl);

        tracing::info!(
            capacity = log.capacity(),
            persistent = config.storage.persistent_path.is_some(),
            "rampart initialised"
        );

        Rampart {
            log,
            local: SafeStorage::local(local),
            session: SafeStorage::session(session),
            health,
            config,
        }
    }

    pub fn config(&self) -> &RampartConfig {
        &self.config
    }

    pub fn log(&self) -> &Arc<ErrorLog> {
        &self.log
    }

    /// Storage that survives restarts
    pub fn local(&self) -> &SharedStorage {
        &self.local
    }

    /// Storage scoped to this session
    pub fn session(&self) -> &SharedStorage {
        &self.session
    }

    pub fn health(&self) -> &HealthCache {
        &self.health
    }

    /// User-facing text for a failure
    pub fn user_message(&self, failure: &Failure) -> String {
        self.log.user_message(failure)
    }

    /// State cell reporting to this runtime's error log
    pub fn state<T: fmt::Debug>(&self, initial: T) -> SafeState<T> {
        SafeState::new(initial).with_log(self.log.clone())
    }

    /// Debounce with the configured search delay
    pub fn search_debounce<A, F>(&self, f: F) -> RampartResult<Debounce<A>>
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        Debounce::new(self.config.limits.search_debounce, f)
    }

    /// Throttle with the configured scroll limit
    pub fn scroll_throttle<A, F>(&self, f: F) -> Throttle<A>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Throttle::new(self.config.limits.scroll_throttle, f)
    }
}

impl fmt::Debug for Rampart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rampart")
            .field("config", &self.config)
            .field("errors", &self.log.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rampart_core::RampartError;
    use rampart_state::{safe_number_state, Proposal};
    use serial_test::serial;
    use std::time::Duration;

    #[test]
    fn test_isolated_runtime_defaults() {
        let rampart = Rampart::isolated(RampartConfig::default()).unwrap();
        assert_eq!(rampart.log().capacity(), 100);
        assert!(rampart.log().is_empty());
        assert_eq!(rampart.health().ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RampartConfig::default();
        config.errors.capacity = 0;
        assert!(matches!(
            Rampart::isolated(config),
            Err(RampartError::Config(_))
        ));
    }

    #[test]
    fn test_storage_areas() {
        let mut config = RampartConfig::default();
        config.storage.session_quota_bytes = Some(16);
        let rampart = Rampart::isolated(config).unwrap();

        assert!(rampart.local().set("draft", &"a long draft that fits locally"));
        assert!(!rampart.session().set("draft", &"a long draft that fits locally"));
        assert_eq!(
            rampart.session().get("draft", String::from("none")),
            "none"
        );
    }

    #[test]
    fn test_persistent_storage_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RampartConfig::default();
        config.storage.persistent_path = Some(dir.path().join("local.json"));

        {
            let rampart = Rampart::isolated(config.clone()).unwrap();
            assert!(rampart.local().set("votes", &vec![1, 2, 3]));
        }

        let rampart = Rampart::isolated(config).unwrap();
        assert_eq!(rampart.local().get("votes", Vec::<u32>::new()), vec![1, 2, 3]);
    }

    #[test]
    fn test_broken_persistent_file_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");
        std::fs::write(&path, "{broken").unwrap();

        let mut config = RampartConfig::default();
        config.storage.persistent_path = Some(path);
        let rampart = Rampart::isolated(config).unwrap();

        assert!(rampart.local().set("k", &1));
        assert_eq!(rampart.local().get("k", 0), 1);
    }

    #[test]
    fn test_state_reports_to_runtime_log() {
        let rampart = Rampart::isolated(RampartConfig::default()).unwrap();
        let count = rampart.state(3).with_validator(|v: &i32| *v < 5);

        assert_eq!(count.set(9), Proposal::Rejected);
        assert_eq!(rampart.log().len(), 1);

        let score = safe_number_state(0.0, Some(0.0), Some(10.0)).with_log(rampart.log().clone());
        score.set(15.0);
        assert_eq!(rampart.log().len(), 2);
    }

    #[test]
    fn test_user_message_uses_configured_texts() {
        let config = RampartConfig::from_json_str(
            r#"{"errors": {"messages": {"not_found": "Nothing here"}}}"#,
        )
        .unwrap();
        let rampart = Rampart::isolated(config).unwrap();

        let text = rampart.user_message(&Failure::error("Request failed with status code 404"));
        assert_eq!(text, "Nothing here");
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_limiters() {
        let rampart = Rampart::isolated(RampartConfig::default()).unwrap();

        let searches = Arc::new(Mutex::new(Vec::new()));
        let sink = searches.clone();
        let search = rampart
            .search_debounce(move |q: String| sink.lock().push(q))
            .unwrap();
        search.call("vo".into());
        search.call("vote".into());
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(*searches.lock(), vec!["vote".to_string()]);

        let scroll = rampart.scroll_throttle(|_: u32| {});
        assert!(scroll.call(1));
        assert!(!scroll.call(2));
        assert_eq!(scroll.limit(), Duration::from_millis(100));
    }

    #[test]
    fn test_unbounded_scroll_limit() {
        let mut config = RampartConfig::default();
        config.limits.scroll_throttle = Duration::MAX;
        assert!(matches!(
            Rampart::isolated(config.clone()),
            Err(RampartError::Config(_))
        ));

        let rampart = Rampart::build(config, Arc::new(ErrorLog::new()));
        let scroll = rampart.scroll_throttle(|_: u32| {});
        assert!(scroll.call(1));
        assert!(!scroll.call(2));
    }

    #[test]
    #[serial]
    fn test_init_uses_process_wide_log() {
        let rampart = Rampart::init(RampartConfig::default()).unwrap();
        assert!(Arc::ptr_eq(rampart.log(), &rampart_report::global()));
    }
}
