use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::Deserialize;
use tokio::time::Instant;

use polaris_models::v0::Guild;

use crate::{snapshot::Snapshot, store::SessionStore, transport::ApiResponse, transport::GuildsApi};

/// Fallback retry delay when a 429 body carries no usable hint, seconds
const DEFAULT_RETRY_AFTER: f32 = 5.0;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit reached. Please try again later.";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized. Please log in with Discord.";
pub const GENERIC_MESSAGE: &str = "An unexpected error occurred while loading guilds.";

/// Outcome of one [`GuildsController::maybe_fetch`] invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchDecision {
    /// Network call performed
    Fetched,
    /// Already succeeded once this session, a manual refresh is required
    SkippedAlreadyFetched,
    /// Within the local attempt cooldown
    SkippedCooldown,
    /// A retry deadline is still in the future
    SkippedRetryDeadline,
}

/// Retry hint embedded in a 429 body
#[derive(Deserialize)]
struct RetryHint {
    retry_after: Option<f32>,
}

// A clock before the epoch reads as zero, which simply means no retry
// deadline can be in the future.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Client-side fetch gate and session state for the guild list.
///
/// Reads the session snapshot exactly once at construction, persists after
/// every observable change, and suppresses redundant fetches for its own
/// lifetime: a successful fetch latches until [`refresh`] clears it.
///
/// [`refresh`]: GuildsController::refresh
pub struct GuildsController {
    api: Arc<dyn GuildsApi>,
    store: Arc<dyn SessionStore>,
    cooldown: Duration,

    guilds: Vec<Guild>,
    active_guild_id: Option<String>,
    error: Option<String>,
    retry_after_ts: Option<u64>,

    last_attempt: Option<Instant>,
    fetched_once: bool,
}

impl GuildsController {
    pub async fn new(api: Arc<dyn GuildsApi>, store: Arc<dyn SessionStore>) -> Self {
        let config = polaris_config::config().await;
        Self::with_cooldown(api, store, Duration::from_millis(config.client.cooldown_ms))
    }

    pub fn with_cooldown(
        api: Arc<dyn GuildsApi>,
        store: Arc<dyn SessionStore>,
        cooldown: Duration,
    ) -> Self {
        let mut controller = Self {
            api,
            store,
            cooldown,
            guilds: Vec::new(),
            active_guild_id: None,
            error: None,
            retry_after_ts: None,
            last_attempt: None,
            fetched_once: false,
        };

        controller.restore();
        controller
    }

    /// Issue a network call unless session state says it would be redundant.
    ///
    /// Idempotent and caller-triggered, first matching rule wins: the
    /// once-per-session latch, then the local attempt cooldown, then any
    /// retry deadline a rate limit left behind.
    pub async fn maybe_fetch(&mut self) -> FetchDecision {
        if self.fetched_once {
            tracing::debug!("skipping fetch: already fetched this session");
            return FetchDecision::SkippedAlreadyFetched;
        }

        if let Some(last_attempt) = self.last_attempt {
            if last_attempt.elapsed() < self.cooldown {
                tracing::debug!("skipping fetch: attempt cooldown active");
                return FetchDecision::SkippedCooldown;
            }
        }

        if let Some(deadline) = self.retry_after_ts {
            if deadline > now_ms() {
                tracing::debug!("skipping fetch: retry deadline in the future");
                return FetchDecision::SkippedRetryDeadline;
            }
        }

        self.last_attempt = Some(Instant::now());
        self.error = None;

        match self.api.fetch_guilds().await {
            Ok(response) => self.apply_response(response),
            Err(error) => {
                tracing::error!("guild fetch failed: {error:?}");
                self.fail(GENERIC_MESSAGE.to_string());
            }
        }

        self.persist();
        FetchDecision::Fetched
    }

    /// Clear the once-per-session latch and fetch again
    pub async fn refresh(&mut self) -> FetchDecision {
        tracing::debug!("manual refresh requested");
        self.fetched_once = false;
        self.maybe_fetch().await
    }

    /// Select a guild, persisting the choice for the session
    pub fn set_active_guild(&mut self, id: Option<String>) {
        self.active_guild_id = id.filter(|id| self.guilds.iter().any(|guild| &guild.id == id));
        self.persist();
    }

    pub fn guilds(&self) -> &[Guild] {
        &self.guilds
    }

    pub fn active_guild(&self) -> Option<&Guild> {
        self.active_guild_id
            .as_ref()
            .and_then(|id| self.guilds.iter().find(|guild| &guild.id == id))
    }

    /// Short human-readable failure message for the UI, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Epoch milliseconds the UI can count down towards, if rate limited
    pub fn retry_after_ts(&self) -> Option<u64> {
        self.retry_after_ts
    }

    /// Load the snapshot written by a previous mount of this session
    fn restore(&mut self) {
        let snapshot = match self.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(error) => {
                tracing::warn!("failed to read session cache: {error:?}");
                return;
            }
        };

        if !snapshot.guilds.is_empty() {
            // A cached set means some earlier fetch succeeded this session
            self.fetched_once = true;
            self.active_guild_id = snapshot
                .guilds
                .iter()
                .find(|guild| Some(&guild.id) == snapshot.active_guild_id.as_ref())
                .or_else(|| snapshot.guilds.first())
                .map(|guild| guild.id.clone());
            self.guilds = snapshot.guilds;
        }

        if let Some(deadline) = snapshot.retry_after_ts {
            if deadline > now_ms() {
                self.retry_after_ts = Some(deadline);
                self.error = Some(RATE_LIMIT_MESSAGE.to_string());
            }
        }
    }

    fn persist(&self) {
        let snapshot = Snapshot {
            guilds: self.guilds.clone(),
            active_guild_id: self.active_guild_id.clone(),
            retry_after_ts: self.retry_after_ts,
        };

        // Cache writes are an optimization, failures are logged and dropped
        if let Err(error) = self.store.save(&snapshot) {
            tracing::warn!("failed to write session cache: {error:?}");
        }
    }

    fn apply_response(&mut self, response: ApiResponse) {
        match response.status {
            200 => match serde_json::from_str::<Vec<Guild>>(&response.body) {
                Ok(guilds) => self.apply_success(guilds),
                Err(error) => {
                    tracing::error!("guild list body unreadable: {error:?}");
                    self.fail(GENERIC_MESSAGE.to_string());
                }
            },
            429 => {
                let hint = serde_json::from_str::<RetryHint>(&response.body)
                    .ok()
                    .and_then(|hint| hint.retry_after)
                    .unwrap_or(DEFAULT_RETRY_AFTER);

                tracing::warn!(retry_after = hint, "rate limited by the guild API");
                self.retry_after_ts = Some(now_ms() + (hint * 1000.0) as u64);
                self.error = Some(RATE_LIMIT_MESSAGE.to_string());
                // the once-latch stays clear so a refresh past the
                // deadline is allowed to retry
            }
            401 => self.fail(UNAUTHORIZED_MESSAGE.to_string()),
            status => self.fail(format!("Failed to load guilds. (status {status})")),
        }
    }

    /// Replace the guild set wholesale, keeping the active selection when
    /// it survives the refresh
    fn apply_success(&mut self, guilds: Vec<Guild>) {
        self.retry_after_ts = None;
        self.fetched_once = true;

        self.active_guild_id = self
            .active_guild_id
            .take()
            .filter(|id| guilds.iter().any(|guild| &guild.id == id))
            .or_else(|| guilds.first().map(|guild| guild.id.clone()));

        self.guilds = guilds;
    }

    fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.guilds.clear();
        self.active_guild_id = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use async_trait::async_trait;
    use polaris_result::{create_error, Result};

    use crate::store::MemoryStore;

    use super::*;

    struct StubApi {
        responses: Mutex<Vec<ApiResponse>>,
        calls: AtomicUsize,
    }

    impl StubApi {
        fn new(responses: Vec<(u16, &str)>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .rev()
                        .map(|(status, body)| ApiResponse {
                            status,
                            body: body.to_string(),
                        })
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GuildsApi for StubApi {
        async fn fetch_guilds(&self) -> Result<ApiResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| create_error!(InternalError))
        }
    }

    struct FailingStore;

    impl SessionStore for FailingStore {
        fn load(&self) -> Result<Option<Snapshot>> {
            Err(create_error!(StorageFailed))
        }

        fn save(&self, _snapshot: &Snapshot) -> Result<()> {
            Err(create_error!(StorageFailed))
        }
    }

    const TWO_GUILDS: &str = r#"[{"id":"1","name":"alpha"},{"id":"2","name":"beta"}]"#;

    fn controller(api: Arc<StubApi>, store: Arc<dyn SessionStore>) -> GuildsController {
        GuildsController::with_cooldown(api, store, Duration::ZERO)
    }

    #[tokio::test]
    async fn success_latches_until_manual_refresh() {
        let api = StubApi::new(vec![(200, TWO_GUILDS), (200, TWO_GUILDS)]);
        let mut controller = controller(api.clone(), Arc::new(MemoryStore::new()));

        assert_eq!(controller.maybe_fetch().await, FetchDecision::Fetched);
        assert_eq!(controller.guilds().len(), 2);
        assert_eq!(controller.active_guild().unwrap().id, "1");

        // second automatic trigger performs no network call
        assert_eq!(
            controller.maybe_fetch().await,
            FetchDecision::SkippedAlreadyFetched
        );
        assert_eq!(api.calls(), 1);

        // a manual refresh performs exactly one new call
        assert_eq!(controller.refresh().await, FetchDecision::Fetched);
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn unchanged_set_keeps_the_active_selection() {
        let api = StubApi::new(vec![(200, TWO_GUILDS), (200, TWO_GUILDS), (200, r#"[{"id":"1","name":"alpha"}]"#)]);
        let mut controller = controller(api, Arc::new(MemoryStore::new()));

        controller.maybe_fetch().await;
        controller.set_active_guild(Some("2".to_string()));

        controller.refresh().await;
        assert_eq!(controller.active_guild().unwrap().id, "2");

        // once the selected guild disappears, fall back to the first
        controller.refresh().await;
        assert_eq!(controller.active_guild().unwrap().id, "1");
    }

    #[tokio::test]
    async fn rate_limit_sets_deadline_without_latching() {
        let api = StubApi::new(vec![(
            429,
            r#"{"type":"LocalCooldown","retry_after":2.0,"location":"-"}"#,
        )]);
        let mut controller = controller(api.clone(), Arc::new(MemoryStore::new()));

        let before = now_ms();
        controller.maybe_fetch().await;

        assert_eq!(controller.error(), Some(RATE_LIMIT_MESSAGE));
        let deadline = controller.retry_after_ts().unwrap();
        assert!(deadline >= before + 2000 && deadline <= now_ms() + 2000);

        // the deadline, not the once-latch, is what blocks the next attempt
        assert_eq!(
            controller.maybe_fetch().await,
            FetchDecision::SkippedRetryDeadline
        );
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn unparseable_rate_limit_body_uses_default_hint() {
        let api = StubApi::new(vec![(429, "not json")]);
        let mut controller = controller(api, Arc::new(MemoryStore::new()));

        let before = now_ms();
        controller.maybe_fetch().await;

        let deadline = controller.retry_after_ts().unwrap();
        assert!(deadline >= before + 5000 && deadline <= now_ms() + 5000);
    }

    #[tokio::test]
    async fn unauthorized_clears_state_without_latching() {
        let api = StubApi::new(vec![(401, ""), (200, TWO_GUILDS)]);
        let mut controller = controller(api.clone(), Arc::new(MemoryStore::new()));

        controller.maybe_fetch().await;
        assert_eq!(controller.error(), Some(UNAUTHORIZED_MESSAGE));
        assert!(controller.guilds().is_empty());
        assert!(controller.active_guild().is_none());

        // not latched: the next trigger is allowed to try again
        assert_eq!(controller.maybe_fetch().await, FetchDecision::Fetched);
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_cooldown_suppresses_rapid_retries() {
        let api = StubApi::new(vec![(401, ""), (401, "")]);
        let mut controller = GuildsController::with_cooldown(
            api.clone(),
            Arc::new(MemoryStore::new()),
            Duration::from_millis(5000),
        );

        controller.maybe_fetch().await;
        assert_eq!(
            controller.maybe_fetch().await,
            FetchDecision::SkippedCooldown
        );
        assert_eq!(api.calls(), 1);

        tokio::time::advance(Duration::from_millis(5001)).await;
        assert_eq!(controller.maybe_fetch().await, FetchDecision::Fetched);
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn snapshot_survives_a_remount() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let api = StubApi::new(vec![(200, TWO_GUILDS)]);

        let mut first = controller(api.clone(), store.clone());
        first.maybe_fetch().await;
        first.set_active_guild(Some("2".to_string()));
        drop(first);

        // the next mount restores without a network call
        let remounted_api = StubApi::new(vec![]);
        let mut second = controller(remounted_api.clone(), store);
        assert_eq!(second.guilds().len(), 2);
        assert_eq!(second.active_guild().unwrap().id, "2");
        assert_eq!(
            second.maybe_fetch().await,
            FetchDecision::SkippedAlreadyFetched
        );
        assert_eq!(remounted_api.calls(), 0);
    }

    #[tokio::test]
    async fn stale_selection_is_re_resolved_on_restore() {
        let store = Arc::new(MemoryStore::new());
        store
            .save(&Snapshot {
                guilds: vec![
                    Guild {
                        id: "1".to_string(),
                        name: "alpha".to_string(),
                        icon: None,
                    },
                    Guild {
                        id: "2".to_string(),
                        name: "beta".to_string(),
                        icon: None,
                    },
                ],
                active_guild_id: Some("zombie".to_string()),
                retry_after_ts: None,
            })
            .unwrap();

        let api = StubApi::new(vec![]);
        let controller = controller(api, store);
        assert_eq!(controller.active_guild().unwrap().id, "1");
    }

    #[tokio::test]
    async fn storage_failures_never_abort_the_flow() {
        let api = StubApi::new(vec![(200, TWO_GUILDS)]);
        let mut controller = controller(api, Arc::new(FailingStore));

        assert_eq!(controller.maybe_fetch().await, FetchDecision::Fetched);
        assert_eq!(controller.guilds().len(), 2);
        assert!(controller.error().is_none());
    }
}
