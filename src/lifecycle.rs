use crate::{
    clock::Sleeper,
    config::BenchmarkConfig,
    crds::{DevWorkspace, WorkspacePhase},
    error::{Error, Result},
    store::{WorkspaceKey, WorkspaceStore},
    telemetry::Metrics,
};
use std::fmt::Display;
use tracing::{info, instrument, warn};

/// What to do after observing a phase
#[derive(Debug, PartialEq)]
enum PollStep {
    Wait,
    Done,
}

fn classify(key: &WorkspaceKey, phase: WorkspacePhase) -> Result<PollStep> {
    match phase {
        WorkspacePhase::Starting => {
            info!("Workspace still starting");
            Ok(PollStep::Wait)
        }
        WorkspacePhase::Unset => {
            info!("Workspace phase empty");
            Ok(PollStep::Wait)
        }
        WorkspacePhase::Running => Ok(PollStep::Done),
        WorkspacePhase::Other(phase) => Err(Error::UnexpectedPhase {
            key: key.to_string(),
            phase,
        }),
    }
}

/// Consecutive fetch failures while polling one workspace
struct FetchErrors<'a> {
    key: &'a WorkspaceKey,
    limit: Option<u32>,
    count: u32,
}

impl<'a> FetchErrors<'a> {
    fn new(key: &'a WorkspaceKey, limit: Option<u32>) -> Self {
        Self {
            key,
            limit,
            count: 0,
        }
    }

    /// Note a failure; fails once the limit is exceeded
    fn record(&mut self, err: impl Display) -> Result<()> {
        self.count += 1;
        warn!("Error getting devworkspace {}: {}", self.key, err);
        match self.limit {
            Some(limit) if self.count > limit => Err(Error::FetchRetriesExhausted {
                key: self.key.to_string(),
                attempts: self.count,
                last_error: err.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

/// Drives one workspace through create, wait-for-running and delete
pub struct Lifecycle<'a, S, Z> {
    store: &'a S,
    sleeper: &'a Z,
    config: &'a BenchmarkConfig,
    metrics: &'a Metrics,
}

impl<'a, S, Z> Lifecycle<'a, S, Z>
where
    S: WorkspaceStore,
    Z: Sleeper,
{
    pub fn new(
        store: &'a S,
        sleeper: &'a Z,
        config: &'a BenchmarkConfig,
        metrics: &'a Metrics,
    ) -> Self {
        Self {
            store,
            sleeper,
            config,
            metrics,
        }
    }

    /// Submit the workspace and wait until it runs; returns the running object
    pub async fn start(&self, workspace: &DevWorkspace) -> Result<DevWorkspace> {
        self.store
            .create(workspace)
            .await
            .map_err(Into::<Error>::into)?;
        self.await_running(&WorkspaceKey::of(workspace)).await
    }

    /// Poll until the workspace reports `Running`.
    /// Fetch failures are retried at once; `Starting` and an empty phase wait one poll
    /// interval; any other phase is fatal.
    #[instrument(skip(self, key), fields(workspace = %key))]
    pub async fn await_running(&self, key: &WorkspaceKey) -> Result<DevWorkspace> {
        let mut errors = FetchErrors::new(key, self.config.fetch_error_limit());
        loop {
            self.metrics.record_poll();
            let observed = match self.store.get(key).await {
                Ok(Some(observed)) => observed,
                Ok(None) => {
                    self.metrics.record_fetch_error();
                    errors.record(format_args!("devworkspaces {} not found", key))?;
                    continue;
                }
                Err(e) => {
                    self.metrics.record_fetch_error();
                    errors.record(e)?;
                    continue;
                }
            };
            errors.reset();

            match classify(key, observed.phase())? {
                PollStep::Done => return Ok(observed),
                PollStep::Wait => self.pause().await,
            }
        }
    }

    pub async fn delete(&self, workspace: &DevWorkspace) -> Result<()> {
        self.store.delete(workspace).await.map_err(Into::into)
    }

    /// Poll until the workspace no longer exists, so the next trial can reuse its name.
    /// Gives up after `max_deletion_polls` sightings of the deleted workspace.
    #[instrument(skip(self, key), fields(workspace = %key))]
    pub async fn await_deleted(&self, key: &WorkspaceKey) -> Result<()> {
        let mut errors = FetchErrors::new(key, self.config.fetch_error_limit());
        let limit = self.config.deletion_poll_limit();
        let mut sightings = 0u32;
        loop {
            self.metrics.record_poll();
            match self.store.get(key).await {
                Ok(None) => return Ok(()),
                Ok(Some(_)) => {
                    errors.reset();
                    sightings += 1;
                    if limit.is_some_and(|limit| sightings > limit) {
                        return Err(Error::DeletionTimeout {
                            key: key.to_string(),
                            polls: sightings,
                        });
                    }
                    info!("Workspace still terminating");
                    self.pause().await;
                }
                Err(e) => {
                    self.metrics.record_fetch_error();
                    errors.record(e)?;
                }
            }
        }
    }

    async fn pause(&self) {
        self.metrics.record_sleep();
        self.sleeper.sleep(self.config.poll_interval()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::fake::RecordingSleeper,
        store::fake::{Call, FakeStore, Fetch},
        workspace::build_workspace,
    };
    use std::time::Duration;

    struct Harness {
        store: FakeStore,
        sleeper: RecordingSleeper,
        config: BenchmarkConfig,
        metrics: Metrics,
    }

    impl Harness {
        fn new(store: FakeStore) -> Self {
            Self {
                store,
                sleeper: RecordingSleeper::default(),
                config: BenchmarkConfig::default(),
                metrics: Metrics::default(),
            }
        }

        fn lifecycle(&self) -> Lifecycle<'_, FakeStore, RecordingSleeper> {
            Lifecycle::new(&self.store, &self.sleeper, &self.config, &self.metrics)
        }
    }

    #[tokio::test]
    async fn test_polls_until_running() {
        let h = Harness::new(FakeStore::with_script([
            Fetch::Phase(""),
            Fetch::Phase("Starting"),
            Fetch::Phase("Starting"),
            Fetch::Phase("Running"),
        ]));
        let dw = build_workspace(&h.config, 2);

        let running = h.lifecycle().start(&dw).await.unwrap();

        assert_eq!(running.phase(), WorkspacePhase::Running);
        assert_eq!(h.store.gets(), 4);
        assert_eq!(h.sleeper.sleeps(), vec![Duration::from_secs(1); 2]);
        assert_eq!(h.metrics.polls.load(std::sync::atomic::Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_unexpected_phase_is_fatal() {
        let h = Harness::new(FakeStore::with_script([
            Fetch::Phase("Starting"),
            Fetch::Phase("Failed"),
            Fetch::Phase("Running"),
        ]));
        let dw = build_workspace(&h.config, 1);

        let err = h.lifecycle().start(&dw).await.unwrap_err();

        match err {
            Error::UnexpectedPhase { key, phase } => {
                assert_eq!(key, "timing-test/timing-test");
                assert_eq!(phase, "Failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.store.gets(), 2);
        assert_eq!(h.sleeper.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_errors_retry_without_sleeping() {
        let h = Harness::new(FakeStore::with_script([
            Fetch::Error("connection reset"),
            Fetch::Error("connection reset"),
            Fetch::NotFound,
            Fetch::Phase("Running"),
        ]));
        let dw = build_workspace(&h.config, 1);

        h.lifecycle().start(&dw).await.unwrap();

        assert_eq!(h.store.gets(), 4);
        assert!(h.sleeper.sleeps().is_empty());
        assert_eq!(
            h.metrics.fetch_errors.load(std::sync::atomic::Ordering::Relaxed),
            3
        );
    }

    #[tokio::test]
    async fn test_fetch_error_limit_is_enforced() {
        let mut h = Harness::new(FakeStore::with_script(vec![
            Fetch::Error("timeout");
            5
        ]));
        h.config.max_fetch_errors = 3;
        let dw = build_workspace(&h.config, 1);

        let err = h.lifecycle().start(&dw).await.unwrap_err();

        assert!(matches!(
            err,
            Error::FetchRetriesExhausted { attempts: 4, .. }
        ));
        assert_eq!(h.store.gets(), 4);
    }

    #[tokio::test]
    async fn test_successful_fetch_resets_error_count() {
        let mut h = Harness::new(FakeStore::with_script([
            Fetch::Error("timeout"),
            Fetch::Error("timeout"),
            Fetch::Phase("Starting"),
            Fetch::Error("timeout"),
            Fetch::Error("timeout"),
            Fetch::Phase("Running"),
        ]));
        h.config.max_fetch_errors = 2;
        let dw = build_workspace(&h.config, 1);

        h.lifecycle().start(&dw).await.unwrap();
        assert_eq!(h.store.gets(), 6);
        assert_eq!(h.sleeper.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_retries_when_limit_unset() {
        let mut script = vec![Fetch::Error("timeout"); 250];
        script.push(Fetch::Phase("Running"));
        let mut h = Harness::new(FakeStore::with_script(script));
        h.config.max_fetch_errors = 0;
        let dw = build_workspace(&h.config, 1);

        h.lifecycle().start(&dw).await.unwrap();
        assert_eq!(h.store.gets(), 251);
    }

    #[tokio::test]
    async fn test_create_failure_skips_polling() {
        let h = Harness::new(FakeStore::new().failing_create());
        let dw = build_workspace(&h.config, 1);

        let err = h.lifecycle().start(&dw).await.unwrap_err();

        assert!(matches!(err, Error::KubeError(kube::Error::Api(ref ae)) if ae.code == 403));
        assert!(err.is_cluster_error());
        assert_eq!(h.store.gets(), 0);
    }

    #[tokio::test]
    async fn test_delete_then_await_deleted() {
        let h = Harness::new(FakeStore::new());
        let dw = build_workspace(&h.config, 1);
        let lifecycle = h.lifecycle();

        let running = lifecycle.start(&dw).await.unwrap();
        lifecycle.delete(&running).await.unwrap();
        lifecycle
            .await_deleted(&WorkspaceKey::of(&running))
            .await
            .unwrap();

        let key = WorkspaceKey::new("timing-test", "timing-test");
        assert_eq!(
            h.store.calls(),
            vec![
                Call::Create(key.clone(), 3),
                Call::Get(key.clone()),
                Call::Delete(key.clone()),
                Call::Get(key),
            ]
        );
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_await_deleted_waits_for_finalizers() {
        let h = Harness::new(FakeStore::new().with_finalizer_delay(2));
        let dw = build_workspace(&h.config, 1);
        let lifecycle = h.lifecycle();

        let running = lifecycle.start(&dw).await.unwrap();
        lifecycle.delete(&running).await.unwrap();
        assert!(!h.store.is_empty());

        lifecycle
            .await_deleted(&WorkspaceKey::of(&running))
            .await
            .unwrap();

        // one fetch to reach Running, then two while terminating and one once gone
        assert_eq!(h.store.gets(), 4);
        assert_eq!(h.sleeper.sleeps().len(), 2);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_await_deleted_retries_fetch_errors_without_sleeping() {
        let h = Harness::new(
            FakeStore::with_script([
                Fetch::Phase("Running"),
                Fetch::Error("etcdserver: leader changed"),
                Fetch::Error("etcdserver: leader changed"),
            ])
            .with_finalizer_delay(1),
        );
        let dw = build_workspace(&h.config, 1);
        let lifecycle = h.lifecycle();

        let running = lifecycle.start(&dw).await.unwrap();
        lifecycle.delete(&running).await.unwrap();
        lifecycle
            .await_deleted(&WorkspaceKey::of(&running))
            .await
            .unwrap();

        // two failed fetches, one sighting while terminating, then gone
        assert_eq!(h.store.gets(), 5);
        assert_eq!(h.sleeper.sleeps().len(), 1);
        assert_eq!(
            h.metrics.fetch_errors.load(std::sync::atomic::Ordering::Relaxed),
            2
        );
    }

    #[tokio::test]
    async fn test_await_deleted_fetch_error_limit() {
        let mut h = Harness::new(
            FakeStore::with_script([
                Fetch::Phase("Running"),
                Fetch::Error("timeout"),
                Fetch::Error("timeout"),
                Fetch::Error("timeout"),
            ])
            .with_finalizer_delay(1),
        );
        h.config.max_fetch_errors = 2;
        let dw = build_workspace(&h.config, 1);
        let lifecycle = h.lifecycle();

        let running = lifecycle.start(&dw).await.unwrap();
        lifecycle.delete(&running).await.unwrap();
        let err = lifecycle
            .await_deleted(&WorkspaceKey::of(&running))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::FetchRetriesExhausted { attempts: 3, .. }
        ));
        assert!(err.is_cluster_error());
        assert_eq!(h.store.gets(), 4);
        assert!(h.sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_await_deleted_gives_up_on_stuck_finalizer() {
        let mut h = Harness::new(FakeStore::new().with_finalizer_delay(10));
        h.config.max_deletion_polls = 3;
        let dw = build_workspace(&h.config, 1);
        let lifecycle = h.lifecycle();

        let running = lifecycle.start(&dw).await.unwrap();
        lifecycle.delete(&running).await.unwrap();
        let err = lifecycle
            .await_deleted(&WorkspaceKey::of(&running))
            .await
            .unwrap_err();

        match err {
            Error::DeletionTimeout { key, polls } => {
                assert_eq!(key, "timing-test/timing-test");
                assert_eq!(polls, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // one fetch to reach Running, four while terminating
        assert_eq!(h.store.gets(), 5);
        assert_eq!(h.sleeper.sleeps().len(), 3);
    }
}
