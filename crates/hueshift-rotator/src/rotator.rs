//! Core rotation cycle for one resource

use crate::{lock, Failure, FailureClassifier, RotationError, RotationMetrics, SharedPool, Verdict};
use hueshift_domain::traits::{AssetFetcher, ResourceApplier};
use hueshift_domain::{
    ApplyError, Asset, FetchError, PersistedCursor, RateLimitSignal, ResourceKind, RotationConfig,
    SelectionMode, TaskState, HUE_RAMP, MAX_INTERVAL,
};
use hueshift_store::{AssetStorage, ConfigStore};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Shared handle to a [`Rotator`], used by the host for manual operations
pub type RotationHandle = Arc<Rotator>;

/// Current timestamp in seconds since Unix epoch
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// External collaborators shared by every rotation
#[derive(Clone)]
pub struct Collaborators {
    /// Pushes values to the remote resource
    pub applier: Arc<dyn ResourceApplier>,

    /// Resolves remote assets to bytes
    pub fetcher: Arc<dyn AssetFetcher>,

    /// Failure policy and escalation path
    pub classifier: Arc<FailureClassifier>,
}

/// Result of one commit cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The asset is now live
    Applied(Asset),

    /// The pool was empty; nothing was applied
    Skipped,

    /// The attempt failed but the asset stays in the pool
    Retained {
        /// Asset that was attempted
        asset: Asset,
        /// Why it failed
        failure: Failure,
    },

    /// The attempt failed and the asset was removed from the pool
    Evicted {
        /// Asset that was removed
        asset: Asset,
        /// Why it failed
        failure: Failure,
    },

    /// The upstream is throttling; the operator was notified
    Escalated {
        /// Asset that was attempted
        asset: Asset,
        /// The rate-limit failure
        failure: Failure,
    },
}

/// Result of one flourish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlourishOutcome {
    /// Every color was applied
    Completed,

    /// Cancellation arrived between two steps
    Cancelled,

    /// A step failed; the remaining steps were skipped
    Aborted(Failure),
}

/// Why a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    Elapsed,
    Triggered,
    Cancelled,
}

/// The commit cycle of one rotating resource
///
/// A `Rotator` owns everything one rotation needs: its pool, its timing,
/// its metrics, and the collaborators it applies through. The loop that
/// drives it on a schedule lives in [`crate::RotationTask`]; manual
/// operations go through a [`RotationHandle`].
///
/// Commits and flourishes of one rotator never overlap: both run under an
/// internal cycle lock.
///
/// # Examples
///
/// ```no_run
/// use hueshift_domain::{hue_ramp, ResourceKind, RotationConfig};
/// use hueshift_rotator::{AssetPool, Collaborators, Rotator};
/// use hueshift_store::ConfigStore;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn run(collaborators: Collaborators) -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(ConfigStore::open("config.json")?);
/// let rotator = Rotator::new(
///     ResourceKind::RoleColor,
///     RotationConfig::new(Duration::from_secs(3600)),
///     AssetPool::cursor(hue_ramp()).shared(),
///     store,
///     collaborators,
/// );
///
/// let outcome = rotator.commit().await;
/// println!("{:?}", outcome);
/// # Ok(())
/// # }
/// ```
pub struct Rotator {
    resource: ResourceKind,
    pool: SharedPool,
    config: Mutex<RotationConfig>,
    store: Arc<ConfigStore>,
    storage: Option<AssetStorage>,
    collaborators: Collaborators,
    metrics: Mutex<RotationMetrics>,
    committed: Mutex<Option<Asset>>,
    state: watch::Sender<TaskState>,
    wake: Notify,
    cycle: tokio::sync::Mutex<()>,
}

impl Rotator {
    /// Create a rotator, restoring the persisted cursor of cursor-mode pools
    ///
    /// A persisted cursor beyond the end of the pool is reset to 0; an
    /// unreadable one is ignored. Both are logged.
    pub fn new(
        resource: ResourceKind,
        config: RotationConfig,
        pool: SharedPool,
        store: Arc<ConfigStore>,
        collaborators: Collaborators,
    ) -> Self {
        let committed = restore_cursor(resource, &pool, &store);
        let (state, _) = watch::channel(TaskState::Stopped);

        Self {
            resource,
            pool,
            config: Mutex::new(config),
            store,
            storage: None,
            collaborators,
            metrics: Mutex::new(RotationMetrics::new()),
            committed: Mutex::new(committed),
            state,
            wake: Notify::new(),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Attach the directory backing this rotation's stored assets
    pub fn with_storage(mut self, storage: AssetStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Resource this rotator drives
    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    /// The pool, for intake to append to
    pub fn pool(&self) -> SharedPool {
        Arc::clone(&self.pool)
    }

    /// Snapshot of the current timing configuration
    pub fn config(&self) -> RotationConfig {
        lock(&self.config).clone()
    }

    /// Current phase
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Snapshot of the counters
    pub fn metrics(&self) -> RotationMetrics {
        lock(&self.metrics).clone()
    }

    /// Snapshot of the pool's items
    pub fn assets(&self) -> Vec<Asset> {
        lock(&self.pool).items().to_vec()
    }

    /// Change the interval, persisting it first
    ///
    /// A wait already in progress keeps its original deadline; the new
    /// interval applies from the next wait. Zero and anything above
    /// [`MAX_INTERVAL`] are rejected without touching the store.
    pub fn set_interval(&self, interval: Duration) -> Result<(), RotationError> {
        if interval.is_zero() {
            return Err(RotationError::InvalidInterval(
                "interval must be greater than zero".to_string(),
            ));
        }
        if interval > MAX_INTERVAL {
            return Err(RotationError::InvalidInterval(format!(
                "interval must be at most {} days",
                MAX_INTERVAL.as_secs() / 86_400
            )));
        }

        self.store.set_duration(self.resource.interval_key(), interval)?;
        lock(&self.config).interval = interval;
        tracing::info!("{} interval set to {:?}", self.resource, interval);
        Ok(())
    }

    /// End the current wait early and commit
    ///
    /// If no wait is in progress, the next one ends immediately.
    pub fn trigger_now(&self) {
        tracing::debug!("Manual commit requested for {}", self.resource);
        self.wake.notify_one();
    }

    /// Remove `asset` from the pool and, if it is stored, from disk
    ///
    /// Idempotent. Returns whether anything was removed.
    pub fn delete_asset(&self, asset: &Asset) -> Result<bool, RotationError> {
        let evicted = lock(&self.pool).evict(asset);

        let deleted = match (asset, &self.storage) {
            (Asset::Stored(path), Some(storage)) => storage.delete(path)?,
            _ => false,
        };

        if evicted || deleted {
            tracing::info!("Deleted {} from {}", asset, self.resource);
        }
        Ok(evicted || deleted)
    }

    /// Replace the pool's items; returns the new pool size
    pub fn refresh(&self, items: Vec<Asset>) -> usize {
        let mut pool = lock(&self.pool);
        pool.replace_items(items);
        tracing::info!("Refreshed {} pool: {} assets", self.resource, pool.len());
        pool.len()
    }

    /// Reload the pool from the storage directory
    ///
    /// Rotations without storage keep their pool unchanged.
    pub fn refresh_from_storage(&self) -> Result<usize, RotationError> {
        let Some(storage) = &self.storage else {
            return Ok(lock(&self.pool).len());
        };
        let items = storage.list()?.into_iter().map(Asset::Stored).collect();
        Ok(self.refresh(items))
    }

    /// Run one commit cycle: select, resolve, apply, persist or classify
    ///
    /// Never returns an error; every failure is classified and reflected
    /// in the outcome and the metrics.
    pub async fn commit(&self) -> CommitOutcome {
        let _cycle = self.cycle.lock().await;
        let previous = self.state.send_replace(TaskState::Committing);

        let outcome = self.run_commit().await;
        lock(&self.metrics).record_outcome(&outcome);

        self.state.send_replace(previous);
        outcome
    }

    async fn run_commit(&self) -> CommitOutcome {
        let selection = lock(&self.pool).select();
        let Some(selection) = selection else {
            tracing::info!("No {} assets available; skipping cycle", self.resource);
            return CommitOutcome::Skipped;
        };
        let asset = selection.asset;

        match self.apply(&asset).await {
            Ok(()) => {
                tracing::info!("Applied {} to {}", asset, self.resource);
                self.persist_cursor();
                *lock(&self.committed) = Some(asset.clone());
                CommitOutcome::Applied(asset)
            }
            Err(failure) => self.handle_failure(asset, failure).await,
        }
    }

    async fn apply(&self, asset: &Asset) -> Result<(), Failure> {
        let applier = &self.collaborators.applier;
        match (self.resource, asset) {
            (ResourceKind::RoleColor, Asset::Color(color)) => {
                applier.apply_color(*color).await.map_err(Failure::Apply)
            }
            (ResourceKind::Banner, image) if image.is_image() => {
                let bytes = self.resolve(image).await.map_err(Failure::Fetch)?;
                applier.apply_banner(&bytes).await.map_err(Failure::Apply)
            }
            (ResourceKind::Icon, image) if image.is_image() => {
                let bytes = self.resolve(image).await.map_err(Failure::Fetch)?;
                applier.apply_icon(&bytes).await.map_err(Failure::Apply)
            }
            (resource, asset) => Err(Failure::Apply(ApplyError::ContentInvalid(format!(
                "{} cannot be applied to {}",
                asset, resource
            )))),
        }
    }

    async fn resolve(&self, asset: &Asset) -> Result<Vec<u8>, FetchError> {
        match asset {
            Asset::Remote(url) => self.collaborators.fetcher.fetch(url).await,
            Asset::Stored(path) => {
                let Some(storage) = self.storage.clone() else {
                    return Err(FetchError::Storage(format!(
                        "{}: no storage directory attached",
                        path.display()
                    )));
                };
                let path = path.clone();
                tokio::task::spawn_blocking(move || storage.read(&path))
                    .await
                    .map_err(|e| FetchError::Storage(e.to_string()))?
                    .map_err(|e| FetchError::Storage(e.to_string()))
            }
            Asset::Color(_) => Err(FetchError::Storage("colors have no bytes".to_string())),
        }
    }

    fn persist_cursor(&self) {
        let (mode, position) = {
            let pool = lock(&self.pool);
            (pool.mode(), pool.position())
        };
        let (SelectionMode::Cursor, Some(index)) = (mode, position) else {
            return;
        };

        let cursor = PersistedCursor {
            resource_id: self.resource,
            index,
            updated_at: current_timestamp(),
        };
        if let Err(e) = self.store.save_cursor(&cursor) {
            // The value is live already; a stale cursor only replays it after a restart
            tracing::error!("Failed to persist {} cursor: {}", self.resource, e);
        }
    }

    async fn handle_failure(&self, asset: Asset, failure: Failure) -> CommitOutcome {
        match FailureClassifier::classify(&failure) {
            Verdict::Retain => {
                tracing::warn!("{} failed on {} ({}); keeping it", asset, self.resource, failure);
                CommitOutcome::Retained { asset, failure }
            }
            Verdict::Evict => {
                if lock(&self.pool).evict(&asset) {
                    tracing::warn!("{} failed on {} ({}); evicted", asset, self.resource, failure);
                    CommitOutcome::Evicted { asset, failure }
                } else {
                    tracing::warn!("{} failed on {} ({})", asset, self.resource, failure);
                    CommitOutcome::Retained { asset, failure }
                }
            }
            Verdict::Escalate => {
                self.escalate(&failure).await;
                CommitOutcome::Escalated { asset, failure }
            }
        }
    }

    async fn escalate(&self, failure: &Failure) {
        let retry_after = match failure {
            Failure::Apply(ApplyError::RateLimited { retry_after }) => *retry_after,
            _ => None,
        };
        let signal = RateLimitSignal::from_apply(self.resource.as_str(), retry_after);
        self.collaborators.classifier.escalate(&signal).await;
    }

    /// Spin through the full color ramp, one step every
    /// `flourish_duration / HUE_RAMP.len()`
    ///
    /// Flourish values are transient: nothing is persisted and no pool is
    /// touched. A failed step aborts the flourish; a rate limit is also
    /// escalated.
    pub async fn flourish(&self, cancel: &CancellationToken) -> FlourishOutcome {
        let _cycle = self.cycle.lock().await;
        self.flourish_locked(cancel).await
    }

    /// A flourish between two commits
    ///
    /// Unless cancelled, the last committed color is applied again
    /// afterwards, so the burst leaves no lasting trace on the resource.
    pub async fn burst(&self, cancel: &CancellationToken) -> FlourishOutcome {
        let _cycle = self.cycle.lock().await;
        let outcome = self.flourish_locked(cancel).await;
        if outcome != FlourishOutcome::Cancelled {
            self.reapply_committed().await;
        }
        outcome
    }

    async fn flourish_locked(&self, cancel: &CancellationToken) -> FlourishOutcome {
        let previous = self.state.send_replace(TaskState::Flourishing);
        let step = self.config().flourish_step(HUE_RAMP.len());

        let outcome = self.run_flourish(step, cancel).await;
        match &outcome {
            FlourishOutcome::Completed => lock(&self.metrics).record_flourish(),
            FlourishOutcome::Cancelled => tracing::debug!("{} flourish cancelled", self.resource),
            FlourishOutcome::Aborted(failure) => {
                tracing::warn!("{} flourish aborted: {}", self.resource, failure);
            }
        }

        self.state.send_replace(previous);
        outcome
    }

    async fn run_flourish(&self, step: Duration, cancel: &CancellationToken) -> FlourishOutcome {
        for (i, color) in HUE_RAMP.iter().enumerate() {
            if let Err(e) = self.collaborators.applier.apply_color(*color).await {
                let failure = Failure::Apply(e);
                if FailureClassifier::classify(&failure) == Verdict::Escalate {
                    self.escalate(&failure).await;
                    lock(&self.metrics).record_escalation();
                }
                return FlourishOutcome::Aborted(failure);
            }

            if i + 1 < HUE_RAMP.len() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return FlourishOutcome::Cancelled,
                    _ = tokio::time::sleep(step) => {}
                }
            }
        }
        FlourishOutcome::Completed
    }

    async fn reapply_committed(&self) {
        let committed = lock(&self.committed).clone();
        let Some(Asset::Color(color)) = committed else {
            return;
        };
        if let Err(e) = self.collaborators.applier.apply_color(color).await {
            tracing::warn!("Could not restore {} {} after a burst: {}", self.resource, color, e);
        }
    }

    /// Sleep until `deadline`, a manual trigger, or cancellation
    pub(crate) async fn wait_until(&self, deadline: Instant, cancel: &CancellationToken) -> Wake {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Wake::Cancelled,
            _ = self.wake.notified() => Wake::Triggered,
            _ = tokio::time::sleep_until(deadline) => Wake::Elapsed,
        }
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.send_replace(state);
    }
}

/// Restore the persisted cursor; returns the asset it says was committed last
fn restore_cursor(resource: ResourceKind, pool: &SharedPool, store: &ConfigStore) -> Option<Asset> {
    let mut pool = lock(pool);
    if pool.mode() != SelectionMode::Cursor {
        return None;
    }

    match store.load_cursor(resource) {
        Ok(Some(cursor)) => {
            let applied = pool.restore_cursor(cursor.index);
            if applied != Some(cursor.index) {
                tracing::warn!(
                    "Persisted {} cursor {} is out of range for {} items; using {:?}",
                    resource,
                    cursor.index,
                    pool.len(),
                    applied
                );
                return None;
            }
            tracing::debug!("Restored {} cursor at {}", resource, cursor.index);
            let last = cursor.index.checked_sub(1).unwrap_or(pool.len().saturating_sub(1));
            pool.items().get(last).cloned()
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable {} cursor: {}", resource, e);
            None
        }
    }
}
