//! Background loop driving a [`Rotator`] on its interval

use crate::rotator::Wake;
use crate::{flourish_offsets, FlourishOutcome, RotationError, RotationHandle, Rotator};
use hueshift_domain::{ResourceKind, TaskState, MAX_INTERVAL};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Periodic rotation of one resource
///
/// Each cycle waits one interval (firing any extra flourish bursts on the
/// way), plays the pre-commit flourish if enabled, then commits. Cycles
/// never overlap. The interval is read when a wait starts, so changing it
/// only affects later waits.
///
/// # Examples
///
/// ```no_run
/// use hueshift_rotator::{RotationTask, Rotator};
///
/// # async fn run(rotator: Rotator) -> Result<(), Box<dyn std::error::Error>> {
/// let mut task = RotationTask::new(rotator);
/// task.start()?;
///
/// tokio::signal::ctrl_c().await?;
/// task.stop().await;
/// println!("{}", task.handle().metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct RotationTask {
    rotator: RotationHandle,
    running: Option<RunningLoop>,
}

struct RunningLoop {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl RotationTask {
    /// Wrap a rotator; the loop is not started
    pub fn new(rotator: Rotator) -> Self {
        Self {
            rotator: Arc::new(rotator),
            running: None,
        }
    }

    /// Resource this task drives
    pub fn resource(&self) -> ResourceKind {
        self.rotator.resource()
    }

    /// Shared handle for manual operations
    pub fn handle(&self) -> RotationHandle {
        Arc::clone(&self.rotator)
    }

    /// Whether the loop is running
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.join.is_finished())
    }

    /// Spawn the loop on the current tokio runtime
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::AlreadyRunning`] if the loop is running.
    pub fn start(&mut self) -> Result<(), RotationError> {
        if self.is_running() {
            return Err(RotationError::AlreadyRunning(self.resource()));
        }

        let cancel = CancellationToken::new();
        let rotator = Arc::clone(&self.rotator);
        let join = tokio::spawn(run_loop(rotator, cancel.clone()));
        self.running = Some(RunningLoop { cancel, join });
        Ok(())
    }

    /// Stop the loop and wait for it to exit
    ///
    /// Waits and flourish steps end immediately; a commit already in
    /// progress finishes first. Stopping a stopped task is a no-op, and a
    /// stopped task can be started again.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.cancel.cancel();
        if let Err(e) = running.join.await {
            tracing::error!("{} rotation loop ended abnormally: {}", self.resource(), e);
        }
        self.rotator.set_state(TaskState::Stopped);
    }
}

async fn run_loop(rotator: RotationHandle, cancel: CancellationToken) {
    let resource = rotator.resource();
    tracing::info!(
        "{} rotation started (interval: {:?})",
        resource,
        rotator.config().interval
    );

    'cycle: loop {
        rotator.set_state(TaskState::Waiting);
        let config = rotator.config();
        let started = Instant::now();

        let offsets = if config.flourish_enabled {
            flourish_offsets(config.interval, config.flourish_bursts, &mut rand::rng())
        } else {
            Vec::new()
        };

        let mut triggered = false;
        for offset in offsets {
            match rotator.wait_until(deadline(started, offset), &cancel).await {
                Wake::Cancelled => break 'cycle,
                Wake::Triggered => {
                    triggered = true;
                    break;
                }
                Wake::Elapsed => {}
            }
            tracing::debug!("{} flourish burst at {:?}", resource, offset);
            if rotator.burst(&cancel).await == FlourishOutcome::Cancelled {
                break 'cycle;
            }
            rotator.set_state(TaskState::Waiting);
        }

        if !triggered && rotator.wait_until(deadline(started, config.interval), &cancel).await == Wake::Cancelled {
            break 'cycle;
        }

        if config.flourish_enabled && rotator.flourish(&cancel).await == FlourishOutcome::Cancelled {
            break 'cycle;
        }

        let outcome = rotator.commit().await;
        tracing::debug!("{} cycle finished: {:?}", resource, outcome);
    }

    rotator.set_state(TaskState::Stopped);
    tracing::info!(
        "{} rotation stopped. Final metrics:\n{}",
        resource,
        rotator.metrics().summary()
    );
}

/// `started + after`, saturating at [`MAX_INTERVAL`] past `started` when
/// the sum is not representable
fn deadline(started: Instant, after: Duration) -> Instant {
    started
        .checked_add(after)
        .unwrap_or_else(|| started + MAX_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetPool, Collaborators, FailureClassifier};
    use hueshift_domain::{Asset, Color, RotationConfig, HUE_RAMP};
    use hueshift_remote::mock::{AppliedValue, MockApplier, MockFetcher, RecordingNotifier};
    use hueshift_store::ConfigStore;
    use serde_json::Map;
    use std::time::Duration;
    use tempfile::TempDir;

    const RED: Color = Color::rgb(255, 0, 0);
    const GREEN: Color = Color::rgb(0, 255, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn color_task(dir: &TempDir, applier: Arc<MockApplier>, config: RotationConfig) -> RotationTask {
        let store = ConfigStore::create(dir.path().join("config.json"), Map::new()).unwrap();
        let collaborators = Collaborators {
            applier,
            fetcher: Arc::new(MockFetcher::new()),
            classifier: Arc::new(FailureClassifier::new(Arc::new(RecordingNotifier::new()))),
        };
        let pool = AssetPool::cursor(vec![Asset::Color(RED), Asset::Color(GREEN), Asset::Color(BLUE)]);
        RotationTask::new(Rotator::new(
            ResourceKind::RoleColor,
            config,
            pool.shared(),
            Arc::new(store),
            collaborators,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_commits_once_per_interval() {
        let dir = TempDir::new().unwrap();
        let applier = Arc::new(MockApplier::new());
        let mut task = color_task(&dir, applier.clone(), RotationConfig::new(Duration::from_secs(10)));

        task.start().unwrap();
        tokio::time::sleep(Duration::from_secs(35)).await;

        assert_eq!(
            applier.applied(),
            vec![
                AppliedValue::Color(RED),
                AppliedValue::Color(GREEN),
                AppliedValue::Color(BLUE)
            ]
        );

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(applier.applied().last(), Some(&AppliedValue::Color(RED)));
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_applies_to_next_wait() {
        let dir = TempDir::new().unwrap();
        let applier = Arc::new(MockApplier::new());
        let mut task = color_task(&dir, applier.clone(), RotationConfig::new(Duration::from_secs(100)));
        task.start().unwrap();

        tokio::time::sleep(Duration::from_secs(50)).await;
        task.handle().set_interval(Duration::from_secs(10)).unwrap();

        // The wait in progress keeps its 100s deadline
        tokio::time::sleep(Duration::from_secs(49)).await;
        assert_eq!(applier.call_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(applier.call_count(), 1);

        // The next wait uses the new interval: second commit at t=110
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(applier.call_count(), 2);
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut task = color_task(
            &dir,
            Arc::new(MockApplier::new()),
            RotationConfig::new(Duration::from_secs(60)),
        );

        task.start().unwrap();
        assert!(matches!(task.start(), Err(RotationError::AlreadyRunning(ResourceKind::RoleColor))));

        task.stop().await;
        assert!(!task.is_running());
        assert_eq!(task.handle().state(), TaskState::Stopped);

        task.start().unwrap();
        assert!(task.is_running());
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_wait_without_commit() {
        let dir = TempDir::new().unwrap();
        let applier = Arc::new(MockApplier::new());
        let mut task = color_task(&dir, applier.clone(), RotationConfig::new(Duration::from_secs(3600)));

        task.start().unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(task.handle().state(), TaskState::Waiting);

        task.stop().await;
        assert_eq!(applier.call_count(), 0);
        assert_eq!(task.handle().state(), TaskState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_now_commits_early() {
        let dir = TempDir::new().unwrap();
        let applier = Arc::new(MockApplier::new());
        let mut task = color_task(&dir, applier.clone(), RotationConfig::new(Duration::from_secs(3600)));

        task.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        task.handle().trigger_now();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(applier.applied(), vec![AppliedValue::Color(RED)]);
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_flourish_precedes_commit() {
        let dir = TempDir::new().unwrap();
        let applier = Arc::new(MockApplier::new());
        let config = RotationConfig::new(Duration::from_secs(60)).with_flourish(Duration::from_secs(6));
        let mut task = color_task(&dir, applier.clone(), config);

        task.start().unwrap();
        tokio::time::sleep(Duration::from_secs(70)).await;
        task.stop().await;

        let applied = applier.applied();
        assert_eq!(applied.len(), HUE_RAMP.len() + 1);
        assert_eq!(applied[0], AppliedValue::Color(HUE_RAMP[0]));
        assert_eq!(applied.last(), Some(&AppliedValue::Color(RED)));
        assert_eq!(task.handle().metrics().flourishes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bursts_do_not_commit() {
        let dir = TempDir::new().unwrap();
        let applier = Arc::new(MockApplier::new());
        let config = RotationConfig::new(Duration::from_secs(600))
            .with_flourish(Duration::from_secs(3))
            .with_bursts(2);
        let mut task = color_task(&dir, applier.clone(), config);

        task.start().unwrap();
        tokio::time::sleep(Duration::from_secs(610)).await;
        let handle = task.handle();

        // Two bursts plus the pre-commit flourish, but a single commit.
        // Nothing was committed before the bursts, so nothing is restored.
        assert_eq!(handle.metrics().commits, 1);
        assert_eq!(applier.call_count(), 3 * HUE_RAMP.len() + 1);
        assert_eq!(handle.metrics().flourishes, 3);
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_restores_committed_color() {
        let dir = TempDir::new().unwrap();
        let applier = Arc::new(MockApplier::new());
        let config = RotationConfig::new(Duration::from_secs(600))
            .with_flourish(Duration::from_secs(36))
            .with_bursts(2);
        let mut task = color_task(&dir, applier.clone(), config);
        task.handle().commit().await;

        task.start().unwrap();
        // The first burst lands before t=200 and lasts 35s; the second
        // comes after t=400
        tokio::time::sleep(Duration::from_secs(300)).await;

        let applied = applier.applied();
        assert_eq!(applied.len(), 1 + HUE_RAMP.len() + 1);
        assert_eq!(applied.last(), Some(&AppliedValue::Color(RED)));
        assert_eq!(task.handle().metrics().commits, 1);
        assert_eq!(task.handle().metrics().flourishes, 1);
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_deadline_keeps_loop_alive() {
        let dir = TempDir::new().unwrap();
        let applier = Arc::new(MockApplier::new());
        let mut task = color_task(&dir, applier.clone(), RotationConfig::new(Duration::MAX));

        task.start().unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(task.is_running());
        assert_eq!(task.handle().state(), TaskState::Waiting);

        task.handle().trigger_now();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(applier.applied(), vec![AppliedValue::Color(RED)]);
        assert!(task.is_running());
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_interval_is_rejected_while_running() {
        let dir = TempDir::new().unwrap();
        let applier = Arc::new(MockApplier::new());
        let mut task = color_task(&dir, applier.clone(), RotationConfig::new(Duration::from_secs(10)));
        task.start().unwrap();

        let huge = Duration::try_from_secs_f64(1e19).unwrap();
        assert!(matches!(
            task.handle().set_interval(huge),
            Err(RotationError::InvalidInterval(_))
        ));

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(task.is_running());
        assert_eq!(applier.call_count(), 2);
        task.stop().await;
    }

    #[tokio::test]
    async fn test_deadline_saturates() {
        let now = Instant::now();
        assert_eq!(deadline(now, Duration::from_secs(5)), now + Duration::from_secs(5));
        assert_eq!(deadline(now, Duration::MAX), now + MAX_INTERVAL);
    }
}
