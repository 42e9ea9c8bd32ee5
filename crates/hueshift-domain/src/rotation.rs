//! Rotation module - scheduling parameters and persisted progress

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::ResourceKind;

/// Upper bound on extra flourish bursts scheduled inside one interval
pub const MAX_FLOURISH_BURSTS: u8 = 2;

/// Longest accepted interval (365 days)
///
/// Configured durations above it are rejected, which keeps every wait
/// deadline representable.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Consumption policy of an asset pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Walk the items in order, wrapping around; position is persisted
    Cursor,

    /// Every item once per traversal, in a fresh random order each time
    ShuffleBag,

    /// Uniform draw with replacement; failing items are evicted
    RandomWithEviction,
}

impl SelectionMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Cursor => "cursor",
            SelectionMode::ShuffleBag => "shuffle_bag",
            SelectionMode::RandomWithEviction => "random_with_eviction",
        }
    }
}

/// Timing parameters owned by one rotation task
///
/// Mutated only through the task's interval-update operation, which also
/// persists the new value.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationConfig {
    /// Time between commits
    pub interval: Duration,

    /// Run a flourish right before each commit
    pub flourish_enabled: bool,

    /// Total length of one flourish
    pub flourish_duration: Duration,

    /// Extra flourish bursts at random offsets inside the interval
    /// (clamped to [`MAX_FLOURISH_BURSTS`])
    pub flourish_bursts: u8,
}

impl RotationConfig {
    /// Create a configuration with the given interval and no flourish
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            flourish_enabled: false,
            flourish_duration: Duration::from_secs(6),
            flourish_bursts: 0,
        }
    }

    /// Enable the pre-commit flourish
    pub fn with_flourish(mut self, duration: Duration) -> Self {
        self.flourish_enabled = true;
        self.flourish_duration = duration;
        self
    }

    /// Schedule extra flourish bursts inside each interval
    pub fn with_bursts(mut self, bursts: u8) -> Self {
        self.flourish_bursts = bursts.min(MAX_FLOURISH_BURSTS);
        self
    }

    /// Delay between two flourish steps over a sequence of `len` values
    ///
    /// # Examples
    ///
    /// ```
    /// use hueshift_domain::RotationConfig;
    /// use std::time::Duration;
    ///
    /// let config = RotationConfig::new(Duration::from_secs(60))
    ///     .with_flourish(Duration::from_secs(9));
    /// assert_eq!(config.flourish_step(36), Duration::from_millis(250));
    /// ```
    pub fn flourish_step(&self, len: usize) -> Duration {
        if len == 0 {
            return Duration::ZERO;
        }
        self.flourish_duration / len as u32
    }
}

/// Durable counterpart of a cursor-mode pool position
///
/// `index` is the next value to apply, so a restart resumes where the last
/// successful commit left off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCursor {
    /// Resource this cursor belongs to
    pub resource_id: ResourceKind,

    /// Index of the next item to apply
    pub index: usize,

    /// When the cursor was written (seconds since Unix epoch)
    pub updated_at: u64,
}

/// Phase of a rotation task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Loop not running (never started, or stopped)
    Stopped,

    /// Sleeping until the next flourish or commit
    Waiting,

    /// Applying transient values before the commit
    Flourishing,

    /// Selecting, applying and persisting the next value
    Committing,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Stopped => "stopped",
            TaskState::Waiting => "waiting",
            TaskState::Flourishing => "flourishing",
            TaskState::Committing => "committing",
        };
        f.write_str(name)
    }
}
