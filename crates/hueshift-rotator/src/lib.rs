//! Hueshift Rotator
//!
//! Periodic rotation of server resources through pools of candidate values.
//!
//! # Overview
//!
//! Each rotating resource gets one independent task that:
//! - **Waits** its configured interval (optionally firing flourish bursts)
//! - **Flourishes**: spins the role through the full color ramp
//! - **Commits**: selects the next asset, applies it, and persists progress
//! - **Classifies failures**: retains, evicts, or escalates to the operator
//!
//! # Selection modes
//!
//! | Mode | Draw | Typical pool |
//! |------|------|--------------|
//! | **Cursor** | In order, wrapping; position persisted | Role colors |
//! | **Shuffle bag** | Each item once per traversal | Stored banners |
//! | **Random with eviction** | Uniform with replacement | Icon URLs |
//!
//! # Failure policy
//!
//! | Failure | Verdict |
//! |---------|---------|
//! | Fetch failed (dead link, unreadable file) | Evict |
//! | Content invalid (too small, too large) | Retain |
//! | Rate limited | Escalate to operator, no eviction |
//! | Any other apply failure | Evict |
//!
//! Colors are never evicted.
//!
//! # Usage
//!
//! ## One-time commit
//!
//! ```no_run
//! use hueshift_domain::{hue_ramp, ResourceKind};
//! use hueshift_rotator::{load_rotation_config, AssetPool, Collaborators, Rotator};
//! use hueshift_store::ConfigStore;
//! use std::sync::Arc;
//!
//! # async fn run(collaborators: Collaborators) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(ConfigStore::open("config.json")?);
//! let config = load_rotation_config(&store, ResourceKind::RoleColor)?;
//! let rotator = Rotator::new(
//!     ResourceKind::RoleColor,
//!     config,
//!     AssetPool::cursor(hue_ramp()).shared(),
//!     store,
//!     collaborators,
//! );
//!
//! println!("{:?}", rotator.commit().await);
//! # Ok(())
//! # }
//! ```
//!
//! ## Background task
//!
//! ```no_run
//! use hueshift_rotator::{RotationTask, Rotator};
//!
//! # async fn run(rotator: Rotator) -> Result<(), Box<dyn std::error::Error>> {
//! let mut task = RotationTask::new(rotator);
//! task.start()?;
//!
//! let handle = task.handle();
//! handle.trigger_now();
//!
//! tokio::signal::ctrl_c().await?;
//! task.stop().await;
//! println!("{}", handle.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Read from the JSON config store:
//!
//! ```json
//! {
//!   "color_change_interval": 3600,
//!   "banner_change_interval": 3600,
//!   "icon_change_interval": 20,
//!   "color_flourish_enabled": true,
//!   "color_flourish_duration": 6,
//!   "color_flourish_bursts": 2
//! }
//! ```

#![warn(missing_docs)]

mod classifier;
mod config;
mod error;
mod metrics;
mod pool;
mod rotator;
mod timing;
mod worker;

pub use classifier::{Failure, FailureClassifier, Verdict};
pub use config::{
    load_rotation_config, DEFAULT_FLOURISH_DURATION, FLOURISH_BURSTS_KEY, FLOURISH_DURATION_KEY,
    FLOURISH_ENABLED_KEY,
};
pub use error::RotationError;
pub use metrics::RotationMetrics;
pub use pool::{AssetPool, Selection, SharedPool};
pub use rotator::{Collaborators, CommitOutcome, FlourishOutcome, RotationHandle, Rotator};
pub use timing::flourish_offsets;
pub use worker::RotationTask;

use std::sync::{Mutex, MutexGuard};

/// Lock a std mutex, recovering the data if a holder panicked
///
/// Every critical section in this crate leaves its data consistent before
/// any operation that could panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
