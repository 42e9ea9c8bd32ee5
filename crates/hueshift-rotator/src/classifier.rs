//! Failure classification and operator escalation

use hueshift_domain::traits::OperatorNotifier;
use hueshift_domain::{ApplyError, FetchError, RateLimitSignal};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A failed commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The asset's bytes could not be obtained
    Fetch(FetchError),

    /// The remote resource refused the value
    Apply(ApplyError),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Fetch(e) => write!(f, "fetch failed: {}", e),
            Failure::Apply(e) => write!(f, "apply failed: {}", e),
        }
    }
}

/// What to do with the asset after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the asset; it may succeed later
    Retain,

    /// Remove the asset from its pool for good
    Evict,

    /// Notify the operator and leave the pool alone
    Escalate,
}

/// Maps failures to verdicts and raises rate-limit escalations
///
/// One classifier is shared by every task so escalations go through a
/// single notifier. Each rate-limit occurrence produces exactly one
/// notification; there is no deduplication window.
pub struct FailureClassifier {
    notifier: Arc<dyn OperatorNotifier>,
    escalations: AtomicU64,
}

impl FailureClassifier {
    /// Create a classifier that escalates through `notifier`
    pub fn new(notifier: Arc<dyn OperatorNotifier>) -> Self {
        Self {
            notifier,
            escalations: AtomicU64::new(0),
        }
    }

    /// Verdict for `failure`
    ///
    /// - fetch failures evict (a dead link never comes back)
    /// - content-invalid rejections retain
    /// - rate limits escalate
    /// - every other apply failure evicts
    ///
    /// # Examples
    ///
    /// ```
    /// use hueshift_domain::ApplyError;
    /// use hueshift_rotator::{Failure, FailureClassifier, Verdict};
    ///
    /// let too_small = Failure::Apply(ApplyError::ContentInvalid("too small".into()));
    /// assert_eq!(FailureClassifier::classify(&too_small), Verdict::Retain);
    /// ```
    pub fn classify(failure: &Failure) -> Verdict {
        match failure {
            Failure::Fetch(_) => Verdict::Evict,
            Failure::Apply(ApplyError::ContentInvalid(_)) => Verdict::Retain,
            Failure::Apply(ApplyError::RateLimited { .. }) => Verdict::Escalate,
            Failure::Apply(ApplyError::Rejected { .. } | ApplyError::Transport(_)) => Verdict::Evict,
        }
    }

    /// Notify the operator about a rate limit
    ///
    /// Used both for rate-limited applies and for signals the host observes
    /// outside any task.
    pub async fn escalate(&self, signal: &RateLimitSignal) {
        self.escalations.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "Rate limit observed from {} (status {}, retry after {:?})",
            signal.source,
            signal.status,
            signal.retry_after
        );
        self.notifier.notify_operator(&escalation_message(signal)).await;
    }

    /// Number of escalations raised so far
    pub fn escalations(&self) -> u64 {
        self.escalations.load(Ordering::Relaxed)
    }
}

fn escalation_message(signal: &RateLimitSignal) -> String {
    let mut message = format!(
        "The bot has hit a rate limit (status {}, source: {}).",
        signal.status, signal.source
    );
    if let Some(retry_after) = signal.retry_after {
        message.push_str(&format!(" Retry after {:.1}s.", retry_after.as_secs_f64()));
    }
    message
}
