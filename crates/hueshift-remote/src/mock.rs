//! In-memory collaborators for deterministic testing
//!
//! None of these make network calls. Each records what it was asked to do
//! so tests can assert on it afterwards.

use async_trait::async_trait;
use hueshift_domain::traits::{
    AssetFetcher, Authorizer, ChannelModerator, OperatorNotifier, ResourceApplier,
};
use hueshift_domain::{ActorId, ApplyError, CapabilityId, ChannelId, Color, FetchError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Smallest byte prefix recognized as a PNG image
pub const SAMPLE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

/// Smallest byte prefix recognized as a JPEG image
pub const SAMPLE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A value accepted by [`MockApplier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedValue {
    /// Role color
    Color(Color),
    /// Banner image bytes
    Banner(Vec<u8>),
    /// Icon image bytes
    Icon(Vec<u8>),
}

/// Applier that records successful applies and replays scripted failures
///
/// # Examples
///
/// ```
/// use hueshift_domain::traits::ResourceApplier;
/// use hueshift_domain::{ApplyError, Color};
/// use hueshift_remote::mock::{AppliedValue, MockApplier};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let applier = MockApplier::new();
/// applier.push_failure(ApplyError::Transport("reset".into()));
///
/// assert!(applier.apply_color(Color::rgb(1, 2, 3)).await.is_err());
/// assert!(applier.apply_color(Color::rgb(1, 2, 3)).await.is_ok());
/// assert_eq!(applier.applied(), vec![AppliedValue::Color(Color::rgb(1, 2, 3))]);
/// assert_eq!(applier.call_count(), 2);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockApplier {
    failures: Mutex<VecDeque<ApplyError>>,
    persistent: Mutex<Option<ApplyError>>,
    applied: Mutex<Vec<AppliedValue>>,
    calls: Mutex<usize>,
}

impl MockApplier {
    /// Create an applier that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call with `error` (queued in order)
    pub fn push_failure(&self, error: ApplyError) {
        guard(&self.failures).push_back(error);
    }

    /// Fail every call with `error` until cleared with `None`
    pub fn fail_always(&self, error: Option<ApplyError>) {
        *guard(&self.persistent) = error;
    }

    /// Values applied successfully, in order
    pub fn applied(&self) -> Vec<AppliedValue> {
        guard(&self.applied).clone()
    }

    /// Number of apply calls, including failed ones
    pub fn call_count(&self) -> usize {
        *guard(&self.calls)
    }

    fn record(&self, value: AppliedValue) -> Result<(), ApplyError> {
        *guard(&self.calls) += 1;
        if let Some(error) = guard(&self.failures).pop_front() {
            return Err(error);
        }
        if let Some(error) = guard(&self.persistent).clone() {
            return Err(error);
        }
        guard(&self.applied).push(value);
        Ok(())
    }
}

#[async_trait]
impl ResourceApplier for MockApplier {
    async fn apply_color(&self, color: Color) -> Result<(), ApplyError> {
        self.record(AppliedValue::Color(color))
    }

    async fn apply_banner(&self, image: &[u8]) -> Result<(), ApplyError> {
        self.record(AppliedValue::Banner(image.to_vec()))
    }

    async fn apply_icon(&self, image: &[u8]) -> Result<(), ApplyError> {
        self.record(AppliedValue::Icon(image.to_vec()))
    }
}

/// Fetcher serving canned responses; unknown URLs answer 404
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Result<Vec<u8>, FetchError>>>,
    requested: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockFetcher {
    /// Create a fetcher with no responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep `delay` before answering each fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serve `bytes` for `url`
    pub fn insert(&self, url: &str, bytes: Vec<u8>) {
        guard(&self.responses).insert(url.to_string(), Ok(bytes));
    }

    /// Fail fetches of `url` with `error`
    pub fn fail(&self, url: &str, error: FetchError) {
        guard(&self.responses).insert(url.to_string(), Err(error));
    }

    /// URLs requested so far, in order
    pub fn requested(&self) -> Vec<String> {
        guard(&self.requested).clone()
    }
}

#[async_trait]
impl AssetFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        guard(&self.requested).push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        guard(&self.responses)
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status(404)))
    }
}

/// Notifier that keeps every operator message
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Create an empty notifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far
    pub fn messages(&self) -> Vec<String> {
        guard(&self.messages).clone()
    }
}

#[async_trait]
impl OperatorNotifier for RecordingNotifier {
    async fn notify_operator(&self, message: &str) {
        guard(&self.messages).push(message.to_string());
    }
}

/// Authorizer backed by a fixed set of grants
#[derive(Debug, Default, Clone)]
pub struct StaticAuthorizer {
    grants: HashSet<(ActorId, CapabilityId)>,
}

impl StaticAuthorizer {
    /// Create an authorizer that denies everyone
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `capability` to `actor`
    pub fn grant(mut self, actor: ActorId, capability: CapabilityId) -> Self {
        self.grants.insert((actor, capability));
        self
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(&self, actor: ActorId, capability: CapabilityId) -> bool {
        self.grants.contains(&(actor, capability))
    }
}

/// A notice posted through [`RecordingModerator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Channel it was posted in
    pub channel: ChannelId,
    /// Notice text
    pub text: String,
    /// How long it stays visible
    pub ttl: Option<Duration>,
}

/// Moderator that records removals and notices
#[derive(Debug, Default)]
pub struct RecordingModerator {
    removed: Mutex<Vec<(ChannelId, u64)>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingModerator {
    /// Create an empty moderator
    pub fn new() -> Self {
        Self::default()
    }

    /// Removed submissions as `(channel, message_id)`
    pub fn removed(&self) -> Vec<(ChannelId, u64)> {
        guard(&self.removed).clone()
    }

    /// Notices posted so far
    pub fn notices(&self) -> Vec<Notice> {
        guard(&self.notices).clone()
    }
}

#[async_trait]
impl ChannelModerator for RecordingModerator {
    async fn remove_submission(&self, channel: ChannelId, message_id: u64) {
        guard(&self.removed).push((channel, message_id));
    }

    async fn post_notice(&self, channel: ChannelId, text: &str, ttl: Option<Duration>) {
        guard(&self.notices).push(Notice {
            channel,
            text: text.to_string(),
            ttl,
        });
    }
}
