//! Intake configuration

use hueshift_domain::{CapabilityId, ChannelId, ResourceKind};
use hueshift_rotator::SharedPool;
use hueshift_store::AssetStorage;
use std::time::Duration;

/// Timing rules shared by every intake channel
///
/// # Examples
///
/// ```
/// use hueshift_gatekeeper::IntakeConfig;
/// use std::time::Duration;
///
/// let config = IntakeConfig::default();
/// assert_eq!(config.fetch_timeout, Duration::from_secs(15));
/// assert_eq!(config.notice_ttl(true), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    /// Upper bound on one attachment download
    pub fetch_timeout: Duration,

    /// How long notices stay up in write-restricted channels
    pub restricted_notice_ttl: Duration,

    /// How long notices stay up in open channels
    pub open_notice_ttl: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            restricted_notice_ttl: Duration::from_secs(5),
            open_notice_ttl: Duration::from_secs(10),
        }
    }
}

impl IntakeConfig {
    /// Override the download timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Notice lifetime for a channel
    pub fn notice_ttl(&self, restricted: bool) -> Duration {
        if restricted {
            self.restricted_notice_ttl
        } else {
            self.open_notice_ttl
        }
    }
}

/// A channel feeding one rotation's pool
#[derive(Debug, Clone)]
pub struct IntakeTarget {
    /// Rotation the accepted assets join
    pub resource: ResourceKind,

    /// Channel watched for submissions
    pub channel: ChannelId,

    /// Capability a submitter must hold
    pub capability: CapabilityId,

    /// Only contributions may be posted here; anything else is removed
    pub restricted: bool,

    /// Submissions must mention the bot to be considered
    pub require_mention: bool,

    /// Pool receiving accepted assets
    pub pool: SharedPool,

    /// Where downloaded bytes are kept; without storage the attachment URL
    /// itself becomes the asset
    pub storage: Option<AssetStorage>,
}

impl IntakeTarget {
    /// An open channel where contributions must mention the bot; accepted
    /// images are downloaded into `storage`
    pub fn open(
        resource: ResourceKind,
        channel: ChannelId,
        capability: CapabilityId,
        pool: SharedPool,
        storage: AssetStorage,
    ) -> Self {
        Self {
            resource,
            channel,
            capability,
            restricted: false,
            require_mention: true,
            pool,
            storage: Some(storage),
        }
    }

    /// A write-restricted channel whose attachment URLs join the pool
    pub fn restricted(
        resource: ResourceKind,
        channel: ChannelId,
        capability: CapabilityId,
        pool: SharedPool,
    ) -> Self {
        Self {
            resource,
            channel,
            capability,
            restricted: true,
            require_mention: false,
            pool,
            storage: None,
        }
    }
}
