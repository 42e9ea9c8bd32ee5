//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the rotation core and
//! infrastructure. Implementations live in `hueshift-remote`.

use async_trait::async_trait;
use std::time::Duration;

use crate::{ActorId, ApplyError, CapabilityId, ChannelId, Color, FetchError};

/// Sets the observable attributes of the shared remote entity
///
/// Implemented by the infrastructure layer (hueshift-remote)
#[async_trait]
pub trait ResourceApplier: Send + Sync {
    /// Set the role color
    async fn apply_color(&self, color: Color) -> Result<(), ApplyError>;

    /// Set the banner image
    async fn apply_banner(&self, image: &[u8]) -> Result<(), ApplyError>;

    /// Set the profile icon
    async fn apply_icon(&self, image: &[u8]) -> Result<(), ApplyError>;
}

/// Retrieves remote asset bytes
///
/// A timeout or a non-success status is a failure.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch the bytes behind `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Permission check used by intake
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Whether `actor` holds `capability`
    async fn authorize(&self, actor: ActorId, capability: CapabilityId) -> bool;
}

/// Best-effort out-of-band alerting
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    /// Deliver `message` to the configured operator; failures are swallowed
    async fn notify_operator(&self, message: &str);
}

/// Channel moderation actions taken on behalf of intake
#[async_trait]
pub trait ChannelModerator: Send + Sync {
    /// Remove a post
    async fn remove_submission(&self, channel: ChannelId, message_id: u64);

    /// Post a notice, deleted after `ttl` when one is given
    async fn post_notice(&self, channel: ChannelId, text: &str, ttl: Option<Duration>);
}
