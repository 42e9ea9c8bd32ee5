//! Hueshift Gatekeeper
//!
//! Screens user submissions before their images join a rotation pool.
//!
//! The gatekeeper provides:
//! - Capability checks on every submitter
//! - Image filtering by file extension
//! - Bounded downloads into asset storage
//! - Removal of disallowed posts in write-restricted channels
//!
//! # Channel kinds
//!
//! | Kind | Considered when | Accepted images become | On rejection |
//! |------|-----------------|------------------------|--------------|
//! | **Open** | The post mentions the bot and has attachments | Stored files | Notice (post removed if unauthorized) |
//! | **Restricted** | Always | Attachment URLs | Post removed, notice |
//!
//! # Examples
//!
//! ```no_run
//! use hueshift_domain::{CapabilityId, ChannelId, ResourceKind};
//! use hueshift_gatekeeper::{IntakeCollaborators, IntakeConfig, IntakeGate, IntakeTarget};
//! use hueshift_rotator::AssetPool;
//!
//! # fn run(collaborators: IntakeCollaborators) -> Result<(), Box<dyn std::error::Error>> {
//! let icons = AssetPool::random_with_eviction(Vec::new()).shared();
//!
//! let mut gate = IntakeGate::new(IntakeConfig::default(), collaborators);
//! gate.add_target(IntakeTarget::restricted(
//!     ResourceKind::Icon,
//!     ChannelId(1234),
//!     CapabilityId(42),
//!     icons,
//! ))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod gate;

pub use config::{IntakeConfig, IntakeTarget};
pub use error::IntakeError;
pub use gate::{IgnoreReason, IntakeCollaborators, IntakeGate, IntakeOutcome, RejectionReason};
