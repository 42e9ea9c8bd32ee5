//! Hueshift Domain Layer
//!
//! This crate contains the value types and boundary traits shared by every
//! other Hueshift crate. It carries no I/O of its own: network calls, file
//! storage and the chat platform are reached only through the traits in
//! [`traits`].
//!
//! ## Key Concepts
//!
//! - **Asset**: a candidate value for a rotating resource (a color, a remote
//!   image URL, or a locally stored image)
//! - **Resource**: one observable attribute of the shared remote entity
//!   (role color, banner, icon)
//! - **Selection mode**: how a pool is consumed (cursor, shuffle-bag,
//!   random-with-eviction)
//! - **Persisted cursor**: the durable position of a cursor-mode pool
//! - **Submission**: an inbound post offering new image assets
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - Infrastructure implementations live in `hueshift-store` and
//!   `hueshift-remote`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod asset;
pub mod color;
pub mod intake;
pub mod outcome;
pub mod resource;
pub mod rotation;
pub mod traits;

// Re-exports for convenience
pub use asset::{has_image_extension, Asset, IMAGE_EXTENSIONS};
pub use color::{hue_ramp, Color, HUE_RAMP};
pub use intake::{ActorId, Attachment, CapabilityId, ChannelId, Submission};
pub use outcome::{ApplyError, FetchError, RateLimitSignal};
pub use resource::ResourceKind;
pub use rotation::{
    PersistedCursor, RotationConfig, SelectionMode, TaskState, MAX_FLOURISH_BURSTS, MAX_INTERVAL,
};
