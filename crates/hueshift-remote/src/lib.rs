//! Hueshift Remote Collaborators
//!
//! Network-facing implementations of the boundary traits in
//! `hueshift_domain::traits`, plus in-memory doubles for tests.
//!
//! # Implementations
//!
//! - [`HttpFetcher`]: downloads remote assets with a per-request timeout
//! - [`GuildClient`]: applies colors and images to a guild over its REST
//!   API, checks member roles, removes posts, posts notices and operator
//!   alerts
//! - [`mock`]: `MockApplier`, `MockFetcher`, `RecordingNotifier`,
//!   `StaticAuthorizer` and `RecordingModerator`
//!
//! # Error mapping
//!
//! Apply responses are mapped by [`classify_response`]: 429 becomes a rate
//! limit, a 400 about image size or dimensions becomes a content-validity
//! rejection, and every other failure is a plain rejection or a transport
//! error.
//!
//! # Examples
//!
//! ```
//! use hueshift_domain::ApplyError;
//! use hueshift_remote::classify_response;
//!
//! let error = classify_response(403, "Missing Permissions", None);
//! assert!(matches!(error, ApplyError::Rejected { status: 403, .. }));
//! ```

#![warn(missing_docs)]

mod error;
mod fetcher;
mod guild;
pub mod mock;

pub use error::RemoteError;
pub use fetcher::{HttpFetcher, DEFAULT_FETCH_TIMEOUT};
pub use guild::{classify_response, GuildClient, OperatorTarget, DEFAULT_API_BASE, DEFAULT_API_TIMEOUT};
