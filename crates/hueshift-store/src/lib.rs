//! Hueshift Storage Layer
//!
//! Durable state for the rotation core.
//!
//! # Architecture
//!
//! - [`ConfigStore`]: a JSON key/value file holding intervals, identifiers
//!   and persisted cursors. Every `set` is written through before it
//!   returns, by writing a sibling temp file and renaming it over the
//!   original, so a crash mid-write leaves the previous contents intact.
//! - [`AssetStorage`]: a directory of image files backing stored assets.
//!
//! # Examples
//!
//! ```no_run
//! use hueshift_store::ConfigStore;
//!
//! let store = ConfigStore::open("config.json").unwrap();
//! store.require(&["guild_id", "rgb_role_id"]).unwrap();
//! store.set("color_change_interval", 1800).unwrap();
//! ```

#![warn(missing_docs)]

mod asset_storage;
mod config_store;
mod error;

pub use asset_storage::{sanitize_filename, AssetStorage};
pub use config_store::ConfigStore;
pub use error::StoreError;
