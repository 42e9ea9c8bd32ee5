//! Hueshift Bot
//!
//! Wires the rotations, intake and operator commands of one guild together.
//!
//! The bot provides:
//! - A role color rotation over the hue ramp
//! - A banner rotation over stored images, fed by booster submissions
//! - An optional icon rotation over image URLs posted in a restricted channel
//! - `rgb!` text commands in the designated channel
//!
//! # Lifecycle
//!
//! 1. Load [`config::Settings`]; a missing or malformed key is fatal
//! 2. Build the [`App`] (pools, restored cursors, intake gate)
//! 3. Prime the [`feed::IntakeFeed`] and seed icons from channel history
//! 4. Start every rotation and announce startup
//! 5. On Ctrl+C, stop the feed and every rotation, logging their metrics

#![warn(missing_docs)]

mod app;
pub mod commands;
pub mod config;
mod error;
pub mod feed;

pub use app::{App, Dispatch, Services};
pub use error::AppError;
