//! Text commands accepted in the designated channel
//!
//! Every command starts with the `rgb!` prefix:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `rgb! <seconds>` | Set the role color interval |
//! | `rgb! <resource> list` | List the pool |
//! | `rgb! <resource> delete <n>` | Delete entry `n` (1-based) |
//! | `rgb! <resource> next` | Rotate now |
//! | `rgb! <resource> interval <seconds>` | Set the interval |
//! | `rgb! <resource> refresh` | Reload the pool from storage |
//! | `rgb! help` | Show usage |
//!
//! `<resource>` is `color`, `banner` or `icon`.

use hueshift_domain::ResourceKind;
use std::time::Duration;
use thiserror::Error;

/// Prefix marking a message as a command
pub const PREFIX: &str = "rgb!";

/// Usage text sent for `rgb! help` and malformed commands
pub const USAGE: &str = "Commands:\n\
    `rgb! <seconds>` set the color interval\n\
    `rgb! <color|banner|icon> list` list the rotation\n\
    `rgb! <color|banner|icon> delete <n>` delete entry n\n\
    `rgb! <color|banner|icon> next` rotate now\n\
    `rgb! <color|banner|icon> interval <seconds>` set the interval\n\
    `rgb! <color|banner|icon> refresh` reload stored images";

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show usage
    Help,

    /// List a pool
    List(ResourceKind),

    /// Delete the `n`th entry (1-based) of a pool
    Delete(ResourceKind, usize),

    /// Commit immediately
    Next(ResourceKind),

    /// Change the rotation interval
    Interval(ResourceKind, Duration),

    /// Reload a pool from its storage directory
    Refresh(ResourceKind),
}

/// Why a prefixed message is not a valid command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unknown resource name
    #[error("Unknown resource '{0}'. Use color, banner or icon.")]
    UnknownResource(String),

    /// Unknown action
    #[error("Unknown command '{0}'. Use `rgb! help` for the list of commands.")]
    UnknownAction(String),

    /// Missing or malformed argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Command {
    /// Parse a message
    ///
    /// Returns `Ok(None)` when the message is not a command at all.
    ///
    /// # Examples
    ///
    /// ```
    /// use hueshift_bot::commands::Command;
    /// use hueshift_domain::ResourceKind;
    /// use std::time::Duration;
    ///
    /// assert_eq!(
    ///     Command::parse("rgb! 600").unwrap(),
    ///     Some(Command::Interval(ResourceKind::RoleColor, Duration::from_secs(600)))
    /// );
    /// assert_eq!(Command::parse("RGB! banner delete 2").unwrap(), Some(Command::Delete(ResourceKind::Banner, 2)));
    /// assert_eq!(Command::parse("nice banner").unwrap(), None);
    /// ```
    pub fn parse(text: &str) -> Result<Option<Command>, CommandError> {
        let mut words = text.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(None);
        };
        if !first.eq_ignore_ascii_case(PREFIX) {
            return Ok(None);
        }

        let args: Vec<&str> = words.collect();
        let command = match args.as_slice() {
            [] | ["help"] => Command::Help,
            [secs] if secs.parse::<f64>().is_ok() => {
                Command::Interval(ResourceKind::RoleColor, seconds(secs)?)
            }
            [resource, action, rest @ ..] => {
                let resource = ResourceKind::parse(resource)
                    .ok_or_else(|| CommandError::UnknownResource(resource.to_string()))?;
                match (action.to_ascii_lowercase().as_str(), rest) {
                    ("list", []) => Command::List(resource),
                    ("next", []) => Command::Next(resource),
                    ("refresh", []) => Command::Refresh(resource),
                    ("delete", [n]) => Command::Delete(resource, position(n)?),
                    ("interval", [secs]) => Command::Interval(resource, seconds(secs)?),
                    ("delete", _) | ("interval", _) => {
                        return Err(CommandError::InvalidArgument(format!(
                            "`{}` takes exactly one argument",
                            action
                        )))
                    }
                    _ => return Err(CommandError::UnknownAction(action.to_string())),
                }
            }
            [other, ..] => return Err(CommandError::UnknownAction(other.to_string())),
        };
        Ok(Some(command))
    }

    /// Resource the command acts on, if any
    pub fn resource(&self) -> Option<ResourceKind> {
        match self {
            Command::Help => None,
            Command::List(r)
            | Command::Delete(r, _)
            | Command::Next(r)
            | Command::Interval(r, _)
            | Command::Refresh(r) => Some(*r),
        }
    }
}

fn seconds(text: &str) -> Result<Duration, CommandError> {
    let secs: f64 = text
        .parse()
        .map_err(|_| CommandError::InvalidArgument(format!("'{}' is not a number of seconds", text)))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(CommandError::InvalidArgument(
            "Interval must be greater than zero".to_string(),
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| CommandError::InvalidArgument(format!("'{}' is out of range", text)))
}

fn position(text: &str) -> Result<usize, CommandError> {
    match text.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidArgument(format!(
            "'{}' is not a valid entry number",
            text
        ))),
    }
}
