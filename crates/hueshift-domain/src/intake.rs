//! Intake module - inbound asset submissions

use std::fmt;

/// Identifier of a platform user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

/// Identifier of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

/// Identifier of a capability (a role whose members may contribute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file attached to a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Original filename, used for content-type filtering and storage
    pub filename: String,

    /// Where the attachment bytes can be fetched
    pub url: String,
}

impl Attachment {
    /// Create an attachment
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
        }
    }
}

/// An inbound post that may carry new image assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Platform identifier of the post (used to remove it)
    pub message_id: u64,

    /// Who posted it
    pub author: ActorId,

    /// Where it was posted
    pub channel: ChannelId,

    /// Whether the post addresses the bot directly
    pub mentions_bot: bool,

    /// Message text
    pub content: String,

    /// Attached files
    pub attachments: Vec<Attachment>,
}

impl Submission {
    /// Mention markup for the author, used in notices
    pub fn author_mention(&self) -> String {
        format!("<@{}>", self.author)
    }
}
