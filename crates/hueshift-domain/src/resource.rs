//! Resource module - the rotating attributes of the shared remote entity

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::SelectionMode;

/// One observable attribute that a rotation task governs
///
/// All resources belong to the same remote entity but touch disjoint
/// attributes, so tasks for different resources never coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Color of a designated role
    RoleColor,

    /// Banner image of the entity
    Banner,

    /// Profile icon of the entity
    Icon,
}

impl ResourceKind {
    /// All resources, in startup order
    pub const ALL: [ResourceKind; 3] = [ResourceKind::RoleColor, ResourceKind::Banner, ResourceKind::Icon];

    /// Get the resource name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::RoleColor => "role_color",
            ResourceKind::Banner => "banner",
            ResourceKind::Icon => "icon",
        }
    }

    /// Parse a resource from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "role_color" | "color" => Some(ResourceKind::RoleColor),
            "banner" => Some(ResourceKind::Banner),
            "icon" => Some(ResourceKind::Icon),
            _ => None,
        }
    }

    /// Config key holding this resource's rotation interval in seconds
    pub fn interval_key(&self) -> &'static str {
        match self {
            ResourceKind::RoleColor => "color_change_interval",
            ResourceKind::Banner => "banner_change_interval",
            ResourceKind::Icon => "icon_change_interval",
        }
    }

    /// Config key holding this resource's persisted cursor
    pub fn cursor_key(&self) -> String {
        format!("{}_cursor", self.as_str())
    }

    /// Interval used when none is configured
    pub fn default_interval(&self) -> Duration {
        match self {
            ResourceKind::RoleColor => Duration::from_secs(3600),
            ResourceKind::Banner => Duration::from_secs(3600),
            ResourceKind::Icon => Duration::from_secs(20),
        }
    }

    /// How this resource's pool is consumed
    pub fn default_mode(&self) -> SelectionMode {
        match self {
            ResourceKind::RoleColor => SelectionMode::Cursor,
            ResourceKind::Banner => SelectionMode::ShuffleBag,
            ResourceKind::Icon => SelectionMode::RandomWithEviction,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid resource: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!("COLOR".parse::<ResourceKind>(), Ok(ResourceKind::RoleColor));
        assert!("avatar".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_keys() {
        assert_eq!(ResourceKind::Banner.interval_key(), "banner_change_interval");
        assert_eq!(ResourceKind::RoleColor.cursor_key(), "role_color_cursor");
    }

    #[test]
    fn test_default_modes() {
        assert_eq!(ResourceKind::RoleColor.default_mode(), SelectionMode::Cursor);
        assert_eq!(ResourceKind::Banner.default_mode(), SelectionMode::ShuffleBag);
        assert_eq!(ResourceKind::Icon.default_mode(), SelectionMode::RandomWithEviction);
    }
}
