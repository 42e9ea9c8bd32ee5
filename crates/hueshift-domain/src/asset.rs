//! Asset module - candidate values for a rotating resource

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::Color;

/// File extensions accepted as images (lowercase, without the dot)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Check whether a filename carries one of the [`IMAGE_EXTENSIONS`]
///
/// The comparison is case-insensitive.
///
/// # Examples
///
/// ```
/// use hueshift_domain::has_image_extension;
///
/// assert!(has_image_extension("cat.PNG"));
/// assert!(!has_image_extension("notes.txt"));
/// assert!(!has_image_extension("png"));
/// ```
pub fn has_image_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Handle to one candidate value
///
/// Colors belong to the closed hue ramp and are never evicted. Images form
/// open sets: they arrive through intake and leave on failure or explicit
/// deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Asset {
    /// A color value
    Color(Color),

    /// An image reachable at a remote URL
    Remote(String),

    /// An image persisted in local storage
    Stored(PathBuf),
}

impl Asset {
    /// Whether this asset is image data (as opposed to a color)
    pub fn is_image(&self) -> bool {
        !matches!(self, Asset::Color(_))
    }

    /// Whether failure handling may ever remove this asset from its pool
    pub fn is_evictable(&self) -> bool {
        self.is_image()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Color(color) => write!(f, "color {}", color),
            Asset::Remote(url) => write!(f, "{}", url),
            Asset::Stored(path) => write!(f, "{}", path.display()),
        }
    }
}
