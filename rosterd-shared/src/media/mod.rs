/// Avatar media subsystem
///
/// Handles where uploaded avatar images live on disk and the best-effort
/// normalization pass that runs after a user record is saved.
///
/// # Modules
///
/// - [`store`]: filename assignment and file writes under the media root
/// - [`resize`]: post-commit image normalization (RGB conversion + downscale)

pub mod resize;
pub mod store;

use std::path::PathBuf;

/// Default extension substituted when an upload's extension is not allowed
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Settings for avatar storage and post-processing
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Filesystem root under which all media is stored
    pub root: PathBuf,

    /// Subdirectory of the root holding avatars
    pub avatar_dir: String,

    /// Allowed avatar file extensions (with leading dot, lower-case);
    /// anything else falls back to [`DEFAULT_EXTENSION`]
    pub allowed_extensions: Vec<String>,

    /// Neither image dimension may exceed this after post-processing
    pub max_dimension: u32,

    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            avatar_dir: "avatars".to_string(),
            allowed_extensions: vec![
                ".jpg".to_string(),
                ".jpeg".to_string(),
                ".png".to_string(),
                ".gif".to_string(),
            ],
            max_dimension: 200,
            jpeg_quality: 85,
        }
    }
}

impl MediaConfig {
    /// Resolves a media-relative path (as stored on a user record) to an
    /// absolute filesystem path
    pub fn absolute_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}
