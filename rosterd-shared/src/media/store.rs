/// Avatar file storage
///
/// Stored avatars get a random base name instead of the upload's own name:
/// `avatars/<10 random alphanumeric chars><ext>`, where the extension is the
/// upload's, lower-cased, or `.jpg` when it is not in the allow-list. Name
/// collisions are retried a bounded number of times before falling back to a
/// UUID-based name that cannot collide.

use rand::{distributions::Alphanumeric, Rng};
use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

use super::{MediaConfig, DEFAULT_EXTENSION};

/// Length of the random base name
const BASENAME_LEN: usize = 10;

/// How many random names to try before the UUID fallback
const MAX_NAME_ATTEMPTS: u32 = 5;

/// Generates a random file base name of letters and digits
pub fn generate_random_basename(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Picks the extension to store an upload under
///
/// Lower-cases the upload's extension; substitutes the default when the
/// extension is missing or not allowed.
pub fn storage_extension(original_filename: &str, allowed: &[String]) -> String {
    let extension = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()));

    match extension {
        Some(ext) if allowed.contains(&ext) => ext,
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Allocates a media-relative path for a new avatar upload
///
/// Tries up to `attempts` random names, skipping ones already present on
/// disk; when every attempt collides, falls back to a UUID-hex name.
pub fn allocate_avatar_path(config: &MediaConfig, extension: &str, attempts: u32) -> String {
    for _ in 0..attempts {
        let candidate = format!(
            "{}/{}{}",
            config.avatar_dir,
            generate_random_basename(BASENAME_LEN),
            extension
        );
        if !config.absolute_path(&candidate).exists() {
            return candidate;
        }
    }

    // Guaranteed-unique fallback
    format!(
        "{}/{}{}",
        config.avatar_dir,
        Uuid::new_v4().simple(),
        extension
    )
}

/// Writes an uploaded avatar to disk and returns its media-relative path
///
/// The path is what gets stored on the user record; the file lands under
/// `<root>/<avatar_dir>/`.
///
/// # Errors
///
/// Returns an error if the avatar directory cannot be created or the file
/// cannot be written.
pub fn save_avatar(
    config: &MediaConfig,
    original_filename: &str,
    bytes: &[u8],
) -> io::Result<String> {
    let extension = storage_extension(original_filename, &config.allowed_extensions);
    let relative = allocate_avatar_path(config, &extension, MAX_NAME_ATTEMPTS);

    let absolute = config.absolute_path(&relative);
    if let Some(parent) = absolute.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&absolute, bytes)?;

    Ok(relative)
}
