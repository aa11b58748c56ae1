/// Avatar post-processing
///
/// After a user record with an avatar is durably saved, the stored image is
/// normalized in place: alpha/palette color models are flattened to RGB and
/// the image is downscaled (aspect preserved, never upscaled) so neither
/// dimension exceeds the configured maximum. JPEG output is re-encoded at the
/// configured quality.
///
/// This step is strictly best-effort. A corrupt upload or an I/O failure is
/// logged and swallowed; the committed user record keeps its original,
/// unresized avatar and the request that triggered the save still succeeds.

use image::{codecs::jpeg::JpegEncoder, ColorType, DynamicImage, ImageFormat};
use std::fs;
use std::io::Cursor;
use tracing::{debug, warn};

use super::MediaConfig;

/// Normalizes image bytes: RGB color model, bounded dimensions
///
/// Pure bytes-to-bytes transform, independent of the filesystem:
/// - images with an alpha channel are converted to RGB8 (palette formats
///   already decode through RGB/RGBA);
/// - if either dimension exceeds `max_dimension`, the image is scaled down to
///   fit, preserving aspect ratio; smaller images are left at their size;
/// - the result is re-encoded in `format` (JPEG with `jpeg_quality`).
///
/// # Errors
///
/// Returns an error if the bytes cannot be decoded as `format` or the target
/// format cannot be encoded.
pub fn normalize_image(
    bytes: &[u8],
    format: ImageFormat,
    max_dimension: u32,
    jpeg_quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let mut img = image::load_from_memory_with_format(bytes, format)?;

    if img.color().has_alpha() {
        img = DynamicImage::ImageRgb8(img.to_rgb8());
    }

    // Never upscale
    if img.width() > max_dimension || img.height() > max_dimension {
        img = img.thumbnail(max_dimension, max_dimension);
    }

    let mut out = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            // JPEG carries no alpha and honors the quality setting
            if img.color() != ColorType::Rgb8 {
                img = DynamicImage::ImageRgb8(img.to_rgb8());
            }
            let encoder = JpegEncoder::new_with_quality(&mut out, jpeg_quality);
            img.write_with_encoder(encoder)?;
        }
        _ => {
            img.write_to(&mut Cursor::new(&mut out), format)?;
        }
    }

    Ok(out)
}

/// Post-processes a stored avatar in place, best-effort
///
/// Reads the file at the media-relative path, normalizes it, and overwrites
/// it. Never returns an error: failures are logged at warn level and the
/// original file is left untouched.
pub fn post_process_avatar(config: &MediaConfig, relative_path: &str) {
    match try_post_process(config, relative_path) {
        Ok(()) => {
            debug!(path = relative_path, "Avatar normalized");
        }
        Err(e) => {
            warn!(
                path = relative_path,
                error = %e,
                "Avatar post-processing failed; keeping original upload"
            );
        }
    }
}

fn try_post_process(config: &MediaConfig, relative_path: &str) -> anyhow::Result<()> {
    let path = config.absolute_path(relative_path);

    let bytes = fs::read(&path)?;
    let format = ImageFormat::from_path(&path)
        .or_else(|_| image::guess_format(&bytes))?;

    let normalized = normalize_image(&bytes, format, config.max_dimension, config.jpeg_quality)?;

    fs::write(&path, normalized)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbImage, RgbaImage};
    use std::path::PathBuf;
    use uuid::Uuid;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_normalize_downscales_preserving_aspect() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 300, Rgb([200, 10, 10])));
        let out = normalize_image(&png_bytes(img), ImageFormat::Png, 200, 85).unwrap();

        let result = image::load_from_memory_with_format(&out, ImageFormat::Png).unwrap();
        assert_eq!(result.width(), 200);
        assert_eq!(result.height(), 150);
    }

    #[test]
    fn test_normalize_never_upscales() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 40, Rgb([0, 0, 0])));
        let out = normalize_image(&png_bytes(img), ImageFormat::Png, 200, 85).unwrap();

        let result = image::load_from_memory_with_format(&out, ImageFormat::Png).unwrap();
        assert_eq!(result.width(), 50);
        assert_eq!(result.height(), 40);
    }

    #[test]
    fn test_normalize_flattens_alpha_to_rgb() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([0, 255, 0, 128])));
        let out = normalize_image(&png_bytes(img), ImageFormat::Png, 200, 85).unwrap();

        let result = image::load_from_memory_with_format(&out, ImageFormat::Png).unwrap();
        assert!(!result.color().has_alpha());
    }

    #[test]
    fn test_normalize_jpeg_roundtrip() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([12, 34, 56])));
        let mut jpeg = Vec::new();
        img.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let out = normalize_image(&jpeg, ImageFormat::Jpeg, 200, 85).unwrap();
        let result = image::load_from_memory_with_format(&out, ImageFormat::Jpeg).unwrap();
        assert_eq!(result.width(), 200);
        assert_eq!(result.height(), 200);
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let result = normalize_image(b"definitely not an image", ImageFormat::Png, 200, 85);
        assert!(result.is_err());
    }

    #[test]
    fn test_post_process_swallows_corrupt_file() {
        let root = std::env::temp_dir().join(format!("rosterd-resize-{}", Uuid::new_v4()));
        let config = MediaConfig {
            root: root.clone(),
            ..Default::default()
        };

        let avatar_dir = root.join("avatars");
        fs::create_dir_all(&avatar_dir).unwrap();
        fs::write(avatar_dir.join("broken.png"), b"garbage").unwrap();

        // Must not panic, must leave the file as-is
        post_process_avatar(&config, "avatars/broken.png");
        assert_eq!(fs::read(avatar_dir.join("broken.png")).unwrap(), b"garbage");

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_post_process_missing_file_is_silent() {
        let config = MediaConfig {
            root: PathBuf::from("/nonexistent-rosterd-media"),
            ..Default::default()
        };

        post_process_avatar(&config, "avatars/missing.png");
    }

    #[test]
    fn test_post_process_resizes_on_disk() {
        let root = std::env::temp_dir().join(format!("rosterd-resize-{}", Uuid::new_v4()));
        let config = MediaConfig {
            root: root.clone(),
            max_dimension: 100,
            ..Default::default()
        };

        let avatar_dir = root.join("avatars");
        fs::create_dir_all(&avatar_dir).unwrap();

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(250, 125, Rgb([1, 2, 3])));
        fs::write(avatar_dir.join("big.png"), png_bytes(img)).unwrap();

        post_process_avatar(&config, "avatars/big.png");

        let stored = fs::read(avatar_dir.join("big.png")).unwrap();
        let result = image::load_from_memory_with_format(&stored, ImageFormat::Png).unwrap();
        assert_eq!(result.width(), 100);
        assert_eq!(result.height(), 50);

        fs::remove_dir_all(root).unwrap();
    }
}
