//! Image inspection for the selected file
//!
//! Provides the picker's extension filter and the one-line preview shown
//! next to the current selection.

use crate::error::Result;

use image::ImageFormat;
use std::path::Path;

/// File extensions offered by the image picker
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// Preview text when nothing is selected
pub const NO_IMAGE_LABEL: &str = "No image loaded";

/// Returns true if `path` has one of [`SUPPORTED_EXTENSIONS`] (case-insensitive)
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use visionchat::preview::is_supported_image;
///
/// assert!(is_supported_image(Path::new("cat.JPG")));
/// assert!(!is_supported_image(Path::new("notes.txt")));
/// ```
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Basic facts about an image file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
}

/// Read the format and dimensions of the image at `path`
///
/// Only the header is decoded.
///
/// # Errors
///
/// Returns error if the file cannot be opened or is not a recognized image.
pub fn inspect_image(path: &Path) -> Result<ImageInfo> {
    let format = ImageFormat::from_path(path)?;
    let (width, height) = image::image_dimensions(path)?;
    Ok(ImageInfo {
        width,
        height,
        format,
    })
}

/// Preview text for the current selection
pub fn preview_label(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return NO_IMAGE_LABEL.to_string();
    };

    match inspect_image(path) {
        Ok(info) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            format!(
                "{} ({}x{}, {:?})",
                name, info.width, info.height, info.format
            )
        }
        Err(e) => {
            tracing::warn!("Could not load image {}: {}", path.display(), e);
            format!("Could not load image:\n{}", e)
        }
    }
}
