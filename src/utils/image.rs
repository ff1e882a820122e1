//! File-input boundary for image uploads.
//!
//! Media types are inferred from the file extension; non-image files are
//! rejected with a local validation error before any encoding happens.

use std::path::Path;

use crate::core::assets::{ImageAsset, ImageData};

/// Media type for a supported image extension, or `None` for anything else.
pub fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ImageFileError {
    /// The file is not a supported image type.
    NotAnImage { name: String },

    Io {
        name: String,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ImageFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageFileError::NotAnImage { name } => {
                write!(f, "'{name}' is not a supported image file (png, jpg, webp, gif)")
            }
            ImageFileError::Io { name, source } => {
                write!(f, "Failed to read '{name}': {source}")
            }
        }
    }
}

impl std::error::Error for ImageFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageFileError::NotAnImage { .. } => None,
            ImageFileError::Io { source, .. } => Some(source),
        }
    }
}

/// Read an image file into a named, base64-encoded asset.
pub fn read_image_file(path: &Path) -> Result<ImageAsset, ImageFileError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let media_type = path
        .extension()
        .and_then(|ext| media_type_for_extension(&ext.to_string_lossy()))
        .ok_or_else(|| ImageFileError::NotAnImage { name: name.clone() })?;

    let bytes = std::fs::read(path).map_err(|source| ImageFileError::Io {
        name: name.clone(),
        source,
    })?;

    Ok(ImageAsset::new(name, ImageData::from_bytes(&bytes, media_type)))
}
