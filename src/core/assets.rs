//! Brand asset storage and mention matching.
//!
//! Assets are reusable images (the logo is held separately as a
//! distinguished asset). An asset is "mentioned" when its name, or its name
//! with the extension stripped, appears as a case-insensitive substring of a
//! piece of text; mentioned assets ride along as reference images on edit
//! calls.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// An encoded image payload: base64 data plus its media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub data: String,
    pub media_type: String,
}

impl ImageData {
    pub fn new(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    /// Decode the base64 payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }

    pub fn from_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.into(),
        }
    }
}

/// A named reusable image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub name: String,
    pub image: ImageData,
}

impl ImageAsset {
    pub fn new(name: impl Into<String>, image: ImageData) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    /// Asset name with a trailing extension removed ("hero.png" -> "hero").
    pub fn stem(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

/// Ordered collection of brand assets with unique names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetLibrary {
    assets: Vec<ImageAsset>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset; uploading a duplicate name is a no-op. Returns whether
    /// the asset was added.
    pub fn add(&mut self, asset: ImageAsset) -> bool {
        if self.assets.iter().any(|a| a.name == asset.name) {
            return false;
        }
        self.assets.push(asset);
        true
    }

    /// Remove an asset by exact name. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.assets.len();
        self.assets.retain(|a| a.name != name);
        self.assets.len() != before
    }

    pub fn names(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageAsset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// All assets whose name (or extension-stripped name) appears as a
    /// case-insensitive substring of `text`. Overlapping matches are all
    /// included, not first-match-only.
    pub fn mentioned_in(&self, text: &str) -> Vec<&ImageAsset> {
        let haystack = text.to_lowercase();
        self.assets
            .iter()
            .filter(|a| {
                haystack.contains(&a.name.to_lowercase())
                    || haystack.contains(&a.stem().to_lowercase())
            })
            .collect()
    }
}
