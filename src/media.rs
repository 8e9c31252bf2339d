use std::path::{Path, PathBuf};

use image::ImageFormat;
use uuid::Uuid;

use crate::{constants::RECIPE_IMAGE_DIR, error::ApiError};

/// Uploaded files on the local filesystem.
///
/// Stored references are paths relative to `root`; clients see them prefixed
/// with the public `url`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        let url = format!("/{}/", url.trim_matches('/'));

        Self {
            root: root.into(),
            url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The single path segment media is served under.
    pub fn segment(&self) -> String {
        self.url.trim_matches('/').to_string()
    }

    pub fn url(&self, reference: &str) -> String {
        format!("{}{reference}", self.url)
    }

    /// Validates `bytes` as an image and writes it under the recipe upload
    /// directory with a fresh name. Returns the stored reference.
    pub async fn save_recipe_image(&self, bytes: &[u8]) -> Result<String, ApiError> {
        let format = validate_image(bytes)?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let reference = format!("{RECIPE_IMAGE_DIR}/{}.{extension}", Uuid::new_v4());

        let path = self.root.join(&reference);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        log::debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(reference)
    }

    pub async fn remove(&self, reference: &str) {
        let path = self.root.join(reference);

        if let Err(e) = tokio::fs::remove_file(&path).await {
            log::warn!("Failed to remove {}: {e}", path.display());
        }
    }
}

/// Accepts only payloads that fully decode as a known image format.
pub fn validate_image(bytes: &[u8]) -> Result<ImageFormat, ApiError> {
    let invalid = || {
        ApiError::invalid(
            "image",
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        )
    };

    let format = image::guess_format(bytes).map_err(|_| invalid())?;
    image::load_from_memory_with_format(bytes, format).map_err(|_| invalid())?;

    Ok(format)
}
