use crate::error::{Result, ThumbnailError};
use lofty::{PictureType, TaggedFileExt};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Image formats accepted for caching. Anything else is treated as no artwork.
const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Cached thumbnails always use this extension, regardless of source format.
const THUMBNAIL_EXTENSION: &str = "jpg";

/// On-disk cache of embedded cover art, keyed by a hash of the source path.
///
/// Entries are create-once: a cache file is never rewritten or evicted here.
/// The cheap existence check runs before any tag parsing, so repeated lookups
/// for the same source file parse its tags at most once.
pub struct ThumbnailCache {
    cache_dir: PathBuf,
}

impl ThumbnailCache {
    /// Create a cache rooted at an explicit directory
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Create a cache under the per-user cache directory
    /// (e.g. `~/.cache/aria/thumbnails` on Linux)
    pub fn with_default_dir() -> Result<Self> {
        let base = dirs::cache_dir().ok_or(ThumbnailError::NoCacheDir)?;
        Ok(Self::new(base.join("aria").join("thumbnails")))
    }

    /// Directory holding the cached image files
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Return the cached thumbnail for `path`, extracting it on first use.
    ///
    /// Returns `Ok(None)` when the file has no embedded artwork, the embedded
    /// image is not JPEG/PNG/WEBP, or the file's tags cannot be read.
    pub fn get_or_extract(&self, path: &Path) -> Result<Option<PathBuf>> {
        let target = self.cache_path_for(path);

        // Existence check first; tag parsing only on a miss.
        if target.exists() {
            debug!("Thumbnail cache hit for {}", path.display());
            return Ok(Some(target));
        }

        if !path.exists() {
            return Err(ThumbnailError::FileNotFound(path.to_path_buf()));
        }

        let Some(data) = Self::extract_embedded(path) else {
            return Ok(None);
        };

        fs::create_dir_all(&self.cache_dir)?;
        fs::write(&target, data)?;
        debug!(
            "Cached thumbnail for {} at {}",
            path.display(),
            target.display()
        );

        Ok(Some(target))
    }

    /// Cache file path for a source file, keyed by hex(sha256(path))
    fn cache_path_for(&self, path: &Path) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        let key = hex::encode(hasher.finalize());
        self.cache_dir
            .join(format!("{}.{}", key, THUMBNAIL_EXTENSION))
    }

    /// Read the first acceptable embedded picture from the file's tags
    fn extract_embedded(path: &Path) -> Option<Vec<u8>> {
        let tagged_file = match lofty::read_from_path(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Cannot read tags from {}: {}", path.display(), e);
                return None;
            }
        };

        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())?;

        let pictures = tag.pictures();
        if pictures.is_empty() {
            return None;
        }

        // Prefer front cover, otherwise use first picture
        let picture = pictures
            .iter()
            .find(|p| matches!(p.pic_type(), PictureType::CoverFront))
            .or_else(|| pictures.first())?;

        let mime = picture.mime_type().map(|m| m.as_str().to_string())?;
        if !ACCEPTED_MIME_TYPES.contains(&mime.as_str()) {
            debug!("Skipping embedded image with mime type {}", mime);
            return None;
        }

        Some(picture.data().to_vec())
    }
}
