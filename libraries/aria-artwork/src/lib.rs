//! Aria Artwork - embedded cover art extraction with an on-disk cache
//!
//! Extracts embedded artwork (album covers) from audio files using the Lofty
//! library and caches the extracted image on disk, keyed by a hash of the
//! source file path. Only JPEG, PNG and WEBP embedded images are accepted;
//! anything else is treated as "no artwork".
//!
//! # Example
//!
//! ```no_run
//! use aria_artwork::ThumbnailCache;
//! use std::path::Path;
//!
//! let cache = ThumbnailCache::with_default_dir().unwrap();
//! match cache.get_or_extract(Path::new("music/track.mp3")) {
//!     Ok(Some(thumb)) => println!("Thumbnail at {}", thumb.display()),
//!     Ok(None) => println!("No embedded artwork"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

mod cache;
mod error;

// Re-export public API
pub use cache::ThumbnailCache;
pub use error::{Result, ThumbnailError};
