//! Decode collaborator
//!
//! Turns a path into an RGB pixel buffer. The diff pipeline treats every
//! failure the same way (an empty image), but decoders report the cause so
//! it can be logged and surfaced.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chromadiff_core::{Error, Image, Result};
use image::ImageError;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Source of decoded images
pub trait ImageDecoder: Send + Sync {
    /// Decode the image at `path`
    fn decode(&self, path: &Path) -> Result<Image>;

    /// Decode the image at `path`, or the empty image on any failure
    fn decode_or_empty(&self, path: &Path) -> Image {
        match self.decode(path) {
            Ok(image) => image,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Decode failed");
                Image::empty()
            }
        }
    }
}

/// Decoder backed by the `image` crate and the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDecoder;

impl FsDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ImageDecoder for FsDecoder {
    fn decode(&self, path: &Path) -> Result<Image> {
        let decoded = image::open(path).map_err(|e| match e {
            ImageError::IoError(io) if io.kind() == ErrorKind::NotFound => {
                Error::FileNotFound(path.to_path_buf())
            }
            other => Error::decode(path, other.to_string()),
        })?;

        let rgb = decoded.into_rgb8();
        debug!(path = %path.display(), width = rgb.width(), height = rgb.height(), "Decoded image");
        Ok(Image::from_buffer(rgb))
    }
}

/// In-memory decoder keyed by path
///
/// Useful for tests and for feeding already-decoded pixels through the
/// same pipeline as files.
#[derive(Debug, Default)]
pub struct MemoryDecoder {
    images: RwLock<HashMap<PathBuf, Image>>,
}

impl MemoryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `image` under `path`, replacing any previous image
    pub fn insert(&self, path: impl Into<PathBuf>, image: Image) {
        self.images.write().insert(path.into(), image);
    }

    pub fn remove(&self, path: &Path) -> Option<Image> {
        self.images.write().remove(path)
    }
}

impl ImageDecoder for MemoryDecoder {
    fn decode(&self, path: &Path) -> Result<Image> {
        self.images
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))
    }
}
