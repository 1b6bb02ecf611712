//! Image retrieval interface consumed by display surfaces

use std::sync::Arc;

use chromadiff_core::{Image, ImageSize, ImageUri};

use crate::ImageStore;

/// Source of images addressed by identifier
///
/// A display surface holds one of these and asks for images by the
/// identifiers it was handed. Absent or foreign identifiers yield a
/// zero-sized image rather than an error.
pub trait ImageProvider: Send + Sync {
    /// Look up an entry name, returning the image and its dimensions
    fn request_image(&self, entry: &str) -> (Arc<Image>, ImageSize);

    /// Look up a full `scheme://store-name/entry-name` identifier
    fn request_uri(&self, uri: &str) -> (Arc<Image>, ImageSize);
}

impl ImageProvider for ImageStore {
    fn request_image(&self, entry: &str) -> (Arc<Image>, ImageSize) {
        let image = self.get(entry);
        let size = image.size();
        (image, size)
    }

    fn request_uri(&self, uri: &str) -> (Arc<Image>, ImageSize) {
        match ImageUri::parse(uri) {
            Ok(uri) => self.resolve(&uri),
            Err(e) => {
                tracing::debug!(error = %e, "Unresolvable identifier");
                (Arc::new(Image::empty()), ImageSize::ZERO)
            }
        }
    }
}
