//! chromadiff image store
//!
//! A process-lifetime cache mapping entry names to decoded images. It is
//! the single source of truth for anything a display surface can request
//! by identifier.
//!
//! # Example
//! ```
//! use chromadiff_core::Image;
//! use chromadiff_store::ImageStore;
//!
//! let store = ImageStore::new("diffstore");
//! store.put("a.png", Image::filled(2, 2, [255, 0, 0]));
//!
//! assert_eq!(store.get("a.png").width(), 2);
//! assert!(store.get("missing.png").is_empty());
//! ```

pub mod provider;
pub mod store;

pub use provider::ImageProvider;
pub use store::ImageStore;
