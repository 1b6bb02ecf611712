//! chromadiff-session
//!
//! Orchestrates image comparisons: decode two sources, compute the three
//! per-channel difference maps, store all five images and publish their
//! identifiers in `[A, B, red, green, blue]` order.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chromadiff_core::Image;
//! use chromadiff_engine::MemoryDecoder;
//! use chromadiff_session::DiffSession;
//! use chromadiff_store::ImageStore;
//!
//! let decoder = MemoryDecoder::new();
//! decoder.insert("/shots/a.png", Image::filled(4, 4, [10, 10, 10]));
//! decoder.insert("/shots/b.png", Image::filled(4, 4, [10, 10, 10]));
//!
//! let store = Arc::new(ImageStore::new("diffstore"));
//! let mut session = DiffSession::new(Arc::clone(&store), Box::new(decoder));
//!
//! let result = session.diff("/shots/a.png", "/shots/b.png")?.expect("published");
//! assert_eq!(result.identifiers()[2], "image://diffstore/a.pngb.png_red");
//! assert_eq!(store.get("a.pngb.png_red").pixel(0, 0), Some([255, 255, 255]));
//! # Ok::<(), chromadiff_core::Error>(())
//! ```

pub mod config;
pub mod logging;
pub mod naming;
pub mod session;

pub use config::SessionConfig;
pub use logging::{init_default, init_with_config, TracingConfig};
pub use session::{DiffRequest, DiffResult, DiffSession, DiffStatus, ResultObserver, ResultSlot};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
