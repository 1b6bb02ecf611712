//! chromadiff-engine
//!
//! Pure per-channel differencing of two RGB images, the decode
//! collaborator that turns paths into pixels, and a task handle for
//! running a diff on the rayon pool.
//!
//! # Example
//!
//! ```
//! use chromadiff_core::{Channel, Image};
//! use chromadiff_engine::DiffEngine;
//!
//! let a = Image::from_pixels(2, 1, &[[10, 20, 30], [200, 200, 200]]).unwrap();
//! let b = Image::from_pixels(2, 1, &[[10, 20, 30], [0, 0, 0]]).unwrap();
//!
//! let red = DiffEngine::new().compute_channel_diff(&a, &b, Channel::Red, 1.0);
//! assert_eq!(red.pixel(0, 0), Some([255, 255, 255]));
//! assert_eq!(red.pixel(1, 0), Some([55, 55, 55]));
//! ```

pub mod decode;
pub mod diff;
pub mod task;

pub use decode::{FsDecoder, ImageDecoder, MemoryDecoder};
pub use diff::{diff_value, ChannelDiffs, DiffEngine};
pub use task::DiffTask;
