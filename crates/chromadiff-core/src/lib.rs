//! chromadiff core library
//!
//! This crate provides the image, channel and identifier types plus the
//! unified error handling shared across all chromadiff components.

pub mod error;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::types::*;
}
