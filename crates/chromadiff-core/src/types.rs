//! Common types used across chromadiff
//!
//! This module provides shared type definitions used by multiple crates.

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Width and height of an image in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// The size of the empty sentinel image
    pub const ZERO: Self = Self { width: 0, height: 0 };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Primary color channel of an RGB pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// All channels in publication order
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Index of this channel inside an `[r, g, b]` triple
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    /// Lowercase channel name
    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }

    /// Suffix appended to diff-map entry names (`_red`, `_green`, `_blue`)
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::Red => "_red",
            Channel::Green => "_green",
            Channel::Blue => "_blue",
        }
    }

    /// Read this channel's value from a pixel
    pub fn value(self, pixel: [u8; 3]) -> u8 {
        pixel[self.index()]
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable 8-bit RGB image
///
/// A zero-sized image is the uniform "no data" signal: lookup misses,
/// failed decodes and mismatched diff inputs all produce one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    buffer: RgbImage,
}

impl Image {
    /// The empty sentinel image
    pub fn empty() -> Self {
        Self {
            buffer: RgbImage::new(0, 0),
        }
    }

    /// Wrap an existing RGB buffer
    pub fn from_buffer(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Build an image from row-major pixels
    ///
    /// Returns `None` when `pixels.len()` does not equal `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: &[[u8; 3]]) -> Option<Self> {
        let expected = usize::try_from(u64::from(width) * u64::from(height)).ok()?;
        if pixels.len() != expected {
            return None;
        }
        let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
        RgbImage::from_raw(width, height, raw).map(Self::from_buffer)
    }

    /// Build an image where every pixel has the same value
    pub fn filled(width: u32, height: u32, pixel: [u8; 3]) -> Self {
        Self {
            buffer: RgbImage::from_pixel(width, height, Rgb(pixel)),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width(), self.height())
    }

    /// True for the zero-sized sentinel
    pub fn is_empty(&self) -> bool {
        self.size().is_empty()
    }

    /// Pixel at `(x, y)`, or `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.buffer.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Raw interleaved RGB bytes, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    pub fn as_buffer(&self) -> &RgbImage {
        &self.buffer
    }

    pub fn into_buffer(self) -> RgbImage {
        self.buffer
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<RgbImage> for Image {
    fn from(buffer: RgbImage) -> Self {
        Self::from_buffer(buffer)
    }
}

/// Identifier handed to consumers: `scheme://store-name/entry-name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageUri {
    pub scheme: String,
    pub store: String,
    pub entry: String,
}

impl ImageUri {
    pub fn new(scheme: impl Into<String>, store: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            store: store.into(),
            entry: entry.into(),
        }
    }

    /// Parse an identifier string
    ///
    /// The entry name is everything after the store segment, so entry names
    /// may themselves contain `/`.
    pub fn parse(s: &str) -> Result<Self> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| Error::MalformedIdentifier(s.to_string()))?;
        let (store, entry) = rest
            .split_once('/')
            .ok_or_else(|| Error::MalformedIdentifier(s.to_string()))?;

        if scheme.is_empty() || store.is_empty() {
            return Err(Error::MalformedIdentifier(s.to_string()));
        }

        Ok(Self::new(scheme, store, entry))
    }
}

impl std::fmt::Display for ImageUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.store, self.entry)
    }
}

impl std::str::FromStr for ImageUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
