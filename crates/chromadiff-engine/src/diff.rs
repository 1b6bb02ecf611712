//! Per-channel difference maps
//!
//! For every pixel the output is
//! `clamp(255 - |a[c] - b[c]| * gain, 0, 255)` written to all three
//! channels, so identical inputs produce white and larger gains push
//! differing pixels toward black faster.

use chromadiff_core::{Channel, Error, Image, Result};
use image::RgbImage;
use rayon::prelude::*;
use tracing::{trace, warn};

/// Brightness of a single output pixel
///
/// A zero difference is always white, whatever the gain, so that
/// non-finite gains cannot turn identical pixels black.
pub fn diff_value(a: u8, b: u8, gain: f32) -> u8 {
    let delta = a.abs_diff(b);
    if delta == 0 {
        return u8::MAX;
    }
    let value = (255.0 - f32::from(delta) * gain).clamp(0.0, 255.0);
    // Truncates toward zero; NaN maps to 0
    value as u8
}

/// The three difference maps of one request, in publication order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelDiffs {
    pub red: Image,
    pub green: Image,
    pub blue: Image,
}

impl ChannelDiffs {
    /// Three empty sentinel images
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, channel: Channel) -> &Image {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }

    /// Pair each map with its channel, red first
    pub fn into_array(self) -> [(Channel, Image); 3] {
        [
            (Channel::Red, self.red),
            (Channel::Green, self.green),
            (Channel::Blue, self.blue),
        ]
    }
}

/// Channel difference calculator
///
/// Stateless apart from the choice of running rows and channels on the
/// rayon pool. Every method is a pure function of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffEngine {
    parallel: bool,
}

impl DiffEngine {
    /// Engine that spreads work over the rayon pool
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Engine that computes everything on the calling thread
    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    pub fn with_parallel(parallel: bool) -> Self {
        Self { parallel }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Difference map for one channel, or the empty image on size mismatch
    pub fn compute_channel_diff(&self, a: &Image, b: &Image, channel: Channel, gain: f32) -> Image {
        self.try_compute_channel_diff(a, b, channel, gain)
            .unwrap_or_else(|e| {
                warn!(channel = %channel, error = %e, "Channel diff skipped");
                Image::empty()
            })
    }

    /// Difference map for one channel, reporting a size mismatch explicitly
    pub fn try_compute_channel_diff(
        &self,
        a: &Image,
        b: &Image,
        channel: Channel,
        gain: f32,
    ) -> Result<Image> {
        if a.size() != b.size() {
            return Err(Error::SizeMismatch {
                left: a.size(),
                right: b.size(),
            });
        }
        let size = a.size();
        if size.is_empty() {
            return Ok(Image::empty());
        }

        trace!(channel = %channel, size = %size, gain, "Computing channel diff");

        let row_len = size.width as usize * 3;
        let index = channel.index();
        let mut out = vec![0u8; a.as_raw().len()];

        let diff_row = |((dst, row_a), row_b): ((&mut [u8], &[u8]), &[u8])| {
            for ((px, pa), pb) in dst
                .chunks_exact_mut(3)
                .zip(row_a.chunks_exact(3))
                .zip(row_b.chunks_exact(3))
            {
                px.fill(diff_value(pa[index], pb[index], gain));
            }
        };

        if self.parallel {
            out.par_chunks_mut(row_len)
                .zip(a.as_raw().par_chunks(row_len))
                .zip(b.as_raw().par_chunks(row_len))
                .for_each(diff_row);
        } else {
            out.chunks_mut(row_len)
                .zip(a.as_raw().chunks(row_len))
                .zip(b.as_raw().chunks(row_len))
                .for_each(diff_row);
        }

        RgbImage::from_raw(size.width, size.height, out)
            .map(Image::from_buffer)
            .ok_or_else(|| Error::SizeMismatch { left: size, right: b.size() })
    }

    /// All three maps, or three empty images on size mismatch
    pub fn compute_all(&self, a: &Image, b: &Image, gain: f32) -> ChannelDiffs {
        self.try_compute_all(a, b, gain).unwrap_or_else(|e| {
            warn!(error = %e, "Diff skipped");
            ChannelDiffs::empty()
        })
    }

    /// All three maps, reporting a size mismatch explicitly
    pub fn try_compute_all(&self, a: &Image, b: &Image, gain: f32) -> Result<ChannelDiffs> {
        if a.size() != b.size() {
            return Err(Error::SizeMismatch {
                left: a.size(),
                right: b.size(),
            });
        }

        let (red, (green, blue)) = if self.parallel {
            rayon::join(
                || self.try_compute_channel_diff(a, b, Channel::Red, gain),
                || {
                    rayon::join(
                        || self.try_compute_channel_diff(a, b, Channel::Green, gain),
                        || self.try_compute_channel_diff(a, b, Channel::Blue, gain),
                    )
                },
            )
        } else {
            (
                self.try_compute_channel_diff(a, b, Channel::Red, gain),
                (
                    self.try_compute_channel_diff(a, b, Channel::Green, gain),
                    self.try_compute_channel_diff(a, b, Channel::Blue, gain),
                ),
            )
        };

        Ok(ChannelDiffs {
            red: red?,
            green: green?,
            blue: blue?,
        })
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromadiff_core::ImageSize;
    use proptest::prelude::*;

    fn scenario() -> (Image, Image) {
        let a = Image::from_pixels(2, 1, &[[10, 20, 30], [200, 200, 200]]).unwrap();
        let b = Image::from_pixels(2, 1, &[[10, 20, 30], [0, 0, 0]]).unwrap();
        (a, b)
    }

    #[test]
    fn test_red_channel_scenario() {
        let (a, b) = scenario();
        for engine in [DiffEngine::new(), DiffEngine::sequential()] {
            let red = engine.compute_channel_diff(&a, &b, Channel::Red, 1.0);
            assert_eq!(red.size(), ImageSize::new(2, 1));
            assert_eq!(red.pixel(0, 0), Some([255, 255, 255]));
            assert_eq!(red.pixel(1, 0), Some([55, 55, 55]));
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let a = Image::from_pixels(1, 1, &[[100, 0, 0]]).unwrap();
        let b = Image::from_pixels(1, 1, &[[0, 0, 50]]).unwrap();
        let diffs = DiffEngine::new().compute_all(&a, &b, 1.0);

        assert_eq!(diffs.red.pixel(0, 0), Some([155, 155, 155]));
        assert_eq!(diffs.green.pixel(0, 0), Some([255, 255, 255]));
        assert_eq!(diffs.blue.pixel(0, 0), Some([205, 205, 205]));
    }

    #[test]
    fn test_size_mismatch_yields_empty() {
        let a = Image::filled(2, 2, [0, 0, 0]);
        let b = Image::filled(2, 3, [0, 0, 0]);
        let engine = DiffEngine::new();

        assert!(engine.compute_channel_diff(&a, &b, Channel::Blue, 1.0).is_empty());
        assert_eq!(engine.compute_all(&a, &b, 1.0), ChannelDiffs::empty());
        assert!(matches!(
            engine.try_compute_all(&a, &b, 1.0),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_inputs() {
        let engine = DiffEngine::new();
        let empty = Image::empty();
        assert!(engine.compute_channel_diff(&empty, &empty, Channel::Red, 1.0).is_empty());
        assert!(engine
            .compute_channel_diff(&empty, &Image::filled(1, 1, [0, 0, 0]), Channel::Red, 1.0)
            .is_empty());
    }

    #[test]
    fn test_diff_value_clamps() {
        assert_eq!(diff_value(0, 255, 1.0), 0);
        assert_eq!(diff_value(0, 255, 100.0), 0);
        assert_eq!(diff_value(0, 10, -5.0), 255);
        assert_eq!(diff_value(7, 7, f32::INFINITY), 255);
        assert_eq!(diff_value(0, 3, 1.5), 250);
    }

    #[test]
    fn test_diff_value_nan_gain() {
        assert_eq!(diff_value(0, 1, f32::NAN), 0);
        assert_eq!(diff_value(1, 1, f32::NAN), 255);
    }

    fn image_pair() -> impl Strategy<Value = (Image, Image)> {
        (1u32..6, 1u32..6).prop_flat_map(|(w, h)| {
            let n = (w * h) as usize;
            (
                prop::collection::vec(any::<[u8; 3]>(), n),
                prop::collection::vec(any::<[u8; 3]>(), n),
            )
                .prop_map(move |(pa, pb)| {
                    (
                        Image::from_pixels(w, h, &pa).unwrap(),
                        Image::from_pixels(w, h, &pb).unwrap(),
                    )
                })
        })
    }

    fn channel() -> impl Strategy<Value = Channel> {
        prop_oneof![Just(Channel::Red), Just(Channel::Green), Just(Channel::Blue)]
    }

    fn all_white(image: &Image) -> bool {
        image.as_raw().iter().all(|&v| v == 255)
    }

    proptest! {
        #[test]
        fn prop_identical_images_are_white((a, _) in image_pair(), ch in channel(), gain in 0.0f32..1000.0) {
            let out = DiffEngine::new().compute_channel_diff(&a, &a, ch, gain);
            prop_assert_eq!(out.size(), a.size());
            prop_assert!(all_white(&out));
        }

        #[test]
        fn prop_zero_gain_is_white((a, b) in image_pair(), ch in channel()) {
            let out = DiffEngine::new().compute_channel_diff(&a, &b, ch, 0.0);
            prop_assert!(all_white(&out));
        }

        #[test]
        fn prop_output_is_grayscale((a, b) in image_pair(), ch in channel(), gain in -10.0f32..10.0) {
            let out = DiffEngine::sequential().compute_channel_diff(&a, &b, ch, gain);
            for px in out.as_raw().chunks_exact(3) {
                prop_assert!(px[0] == px[1] && px[1] == px[2]);
            }
        }

        #[test]
        fn prop_monotonic_in_gain((a, b) in image_pair(), ch in channel(), g1 in 0.0f32..50.0, extra in 0.0f32..50.0) {
            let engine = DiffEngine::new();
            let low = engine.compute_channel_diff(&a, &b, ch, g1);
            let high = engine.compute_channel_diff(&a, &b, ch, g1 + extra);
            for (l, h) in low.as_raw().iter().zip(high.as_raw()) {
                prop_assert!(h <= l);
            }
        }

        #[test]
        fn prop_mismatch_is_empty(w in 1u32..5, h in 1u32..5, dw in 1u32..3, ch in channel(), gain in -5.0f32..5.0) {
            let a = Image::filled(w, h, [1, 2, 3]);
            let b = Image::filled(w + dw, h, [1, 2, 3]);
            prop_assert!(DiffEngine::new().compute_channel_diff(&a, &b, ch, gain).is_empty());
        }

        #[test]
        fn prop_parallel_matches_sequential((a, b) in image_pair(), gain in 0.0f32..5.0) {
            let par = DiffEngine::new().compute_all(&a, &b, gain);
            let seq = DiffEngine::sequential().compute_all(&a, &b, gain);
            prop_assert_eq!(par, seq);
        }
    }
}
