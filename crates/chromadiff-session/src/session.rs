//! Diff request orchestration
//!
//! A [`DiffSession`] decodes two images, computes the red, green and blue
//! difference maps, stores all five images and then publishes their
//! identifiers. Storage always completes before publication, so anyone
//! reacting to a published result can resolve every identifier in it.

use std::sync::Arc;

use chromadiff_core::{Channel, Error, Image, ImageSize, ImageUri, Result};
use chromadiff_engine::{ChannelDiffs, DiffEngine, ImageDecoder};
use chromadiff_store::ImageStore;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::logging::instrument_diff;
use crate::naming;

/// Index of each image in a published result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSlot {
    OriginalA = 0,
    OriginalB = 1,
    RedDiff = 2,
    GreenDiff = 3,
    BlueDiff = 4,
}

impl ResultSlot {
    /// Slot holding the diff map for `channel`
    pub fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::Red => ResultSlot::RedDiff,
            Channel::Green => ResultSlot::GreenDiff,
            Channel::Blue => ResultSlot::BlueDiff,
        }
    }
}

/// The last applied request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRequest {
    pub path_a: String,
    pub path_b: String,
    pub gain: f32,
}

/// Why a published result holds empty images, if it does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffStatus {
    /// All three maps were computed
    Complete,
    /// One or both sources failed to decode
    DecodeFailed { left: bool, right: bool },
    /// Sources decoded but have different dimensions
    SizeMismatch { left: ImageSize, right: ImageSize },
}

impl DiffStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, DiffStatus::Complete)
    }
}

/// A published set of identifiers in `[A, B, red, green, blue]` order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffResult {
    /// Increases by one on every publication of this session
    pub generation: u64,
    pub uris: [ImageUri; 5],
    pub gain: f32,
    pub status: DiffStatus,
}

impl DiffResult {
    pub fn uri(&self, slot: ResultSlot) -> &ImageUri {
        &self.uris[slot as usize]
    }

    /// Identifier strings in publication order
    pub fn identifiers(&self) -> Vec<String> {
        self.uris.iter().map(ToString::to_string).collect()
    }

    /// Store entry names in publication order
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.uris.iter().map(|uri| uri.entry.as_str())
    }

    /// Same identifiers, gain and status, ignoring the generation
    pub fn same_content(&self, other: &DiffResult) -> bool {
        self.uris == other.uris && self.gain.to_bits() == other.gain.to_bits() && self.status == other.status
    }
}

/// Request plus the entry names derived from it
#[derive(Debug, Clone)]
struct ActiveRequest {
    request: DiffRequest,
    entries: [String; 5],
}

/// Callback run after every publication
pub type ResultObserver = Box<dyn Fn(&DiffResult) + Send + Sync>;

/// Orchestrates diff requests against a shared [`ImageStore`]
///
/// State moves from idle (no request yet) to published on the first
/// successful [`DiffSession::diff`], and every later `diff` or
/// [`DiffSession::set_gain_and_recompute`] publishes a new generation.
pub struct DiffSession {
    store: Arc<ImageStore>,
    decoder: Box<dyn ImageDecoder>,
    engine: DiffEngine,
    gain: f32,
    active: Option<ActiveRequest>,
    published: Option<DiffResult>,
    generation: u64,
    observers: Vec<ResultObserver>,
}

impl DiffSession {
    /// Create a session with default settings
    pub fn new(store: Arc<ImageStore>, decoder: Box<dyn ImageDecoder>) -> Self {
        Self::with_config(store, decoder, &SessionConfig::default())
    }

    /// Create a session from a config
    ///
    /// Identifiers use the store's own scheme and name; build the store
    /// with [`SessionConfig::build_store`] to take them from `config`.
    pub fn with_config(
        store: Arc<ImageStore>,
        decoder: Box<dyn ImageDecoder>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            store,
            decoder,
            engine: DiffEngine::with_parallel(config.parallel),
            gain: config.default_gain,
            active: None,
            published: None,
            generation: 0,
            observers: Vec::new(),
        }
    }

    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// The last applied request, carrying the current gain
    pub fn request(&self) -> Option<&DiffRequest> {
        self.active.as_ref().map(|active| &active.request)
    }

    /// The most recent publication, if any
    pub fn current_result(&self) -> Option<&DiffResult> {
        self.published.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Register a callback run once per publication
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(&DiffResult) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Diff two images and publish the result
    ///
    /// An empty path, or a path without a file name, on either side is a
    /// no-op returning `Ok(None)` and leaves the previous request in place.
    /// Decode failures and size mismatches still publish, with empty diff
    /// maps and a matching [`DiffStatus`].
    ///
    /// Runs on the calling thread; rayon workers are fine callers since
    /// the channel diffs only fork with `rayon::join`.
    pub fn diff(&mut self, path_a: &str, path_b: &str) -> Result<Option<DiffResult>> {
        if path_a.is_empty() || path_b.is_empty() {
            debug!(path_a, path_b, "Diff skipped: empty path");
            return Ok(None);
        }
        let Some(entries) = naming::entry_names(path_a, path_b) else {
            debug!(path_a, path_b, "Diff skipped: path has no file name");
            return Ok(None);
        };

        let active = ActiveRequest {
            request: DiffRequest {
                path_a: path_a.to_string(),
                path_b: path_b.to_string(),
                gain: self.gain,
            },
            entries,
        };
        self.active = Some(active.clone());

        self.run(&active).map(Some)
    }

    /// Store a new gain without recomputing
    ///
    /// The last request adopts the gain too, so the next recompute uses it.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        if let Some(active) = self.active.as_mut() {
            active.request.gain = gain;
        }
    }

    /// Store a new gain and re-run the last request with it
    ///
    /// Without a previous request the gain is only stored.
    pub fn set_gain_and_recompute(&mut self, gain: f32) -> Result<Option<DiffResult>> {
        self.set_gain(gain);

        let Some(active) = self.active.clone() else {
            debug!(gain, "Gain stored; no request to recompute");
            return Ok(None);
        };

        self.run(&active).map(Some)
    }

    fn run(&mut self, active: &ActiveRequest) -> Result<DiffResult> {
        let request = &active.request;
        instrument_diff("session", || -> Result<DiffResult> {
            let path_a = naming::local_path(&request.path_a);
            let path_b = naming::local_path(&request.path_b);

            let image_a = Arc::new(self.decoder.decode_or_empty(&path_a));
            let image_b = Arc::new(self.decoder.decode_or_empty(&path_b));

            let (diffs, status) = self.compute(&image_a, &image_b, request.gain)?;

            let entries = active.entries.clone();
            let [red, green, blue] = diffs.into_array().map(|(_, image)| Arc::new(image));
            let images = [image_a, image_b, red, green, blue];

            // Store everything before anything is published
            self.store.put_all(entries.iter().cloned().zip(images));

            let uris = entries.map(|entry| self.store.uri_for(&entry));
            Ok(self.publish(uris, request.gain, status))
        })
    }

    fn compute(&self, a: &Arc<Image>, b: &Arc<Image>, gain: f32) -> Result<(ChannelDiffs, DiffStatus)> {
        let decode_status = (a.is_empty() || b.is_empty()).then_some(DiffStatus::DecodeFailed {
            left: a.is_empty(),
            right: b.is_empty(),
        });

        match self.engine.try_compute_all(a, b, gain) {
            Ok(diffs) => Ok((diffs, decode_status.unwrap_or(DiffStatus::Complete))),
            Err(Error::SizeMismatch { left, right }) => {
                let status = decode_status.unwrap_or(DiffStatus::SizeMismatch { left, right });
                warn!(%left, %right, "Source images differ in size");
                Ok((ChannelDiffs::empty(), status))
            }
            Err(e) => Err(e),
        }
    }

    fn publish(&mut self, uris: [ImageUri; 5], gain: f32, status: DiffStatus) -> DiffResult {
        self.generation += 1;
        let result = DiffResult {
            generation: self.generation,
            uris,
            gain,
            status,
        };

        info!(
            generation = result.generation,
            gain,
            status = ?result.status,
            identifiers = ?result.identifiers(),
            "Published diff result"
        );

        self.published = Some(result.clone());
        for observer in &self.observers {
            observer(&result);
        }
        result
    }
}

impl std::fmt::Debug for DiffSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffSession")
            .field("store", &self.store)
            .field("gain", &self.gain)
            .field("request", &self.request())
            .field("generation", &self.generation)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromadiff_engine::MemoryDecoder;

    fn session_with(images: &[(&str, Image)]) -> DiffSession {
        let decoder = MemoryDecoder::new();
        for (path, image) in images {
            decoder.insert(*path, image.clone());
        }
        DiffSession::new(Arc::new(ImageStore::new("diffstore")), Box::new(decoder))
    }

    #[test]
    fn test_initial_state() {
        let session = session_with(&[]);
        assert!((session.gain() - 1.0).abs() < f32::EPSILON);
        assert!(session.request().is_none());
        assert!(session.current_result().is_none());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_empty_path_is_noop() {
        let mut session = session_with(&[]);
        assert!(session.diff("", "/b.png").unwrap().is_none());
        assert!(session.diff("/a.png", "").unwrap().is_none());
        assert!(session.request().is_none());
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_set_gain_without_request() {
        let mut session = session_with(&[]);
        assert!(session.set_gain_and_recompute(3.0).unwrap().is_none());
        assert!((session.gain() - 3.0).abs() < f32::EPSILON);
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_decode_failure_status() {
        let mut session = session_with(&[("/a.png", Image::filled(2, 2, [0, 0, 0]))]);
        let result = session.diff("/a.png", "/missing.png").unwrap().unwrap();

        assert_eq!(result.status, DiffStatus::DecodeFailed { left: false, right: true });
        assert!(session.store().get("missing.png").is_empty());
        assert!(session.store().get("a.pngmissing.png_red").is_empty());
        assert!(session.store().contains("a.pngmissing.png_red"));
    }

    #[test]
    fn test_size_mismatch_status() {
        let mut session = session_with(&[
            ("/a.png", Image::filled(2, 2, [0, 0, 0])),
            ("/b.png", Image::filled(3, 2, [0, 0, 0])),
        ]);
        let result = session.diff("/a.png", "/b.png").unwrap().unwrap();

        assert_eq!(
            result.status,
            DiffStatus::SizeMismatch {
                left: ImageSize::new(2, 2),
                right: ImageSize::new(3, 2),
            }
        );
        assert_eq!(session.store().get("a.png").size(), ImageSize::new(2, 2));
        assert!(session.store().get("a.pngb.png_blue").is_empty());
    }

    #[test]
    fn test_result_slots() {
        let mut session = session_with(&[
            ("/a.png", Image::filled(1, 1, [0, 0, 0])),
            ("/b.png", Image::filled(1, 1, [0, 0, 0])),
        ]);
        let result = session.diff("/a.png", "/b.png").unwrap().unwrap();

        assert_eq!(result.uri(ResultSlot::OriginalA).entry, "a.png");
        assert_eq!(result.uri(ResultSlot::for_channel(Channel::Green)).entry, "a.pngb.png_green");
        assert_eq!(result.identifiers()[2], "image://diffstore/a.pngb.png_red");
        assert!(result.status.is_complete());
    }

    #[test]
    fn test_sequential_config() {
        let decoder = MemoryDecoder::new();
        decoder.insert("/a.png", Image::filled(2, 1, [9, 9, 9]));
        decoder.insert("/b.png", Image::filled(2, 1, [0, 9, 9]));
        let config = SessionConfig {
            scheme: "diff".to_string(),
            store_name: "s".to_string(),
            parallel: false,
            default_gain: 2.0,
        };
        let mut session = DiffSession::with_config(config.build_store(), Box::new(decoder), &config);

        let result = session.diff("/a.png", "/b.png").unwrap().unwrap();
        assert_eq!(result.identifiers()[0], "diff://s/a.png");
        assert_eq!(session.store().get("a.pngb.png_red").pixel(1, 0), Some([237, 237, 237]));
    }

    #[test]
    fn test_path_without_file_name_is_noop() {
        let mut session = session_with(&[("/a.png", Image::filled(1, 1, [0, 0, 0]))]);
        session.diff("/a.png", "/a.png").unwrap();

        assert!(session.diff("/shots/", "/a.png").unwrap().is_none());
        assert!(session.diff("/a.png", "file:///shots/").unwrap().is_none());
        assert_eq!(session.request().unwrap().path_a, "/a.png");
        assert_eq!(session.generation(), 1);
        assert!(!session.store().contains(""));
    }

    #[test]
    fn test_set_gain_updates_request() {
        let mut session = session_with(&[("/a.png", Image::filled(1, 1, [0, 0, 0]))]);
        session.diff("/a.png", "/a.png").unwrap();

        session.set_gain(6.0);
        assert!((session.request().unwrap().gain - 6.0).abs() < f32::EPSILON);
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn test_diff_inside_single_thread_pool() {
        let mut session = session_with(&[
            ("/a.png", Image::filled(8, 8, [10, 20, 30])),
            ("/b.png", Image::filled(8, 8, [0, 20, 30])),
        ]);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();

        let result = pool
            .install(|| session.diff("/a.png", "/b.png"))
            .unwrap()
            .unwrap();

        assert!(result.status.is_complete());
        assert_eq!(session.store().get("a.pngb.png_red").pixel(7, 7), Some([245, 245, 245]));
    }
}
