//! Named image cache

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use chromadiff_core::{Error, Image, ImageSize, ImageUri, Result};
use parking_lot::ReentrantMutex;
use tracing::{debug, trace};

/// Thread-safe, re-entrant mapping from entry name to image
///
/// The lock is re-entrant: a thread that is already inside the store (for
/// example a visitor passed to [`ImageStore::for_each`]) may call `get` or
/// `put` again without deadlocking. The map itself is only borrowed for
/// the duration of a single lookup or insert, never across a callback.
pub struct ImageStore {
    /// `scheme` segment of identifiers addressed to this store
    scheme: String,
    /// Name consumers use as the `store-name` segment of identifiers
    name: String,
    entries: ReentrantMutex<RefCell<HashMap<String, Arc<Image>>>>,
    /// Shared zero-sized image returned on lookup misses
    empty: Arc<Image>,
}

impl ImageStore {
    /// Scheme used when none is given
    pub const DEFAULT_SCHEME: &'static str = "image";

    /// Create a new empty store using the default `image` scheme
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_scheme(Self::DEFAULT_SCHEME, name)
    }

    /// Create a new empty store answering to `scheme://name/...`
    pub fn with_scheme(scheme: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            name: name.into(),
            entries: ReentrantMutex::new(RefCell::new(HashMap::new())),
            empty: Arc::new(Image::empty()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Image stored under `id`, or the empty sentinel on a miss
    pub fn get(&self, id: &str) -> Arc<Image> {
        self.try_get(id).unwrap_or_else(|e| {
            trace!(store = %self.name, error = %e, "Image store miss");
            Arc::clone(&self.empty)
        })
    }

    /// Image stored under `id`, or `Error::UnknownIdentifier`
    pub fn try_get(&self, id: &str) -> Result<Arc<Image>> {
        self.lookup(id)
            .ok_or_else(|| Error::UnknownIdentifier(id.to_string()))
    }

    /// Image stored under `id`, if any
    pub fn lookup(&self, id: &str) -> Option<Arc<Image>> {
        let guard = self.entries.lock();
        let image = guard.borrow().get(id).cloned();
        image
    }

    /// Insert or overwrite the image stored under `id`
    pub fn put(&self, id: impl Into<String>, image: impl Into<Arc<Image>>) {
        let id = id.into();
        let image = image.into();
        debug!(store = %self.name, id = %id, size = %image.size(), "Storing image");

        let guard = self.entries.lock();
        guard.borrow_mut().insert(id, image);
    }

    /// Insert several entries while holding the lock once
    ///
    /// Readers on other threads observe either none or all of the entries.
    pub fn put_all<I, K>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, Arc<Image>)>,
        K: Into<String>,
    {
        let guard = self.entries.lock();
        for (id, image) in entries {
            self.put(id, image);
        }
        drop(guard);
    }

    pub fn contains(&self, id: &str) -> bool {
        let guard = self.entries.lock();
        let contains = guard.borrow().contains_key(id);
        contains
    }

    pub fn len(&self) -> usize {
        let guard = self.entries.lock();
        let len = guard.borrow().len();
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of stored entry names
    pub fn keys(&self) -> Vec<String> {
        let guard = self.entries.lock();
        let mut keys: Vec<String> = guard.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Visit every entry while holding the store lock
    ///
    /// The visitor runs on a snapshot of the entries taken under the lock,
    /// so it may call back into the store. Other threads are blocked until
    /// the visit finishes; writes made by the visitor are not visited.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &Arc<Image>),
    {
        let guard = self.entries.lock();
        let snapshot: Vec<(String, Arc<Image>)> = guard
            .borrow()
            .iter()
            .map(|(id, image)| (id.clone(), Arc::clone(image)))
            .collect();

        for (id, image) in &snapshot {
            visit(id, image);
        }
        drop(guard);
    }

    /// Build the identifier consumers use to request `entry`
    pub fn uri_for(&self, entry: &str) -> ImageUri {
        ImageUri::new(self.scheme.clone(), self.name.clone(), entry)
    }

    /// Whether `uri` names this store's scheme and store name
    pub fn owns(&self, uri: &ImageUri) -> bool {
        uri.scheme == self.scheme && uri.store == self.name
    }

    /// Resolve a full identifier against this store
    ///
    /// Identifiers addressed to another scheme or store resolve to the
    /// empty sentinel.
    pub fn resolve(&self, uri: &ImageUri) -> (Arc<Image>, ImageSize) {
        if !self.owns(uri) {
            trace!(store = %self.name, uri = %uri, "Identifier addressed to another store");
            return (Arc::clone(&self.empty), ImageSize::ZERO);
        }
        let image = self.get(&uri.entry);
        let size = image.size();
        (image, size)
    }
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new("diffstore")
    }
}

impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStore")
            .field("scheme", &self.scheme)
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn red(w: u32, h: u32) -> Image {
        Image::filled(w, h, [255, 0, 0])
    }

    #[test]
    fn test_put_then_get() {
        let store = ImageStore::new("test");
        let img = Image::from_pixels(2, 1, &[[1, 2, 3], [4, 5, 6]]).unwrap();
        store.put("a", img.clone());

        assert_eq!(*store.get("a"), img);
        assert!(store.contains("a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing_returns_sentinel() {
        let store = ImageStore::new("test");
        let img = store.get("never-inserted");

        assert!(img.is_empty());
        assert!(store.lookup("never-inserted").is_none());
        let err = store.try_get("never-inserted").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_put_overwrites() {
        let store = ImageStore::new("test");
        store.put("a", red(1, 1));
        store.put("a", red(3, 2));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").size(), ImageSize::new(3, 2));
    }

    #[test]
    fn test_put_idempotent() {
        let store = ImageStore::new("test");
        store.put("a", red(2, 2));
        store.put("a", red(2, 2));

        assert_eq!(store.keys(), vec!["a".to_string()]);
        assert_eq!(*store.get("a"), red(2, 2));
    }

    #[test]
    fn test_for_each_reenters() {
        let store = ImageStore::new("test");
        store.put("a", red(1, 1));
        store.put("b", red(2, 2));

        let mut visited = Vec::new();
        store.for_each(|id, image| {
            // Re-entrant access from inside the visit
            assert_eq!(store.get(id).size(), image.size());
            store.put(format!("{id}_copy"), Arc::clone(image));
            visited.push(id.to_string());
        });

        visited.sort();
        assert_eq!(visited, vec!["a", "b"]);
        assert_eq!(store.len(), 4);
        assert!(store.contains("b_copy"));
    }

    #[test]
    fn test_put_all() {
        let store = ImageStore::new("test");
        store.put_all(vec![
            ("x", Arc::new(red(1, 1))),
            ("y", Arc::new(red(1, 2))),
        ]);
        assert_eq!(store.keys(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_resolve_checks_store_name() {
        let store = ImageStore::new("diffstore");
        store.put("a.png", red(4, 4));

        let uri = store.uri_for("a.png");
        assert_eq!(uri.to_string(), "image://diffstore/a.png");
        let (img, size) = store.resolve(&uri);
        assert_eq!(size, ImageSize::new(4, 4));
        assert!(!img.is_empty());

        let (img, size) = store.resolve(&ImageUri::new("image", "other", "a.png"));
        assert_eq!(size, ImageSize::ZERO);
        assert!(img.is_empty());
    }

    #[test]
    fn test_resolve_checks_scheme() {
        let store = ImageStore::new("diffstore");
        store.put("a.png", red(4, 4));

        let (img, size) = store.resolve(&ImageUri::new("http", "diffstore", "a.png"));
        assert_eq!(size, ImageSize::ZERO);
        assert!(img.is_empty());

        let custom = ImageStore::with_scheme("diff", "diffstore");
        custom.put("a.png", red(4, 4));
        assert_eq!(custom.resolve(&ImageUri::new("diff", "diffstore", "a.png")).1, ImageSize::new(4, 4));
        assert_eq!(custom.resolve(&ImageUri::new("image", "diffstore", "a.png")).1, ImageSize::ZERO);
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(ImageStore::new("test"));
        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for j in 0..50u32 {
                        let id = format!("{i}-{j}");
                        store.put(id.clone(), red(1, j + 1));
                        assert_eq!(store.get(&id).height(), j + 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8 * 50);
    }
}
