//! Session configuration

use std::path::Path;
use std::sync::Arc;

use chromadiff_core::{Error, Result, ResultExt};
use chromadiff_store::ImageStore;
use serde::{Deserialize, Serialize};

/// Settings for a [`crate::DiffSession`] and the store behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Scheme segment of published identifiers
    pub scheme: String,
    /// Store name segment of published identifiers
    pub store_name: String,
    /// Gain used until the first explicit change
    pub default_gain: f32,
    /// Run channel diffs on the rayon pool
    pub parallel: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scheme: "image".to_string(),
            store_name: "diffstore".to_string(),
            default_gain: 1.0,
            parallel: true,
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON config file
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(Error::from)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Empty store answering to `scheme://store_name/...`
    pub fn build_store(&self) -> Arc<ImageStore> {
        Arc::new(ImageStore::with_scheme(self.scheme.clone(), self.store_name.clone()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheme.is_empty() || self.scheme.contains(['/', ':']) {
            return Err(Error::invalid_config(format!("bad scheme {:?}", self.scheme)));
        }
        if self.store_name.is_empty() || self.store_name.contains('/') {
            return Err(Error::invalid_config(format!("bad store name {:?}", self.store_name)));
        }
        if !self.default_gain.is_finite() {
            return Err(Error::invalid_config("default_gain must be finite"));
        }
        Ok(())
    }
}
