//! Lazily loaded, memoized version object served by `/__version__`.
//!
//! The cache is owned by whoever builds the API and shared with the handler.
//! Concurrent first callers wait on a single in-flight load, so the file is
//! read once until [`VersionCache::reset`] is called.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors raised while loading the version object.
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("failed to read version file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("version file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no version source configured")]
    NoSource,
}

/// Explicitly owned version cache with a single-flight loader.
#[derive(Debug)]
pub struct VersionCache {
    path: Option<PathBuf>,
    cached: ArcSwapOption<Value>,
    loading: Mutex<()>,
}

impl VersionCache {
    /// Cache backed by the JSON file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            cached: ArcSwapOption::empty(),
            loading: Mutex::new(()),
        }
    }

    /// Cache pre-seeded with `value` and no backing file.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self {
            path: None,
            cached: ArcSwapOption::from_pointee(value),
            loading: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Return the cached version object, loading it on first use.
    ///
    /// # Errors
    /// Returns [`VersionError`] if the file cannot be read or parsed, or if
    /// the cache has no backing file and holds no value.
    pub async fn load(&self) -> Result<Arc<Value>, VersionError> {
        if let Some(v) = self.cached.load_full() {
            return Ok(v);
        }

        let _guard = self.loading.lock().await;
        // another caller may have finished the load while we waited
        if let Some(v) = self.cached.load_full() {
            return Ok(v);
        }

        let path = self.path.as_ref().ok_or(VersionError::NoSource)?;
        tracing::debug!(path = %path.display(), "loading version object");
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| VersionError::Io {
                path: path.clone(),
                source,
            })?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| VersionError::Parse {
            path: path.clone(),
            source,
        })?;

        let value = Arc::new(value);
        self.cached.store(Some(Arc::clone(&value)));
        Ok(value)
    }

    /// Drop the cached value; the next [`Self::load`] reads the file again.
    pub fn reset(&self) {
        self.cached.store(None);
    }

    /// Whether a value is currently cached.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cached.load().is_some()
    }
}
