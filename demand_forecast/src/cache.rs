//! Caller-owned cache for loaded tables and models
//!
//! Entries are keyed by file path plus modification time, so rewriting a
//! file makes the next lookup reload it. Values are handed out as `Arc`s and
//! can be shared read-only across prediction requests.

use crate::data::{DataLoader, DemandTable, PrepareOptions};
use crate::error::{ForecastError, Result};
use crate::models::ModelHandle;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Identity of a file at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl CacheKey {
    /// Key for the current state of `path`
    pub fn for_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ForecastError::ArtifactNotFound(path.to_path_buf()),
            _ => ForecastError::Io(err),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            modified: metadata.modified()?,
        })
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Memoises the result of loading a file
#[derive(Debug)]
pub struct LoadCache<T> {
    entries: HashMap<PathBuf, (CacheKey, Arc<T>)>,
    stats: CacheStats,
}

impl<T> Default for LoadCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }
}

impl<T> LoadCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `path`, or run `load` when the file is
    /// new or has changed since it was cached.
    ///
    /// A failed load leaves any previous entry for the path untouched.
    pub fn get_or_load<P, F>(&mut self, path: P, load: F) -> Result<Arc<T>>
    where
        P: AsRef<Path>,
        F: FnOnce(&Path) -> Result<T>,
    {
        let key = CacheKey::for_path(&path)?;

        if let Some((cached_key, value)) = self.entries.get(&key.path) {
            if *cached_key == key {
                self.stats.hits += 1;
                debug!(path = %key.path.display(), "cache hit");
                return Ok(Arc::clone(value));
            }
        }

        self.stats.misses += 1;
        debug!(path = %key.path.display(), "cache miss");
        let value = Arc::new(load(&key.path)?);
        self.entries
            .insert(key.path.clone(), (key, Arc::clone(&value)));
        Ok(value)
    }

    /// Forget the entry for `path`; returns whether one existed
    pub fn invalidate<P: AsRef<Path>>(&mut self, path: P) -> bool {
        self.entries.remove(path.as_ref()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

/// Cache of prepared demand tables
pub type TableCache = LoadCache<DemandTable>;

/// Cache of restored models
pub type ModelCache = LoadCache<ModelHandle>;

impl TableCache {
    /// Load and prepare a CSV file, reusing the cached table when unchanged
    pub fn load_table<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: &PrepareOptions,
    ) -> Result<Arc<DemandTable>> {
        self.get_or_load(path, |p| DataLoader::load_prepared(p, options))
    }
}

impl ModelCache {
    /// Restore a model artifact, reusing the cached model when unchanged
    pub fn load_model<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<ModelHandle>> {
        self.get_or_load(path, |p| ModelHandle::restore(p))
    }
}
