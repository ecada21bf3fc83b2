//! Dataset Cache
//!
//! Explicit, caller-owned cache of loaded dispute sets keyed by source file.
//! An entry is reused while the file's modification time and length are
//! unchanged and reloaded otherwise.

use crate::error::{DashboardError, Result};
use crate::loader::load_disputes;
use crate::record::DisputeSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl SourceStamp {
    fn read(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[derive(Debug)]
struct CachedDataset {
    stamp: SourceStamp,
    data: Arc<DisputeSet>,
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, CachedDataset>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached set for `path`, loading it if absent or stale
    pub fn get_or_load(&mut self, path: impl AsRef<Path>) -> Result<Arc<DisputeSet>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DashboardError::SourceNotFound(path.display().to_string()));
        }
        let key = path.canonicalize()?;
        let stamp = SourceStamp::read(&key)?;

        if let Some(entry) = self.entries.get(&key) {
            if entry.stamp == stamp {
                debug!("Dataset cache hit for {}", key.display());
                return Ok(Arc::clone(&entry.data));
            }
            debug!("Dataset {} changed on disk, reloading", key.display());
        }

        let data = Arc::new(load_disputes(&key)?);
        self.entries.insert(
            key,
            CachedDataset {
                stamp,
                data: Arc::clone(&data),
            },
        );
        Ok(data)
    }

    /// Drop the entry for `path`; returns whether one was cached
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.entries.remove(&key).is_some()
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
}
