//! Registry of open backend handles keyed by recording identifier.
//!
//! The registry map is locked while entries are inserted, looked up, or
//! removed. Each handle sits behind its own `RwLock`, so reads of one recording
//! share the handle and writes take it exclusively. Reads and writes on one
//! identifier never wait on another's. Opening a handle and re-creating
//! storage run under the registry lock, so those briefly stall lookups of
//! every identifier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::errors::StoreError;

type Entry<H> = Arc<RwLock<H>>;

/// Open-handle cache holding at most one handle per identifier.
///
/// Handles are owned by the cache. Callers reach them only through
/// [`HandleCache::with_read`] and [`HandleCache::with_write`], which lend the
/// handle for the duration of a closure.
#[derive(Debug)]
pub struct HandleCache<H> {
    entries: Mutex<HashMap<String, Entry<H>>>,
}

impl<H> Default for HandleCache<H> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<H> HandleCache<H> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a handle produced by `open` unless `id` is already cached.
    ///
    /// Returns `true` when a new handle was inserted. The registry lock is held
    /// while `open` runs so two racing opens of the same identifier never
    /// produce two handles.
    pub fn open_with<F>(&self, id: &str, open: F) -> Result<bool, StoreError>
    where
        F: FnOnce() -> Result<H, StoreError>,
    {
        let mut entries = self.lock()?;
        if entries.contains_key(id) {
            return Ok(false);
        }
        let handle = open()?;
        entries.insert(id.to_owned(), Arc::new(RwLock::new(handle)));
        Ok(true)
    }

    /// Reports whether `id` has a live handle.
    pub fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(id))
    }

    /// Number of live handles.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// Reports whether no handles are live.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    /// Runs `f` with shared access to the handle for `id`.
    pub fn with_read<R>(&self, id: &str, f: impl FnOnce(&H) -> R) -> Result<R, StoreError> {
        let entry = self.entry(id)?;
        let guard = entry.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }

    /// Runs `f` with exclusive access to the handle for `id`.
    pub fn with_write<R>(&self, id: &str, f: impl FnOnce(&mut H) -> R) -> Result<R, StoreError> {
        let entry = self.entry(id)?;
        let mut guard = entry.write().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut guard))
    }

    /// Removes the handle for `id` and releases it.
    ///
    /// Waits for calls already holding the handle to finish before dropping
    /// it. Returns `false` when `id` was not cached.
    pub fn evict(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.lock()?.remove(id);
        let Some(entry) = removed else {
            return Ok(false);
        };
        drop(entry.write().map_err(|_| StoreError::Poisoned)?);
        Ok(true)
    }

    /// Removes the handle for `id` and runs `f` before any caller can open
    /// `id` again.
    ///
    /// Returns whether a handle was evicted, alongside `f`'s result.
    pub fn evict_with<R>(&self, id: &str, f: impl FnOnce() -> R) -> Result<(bool, R), StoreError> {
        let mut entries = self.lock()?;
        let evicted = match entries.remove(id) {
            Some(entry) => {
                drop(entry.write().map_err(|_| StoreError::Poisoned)?);
                true
            }
            None => false,
        };
        Ok((evicted, f()))
    }

    fn entry(&self, id: &str) -> Result<Entry<H>, StoreError> {
        self.lock()?
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| StoreError::not_open(id))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry<H>>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::Poisoned)
    }
}
