//! Memoization cache for render contexts.
//!
//! Building a render context is expensive, so instances are kept for the
//! lifetime of the owning simulator. Entries are never evicted: a key
//! always yields the same instance once built.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::ambient::{LanguageAspect, RenderContext};
use crate::error::{SimError, SimResult};

/// Cache key: blake3 over the page id and the serialized language aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderCacheKey([u8; 32]);

impl RenderCacheKey {
    /// Derive the key for a page rendered under `language`.
    pub fn new(page_id: u32, language: Option<&LanguageAspect>) -> SimResult<Self> {
        let serialized = serde_json::to_vec(&language)
            .map_err(|e| SimError::internal(format!("failed to serialize language aspect: {e}")))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&page_id.to_le_bytes());
        hasher.update(&serialized);
        Ok(Self(*hasher.finalize().as_bytes()))
    }
}

impl fmt::Display for RenderCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Append-only map from cache key to built render context.
#[derive(Debug, Default)]
pub struct RenderContextCache {
    entries: RwLock<HashMap<RenderCacheKey, Arc<RenderContext>>>,
}

impl RenderContextCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance for `key`, if any.
    pub fn get(&self, key: &RenderCacheKey) -> SimResult<Option<Arc<RenderContext>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| SimError::internal("render cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    /// Return the cached instance or build, store and return a new one.
    ///
    /// The second element is true on a cache hit. The builder runs outside
    /// the lock; if another caller stored the key meanwhile, its instance
    /// wins and the fresh one is discarded.
    pub fn get_or_try_insert_with<F>(
        &self,
        key: RenderCacheKey,
        build: F,
    ) -> SimResult<(Arc<RenderContext>, bool)>
    where
        F: FnOnce() -> SimResult<RenderContext>,
    {
        if let Some(hit) = self.get(&key)? {
            return Ok((hit, true));
        }

        let built = Arc::new(build()?);
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SimError::internal("render cache lock poisoned"))?;
        let stored = entries.entry(key).or_insert(built);
        Ok((Arc::clone(stored), false))
    }

    /// Number of cached instances.
    pub fn len(&self) -> SimResult<usize> {
        let entries = self
            .entries
            .read()
            .map_err(|_| SimError::internal("render cache lock poisoned"))?;
        Ok(entries.len())
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> SimResult<bool> {
        Ok(self.len()? == 0)
    }
}
