//! Bounded, age-limited preview cache.
//!
//! Keyed by content locator. Lookups promote entries; when the cache is full the
//! entry with the oldest last access is evicted. Entries past `max_age` are never
//! returned. All operations take the current instant explicitly.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::types::{ContentLocator, RenderedPreview};

#[derive(Debug)]
struct CacheEntry {
    preview: Rc<RenderedPreview>,
    last_access: Instant,
    // Tie-breaker for entries touched at the same instant.
    touch: u64,
    size_bytes: usize,
}

/// Locator → rendered preview store with capacity and age limits.
#[derive(Debug)]
pub struct PreviewCache {
    entries: HashMap<ContentLocator, CacheEntry>,
    max_entries: usize,
    max_age: Duration,
    touches: u64,
}

impl PreviewCache {
    /// Create a cache. A capacity of 0 disables caching entirely.
    #[must_use]
    pub fn new(max_entries: usize, max_age: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
            max_age,
            touches: 0,
        }
    }

    /// Look up a preview, refreshing its last access.
    ///
    /// An entry older than `max_age` is dropped and reported as a miss.
    pub fn lookup(&mut self, locator: &ContentLocator, now: Instant) -> Option<Rc<RenderedPreview>> {
        let expired = {
            let entry = self.entries.get(locator)?;
            now.saturating_duration_since(entry.last_access) > self.max_age
        };
        if expired {
            tracing::debug!(?locator, "preview cache entry expired");
            self.entries.remove(locator);
            return None;
        }
        self.touches += 1;
        let touch = self.touches;
        let entry = self.entries.get_mut(locator)?;
        entry.last_access = now;
        entry.touch = touch;
        Some(Rc::clone(&entry.preview))
    }

    /// Whether a fresh entry exists, without refreshing it.
    #[must_use]
    pub fn contains(&self, locator: &ContentLocator, now: Instant) -> bool {
        self.entries
            .get(locator)
            .is_some_and(|e| now.saturating_duration_since(e.last_access) <= self.max_age)
    }

    /// Insert or replace a preview.
    ///
    /// Replacing an existing key never evicts. Inserting a new key into a full
    /// cache first evicts the least recently accessed entry.
    pub fn insert(&mut self, locator: ContentLocator, preview: Rc<RenderedPreview>, now: Instant) {
        if self.max_entries == 0 {
            return;
        }
        if !self.entries.contains_key(&locator) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }
        self.touches += 1;
        let size_bytes = preview.size_bytes();
        self.entries.insert(
            locator,
            CacheEntry {
                preview,
                last_access: now,
                touch: self.touches,
                size_bytes,
            },
        );
        debug_assert!(self.entries.len() <= self.max_entries);
    }

    /// Remove an entry. Returns whether one was present.
    pub fn invalidate(&mut self, locator: &ContentLocator) -> bool {
        self.entries.remove(locator).is_some()
    }

    /// Remove every entry not accessed within `max_age` of `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let max_age = self.max_age;
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.last_access) <= max_age);
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "swept preview cache");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes held by cached previews.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.entries.values().map(|e| e.size_bytes).sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.last_access, e.touch))
            .map(|(k, _)| k.clone());
        if let Some(locator) = oldest {
            tracing::debug!(?locator, "evicting least recently used preview");
            self.entries.remove(&locator);
        }
    }
}
