//! Run-scoped content cache.
//!
//! Guarantees at most one live [`Page`] handle per URI for the lifetime of
//! an [`Environment`](crate::environment::Environment). Handles are shared
//! as `Rc<Page>`, so two lookups of the same URI observe the same object.
//!
//! ## Eviction
//!
//! The cache has a soft limit `L`. When an insertion pushes the live count
//! above `L`, the oldest `⌈L/10⌉` entries are dropped in insertion order
//! (FIFO). Lookups do not refresh an entry's position. Nothing depends on
//! the cache for correctness: an evicted URI is simply rebuilt on its next
//! request.
//!
//! ## Disabled mode
//!
//! With `cache_enabled = false` every lookup builds a fresh handle and
//! nothing is retained, so separate requests never alias each other.

use crate::config::SiteConfig;
use crate::page::Page;
use log::{debug, info};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
pub struct ContentCache {
    entries: HashMap<String, Rc<Page>>,
    /// Keys in insertion order.
    order: VecDeque<String>,
    limit: usize,
    enabled: bool,
    stats: CacheStats,
}

impl ContentCache {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            limit: limit.max(1),
            enabled: true,
            stats: CacheStats::default(),
        }
    }

    /// A cache that never retains anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(1)
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        if config.cache_enabled {
            Self::new(config.cache_limit)
        } else {
            Self::disabled()
        }
    }

    /// Return the handle cached for `uri`, or build and register one.
    ///
    /// A hit has its page number reset to 1; callers serving a paginated
    /// request set the number they need afterwards. If `build` fails the
    /// error is returned unchanged and nothing is cached.
    pub fn get_or_create<E, F>(&mut self, uri: &str, build: F) -> Result<Rc<Page>, E>
    where
        F: FnOnce() -> Result<Page, E>,
    {
        if !self.enabled {
            debug!("cache disabled, building {uri}");
            self.stats.miss();
            return build().map(Rc::new);
        }

        if let Some(page) = self.entries.get(uri) {
            debug!("cache hit: {uri}");
            self.stats.hit();
            page.set_page_num(1);
            return Ok(Rc::clone(page));
        }

        debug!("cache miss: {uri}");
        self.stats.miss();
        let page = Rc::new(build()?);
        self.entries.insert(uri.to_string(), Rc::clone(&page));
        self.order.push_back(uri.to_string());
        if self.entries.len() > self.limit {
            self.evict();
        }
        Ok(page)
    }

    /// Drop the oldest tenth of the limit, rounded up.
    fn evict(&mut self) {
        let count = self.limit.div_ceil(10);
        for _ in 0..count {
            let Some(uri) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&uri);
        }
        self.stats.evicted += count;
        info!(
            "content cache over limit {}: evicted {count} oldest entries, {} remain",
            self.limit,
            self.entries.len()
        );
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

/// Lookup counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evicted: usize,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> usize {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.evicted > 0 {
            write!(
                f,
                "{} cached, {} built, {} evicted ({} total)",
                self.hits,
                self.misses,
                self.evicted,
                self.total()
            )
        } else {
            write!(
                f,
                "{} cached, {} built ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        }
    }
}
