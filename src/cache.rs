// src/cache.rs

//! Timed caching of package metadata
//!
//! Resolving a package through the package-manager client is slow, and a
//! session resolves the same identity repeatedly. `TimedCache` owns one value
//! with the instant it was stored; `CachedPackageSource` keeps one per
//! package identity in front of another [`PackageSource`].

use crate::error::Result;
use crate::host::PackageSource;
use crate::package::{PackageId, PackageInfo};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// A single value that goes stale after a TTL
#[derive(Debug, Clone)]
pub struct TimedCache<T> {
    value: Option<(T, Instant)>,
    ttl: Duration,
}

impl<T> TimedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { value: None, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The value, if present and not older than the TTL
    pub fn get(&self) -> Option<&T> {
        self.get_at(Instant::now())
    }

    /// The value as seen at `now`
    pub fn get_at(&self, now: Instant) -> Option<&T> {
        match &self.value {
            Some((value, stored)) if now.saturating_duration_since(*stored) < self.ttl => Some(value),
            _ => None,
        }
    }

    pub fn set(&mut self, value: T) {
        self.set_at(value, Instant::now());
    }

    pub fn set_at(&mut self, value: T, now: Instant) {
        self.value = Some((value, now));
    }

    pub fn invalidate(&mut self) {
        self.value = None;
    }

    /// Whether a value is stored at all, fresh or not
    pub fn is_populated(&self) -> bool {
        self.value.is_some()
    }
}

/// [`PackageSource`] wrapper that remembers resolutions for a TTL
pub struct CachedPackageSource<S> {
    inner: S,
    ttl: Duration,
    entries: Mutex<HashMap<PackageId, TimedCache<PackageInfo>>>,
}

impl<S: PackageSource> CachedPackageSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the cached resolution of one package
    pub fn invalidate(&self, id: &PackageId) {
        self.entries.lock().remove(id);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: PackageSource> PackageSource for CachedPackageSource<S> {
    fn resolve(&self, id: &PackageId) -> Result<PackageInfo> {
        if let Some(info) = self.entries.lock().get(id).and_then(|c| c.get()) {
            debug!("Package cache hit for {}", id);
            return Ok(info.clone());
        }

        // Resolve without holding the lock; a concurrent miss just resolves twice
        let info = self.inner.resolve(id)?;

        let mut entries = self.entries.lock();
        let cache = entries
            .entry(id.clone())
            .or_insert_with(|| TimedCache::new(self.ttl));
        cache.set(info.clone());
        Ok(info)
    }
}
