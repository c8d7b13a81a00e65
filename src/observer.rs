//! Diagnostic observers for component cache events.
//!
//! Observers see every creation, hit, failure, eviction and retain decision.
//! They run synchronously on the calling thread, so implementations should
//! stay cheap.

use std::sync::Arc;
use std::time::Duration;

use crate::{ComponentType, DiError};

/// Observer trait for component cache events.
///
/// Only `created`, `creation_failed` and `released` are required; the
/// remaining hooks default to no-ops.
///
/// # Examples
///
/// ```
/// use ferrous_components::{CacheObserver, ComponentType, DiError, Injector};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CountingObserver {
///     created: AtomicUsize,
/// }
///
/// impl CacheObserver for CountingObserver {
///     fn created(&self, _ty: &ComponentType, _key: &str, _duration: Duration) {
///         self.created.fetch_add(1, Ordering::Relaxed);
///     }
///
///     fn creation_failed(&self, _ty: &ComponentType, _key: &str, _error: &DiError) {}
///
///     fn released(&self, _ty: &ComponentType, _key: &str) {}
/// }
///
/// let observer = Arc::new(CountingObserver::default());
/// let injector = Injector::builder().observer(observer.clone()).build();
///
/// injector.cache().get_or_create::<u32, _>(|| Ok(7)).unwrap();
/// injector.cache().get_or_create::<u32, _>(|| Ok(8)).unwrap();
/// assert_eq!(observer.created.load(Ordering::Relaxed), 1);
/// ```
pub trait CacheObserver: Send + Sync {
    /// Called before a factory runs for a missing slot.
    fn creating(&self, _ty: &ComponentType, _key: &str) {}

    /// Called after a factory produced and installed an instance.
    fn created(&self, ty: &ComponentType, key: &str, duration: Duration);

    /// Called when a lookup is served from the cache.
    fn hit(&self, _ty: &ComponentType, _key: &str) {}

    /// Called when a factory returned an error. The slot stays empty.
    fn creation_failed(&self, ty: &ComponentType, key: &str, error: &DiError);

    /// Called when an instance was evicted.
    fn released(&self, ty: &ComponentType, key: &str);

    /// Called when a release signal was answered by keeping the instance.
    fn retained(&self, _ty: &ComponentType, _key: &str) {}
}

/// A cloneable fan-out list of observers.
#[derive(Clone, Default)]
pub struct Observers {
    observers: Vec<Arc<dyn CacheObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer; it receives every subsequent event.
    pub fn add(&mut self, observer: Arc<dyn CacheObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn creating(&self, ty: &ComponentType, key: &str) {
        for observer in &self.observers {
            observer.creating(ty, key);
        }
    }

    pub(crate) fn created(&self, ty: &ComponentType, key: &str, duration: Duration) {
        for observer in &self.observers {
            observer.created(ty, key, duration);
        }
    }

    pub(crate) fn hit(&self, ty: &ComponentType, key: &str) {
        for observer in &self.observers {
            observer.hit(ty, key);
        }
    }

    pub(crate) fn creation_failed(&self, ty: &ComponentType, key: &str, error: &DiError) {
        for observer in &self.observers {
            observer.creation_failed(ty, key, error);
        }
    }

    pub(crate) fn released(&self, ty: &ComponentType, key: &str) {
        for observer in &self.observers {
            observer.released(ty, key);
        }
    }

    pub(crate) fn retained(&self, ty: &ComponentType, key: &str) {
        for observer in &self.observers {
            observer.retained(ty, key);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.observers.len())
            .finish()
    }
}

/// Observer that forwards every event to `tracing`.
///
/// Creations, evictions and retains log at `debug`, hits at `trace` and
/// factory failures at `warn`. Each event carries `component` and `key`
/// fields.
///
/// ```
/// use ferrous_components::{Injector, LoggingObserver};
/// use std::sync::Arc;
///
/// let injector = Injector::builder()
///     .observer(Arc::new(LoggingObserver::new()))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a new logging observer with default prefix.
    pub fn new() -> Self {
        Self {
            prefix: "[ferrous-components]".to_string(),
        }
    }

    /// Creates a new logging observer with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheObserver for LoggingObserver {
    fn creating(&self, ty: &ComponentType, key: &str) {
        tracing::trace!(component = ty.name(), key, "{} Creating", self.prefix);
    }

    fn created(&self, ty: &ComponentType, key: &str, duration: Duration) {
        tracing::debug!(component = ty.name(), key, ?duration, "{} Created", self.prefix);
    }

    fn hit(&self, ty: &ComponentType, key: &str) {
        tracing::trace!(component = ty.name(), key, "{} Cache hit", self.prefix);
    }

    fn creation_failed(&self, ty: &ComponentType, key: &str, error: &DiError) {
        tracing::warn!(component = ty.name(), key, %error, "{} Creation failed", self.prefix);
    }

    fn released(&self, ty: &ComponentType, key: &str) {
        tracing::debug!(component = ty.name(), key, "{} Released", self.prefix);
    }

    fn retained(&self, ty: &ComponentType, key: &str) {
        tracing::debug!(component = ty.name(), key, "{} Retained across restart", self.prefix);
    }
}
