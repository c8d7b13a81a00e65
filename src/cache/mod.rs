//! The component cache: lazily created instances grouped by component type
//! and keyed by disambiguator.
//!
//! Locking is two-level. The type map is behind an `RwLock` that is held
//! just long enough to find or install a group; each group guards its key map
//! with its own mutex; a running factory only holds its own slot. Lookups for
//! other keys and other types never wait on a factory.

mod group;

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::error::BoxError;
use crate::{ComponentType, DiError, DiResult, Observers};
use group::ComponentGroup;

/// Type-erased shared handle to a cached instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased component factory.
pub type ErasedFactory = Box<dyn FnOnce() -> Result<AnyArc, BoxError>>;

/// Snapshot of live keys per component type.
///
/// Groups stay registered once created, so a type whose instances were all
/// released maps to an empty list.
pub type ComponentGroups = HashMap<ComponentType, Vec<String>>;

/// Erases a typed factory for [`ComponentCache::get_or_create_any`] and
/// [`InjectRequest::build_dyn`](crate::InjectRequest::build_dyn).
pub fn erase_factory<T, F>(factory: F) -> ErasedFactory
where
    T: Send + Sync + 'static,
    F: FnOnce() -> Result<T, BoxError> + 'static,
{
    Box::new(move || factory().map(|instance| Arc::new(instance) as AnyArc))
}

/// Cache of scope-bound components.
///
/// Each (type, key) pair holds at most one live instance. The first lookup
/// runs the factory; every later lookup until the matching release returns a
/// clone of the same `Arc`. Concurrent first lookups for the same pair run the
/// factory once and all receive its result.
///
/// # Examples
///
/// ```
/// use ferrous_components::ComponentCache;
/// use std::sync::Arc;
///
/// struct GreetingsGenerator {
///     greetings: Vec<&'static str>,
/// }
///
/// let cache = ComponentCache::new();
///
/// let first = cache
///     .get_or_create::<GreetingsGenerator, _>(|| Ok(GreetingsGenerator { greetings: vec!["Hello", "Salut"] }))
///     .unwrap();
/// let second = cache
///     .get_or_create::<GreetingsGenerator, _>(|| unreachable!("already cached"))
///     .unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(first.greetings.len(), 2);
///
/// // Separate instances of the same type under explicit keys
/// let left = cache.get_or_create_keyed::<u64, _>("left", || Ok(1)).unwrap();
/// let right = cache.get_or_create_keyed::<u64, _>("right", || Ok(2)).unwrap();
/// assert_ne!(*left, *right);
///
/// assert!(cache.release::<GreetingsGenerator>());
/// assert!(!cache.release::<GreetingsGenerator>()); // already gone, no error
/// ```
pub struct ComponentCache {
    groups: RwLock<HashMap<ComponentType, Arc<ComponentGroup>>>,
    observers: Observers,
    counters: Counters,
}

impl ComponentCache {
    /// Creates an empty cache without observers.
    pub fn new() -> Self {
        Self::with_observers(Observers::new())
    }

    /// Creates an empty cache that reports to `observers`.
    pub fn with_observers(observers: Observers) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            observers,
            counters: Counters::default(),
        }
    }

    /// Returns the instance cached for `T` under the canonical key, creating
    /// it with `factory` on a miss.
    pub fn get_or_create<T, F>(&self, factory: F) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, BoxError>,
    {
        let ty = ComponentType::of::<T>();
        self.get_or_create_keyed(ty.canonical_key(), factory)
    }

    /// Returns the instance cached for `T` under `key`, creating it with
    /// `factory` on a miss.
    ///
    /// The factory runs at most once per (type, key) until the entry is
    /// released. If it fails, the error is returned as
    /// [`DiError::Creation`] and nothing is cached.
    pub fn get_or_create_keyed<T, F>(&self, key: &str, factory: F) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, BoxError>,
    {
        let ty = ComponentType::of::<T>();
        let instance = self.get_or_create_with(ty, key, move || {
            factory().map(|instance| Arc::new(instance) as AnyArc)
        })?;
        downcast::<T>(instance)
    }

    /// Type-erased form of [`get_or_create_keyed`](Self::get_or_create_keyed).
    pub fn get_or_create_any(
        &self,
        ty: ComponentType,
        key: &str,
        factory: ErasedFactory,
    ) -> DiResult<AnyArc> {
        self.get_or_create_with(ty, key, factory)
    }

    fn get_or_create_with<F>(&self, ty: ComponentType, key: &str, factory: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> Result<AnyArc, BoxError>,
    {
        let group = self.group(ty);
        let slot = group.slot(key);

        // Fast path: already created
        if let Some(instance) = slot.get() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            self.observers.hit(&ty, key);
            return Ok(instance.clone());
        }

        let mut elapsed = None;
        let result = slot.get_or_try_init(|| {
            self.observers.creating(&ty, key);
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            let start = Instant::now();
            let created = factory().map_err(DiError::creation);
            elapsed = Some(start.elapsed());
            created
        })
        .cloned();

        match result {
            Ok(instance) => {
                match elapsed {
                    Some(duration) => {
                        self.counters.creations.fetch_add(1, Ordering::Relaxed);
                        self.observers.created(&ty, key, duration);
                    }
                    // Another caller finished the slot while we waited on it
                    None => {
                        self.counters.hits.fetch_add(1, Ordering::Relaxed);
                        self.observers.hit(&ty, key);
                    }
                }
                Ok(instance)
            }
            Err(err) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                self.observers.creation_failed(&ty, key, &err);
                drop(slot);
                group.discard_if_vacant(key);
                Err(err)
            }
        }
    }

    /// Releases the instance cached for `T` under the canonical key.
    ///
    /// Returns whether an instance was evicted; releasing an absent entry is
    /// a no-op.
    pub fn release<T: 'static>(&self) -> bool {
        let ty = ComponentType::of::<T>();
        self.release_any(ty, ty.canonical_key())
    }

    /// Releases the instance cached for `T` under `key`.
    pub fn release_keyed<T: 'static>(&self, key: &str) -> bool {
        self.release_any(ComponentType::of::<T>(), key)
    }

    /// Type-erased form of [`release_keyed`](Self::release_keyed).
    pub fn release_any(&self, ty: ComponentType, key: &str) -> bool {
        let Some(group) = self.existing_group(&ty) else {
            return false;
        };
        match group.remove(key) {
            Some(_evicted) => {
                self.counters.releases.fetch_add(1, Ordering::Relaxed);
                self.observers.released(&ty, key);
                true
            }
            None => false,
        }
    }

    /// Returns the instance cached for `T` under `key` without creating it.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.get_any(&ComponentType::of::<T>(), key)?.downcast::<T>().ok()
    }

    /// Type-erased form of [`get`](Self::get).
    pub fn get_any(&self, ty: &ComponentType, key: &str) -> Option<AnyArc> {
        self.existing_group(ty)?.peek(key)
    }

    /// True if a live instance is cached for (`ty`, `key`).
    pub fn contains_any(&self, ty: &ComponentType, key: &str) -> bool {
        self.get_any(ty, key).is_some()
    }

    /// Number of live instances cached for `ty`.
    pub fn group_len(&self, ty: &ComponentType) -> usize {
        self.existing_group(ty).map_or(0, |group| group.len())
    }

    /// Snapshot of the live keys of every known component type.
    pub fn component_groups(&self) -> ComponentGroups {
        let groups = self.groups.read();
        groups
            .iter()
            .map(|(ty, group)| (*ty, group.live_keys()))
            .collect()
    }

    /// Total number of live instances.
    pub fn len(&self) -> usize {
        self.groups.read().values().map(|group| group.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts every live instance and returns how many were dropped.
    ///
    /// Creations in flight while clearing complete normally and stay cached.
    pub fn clear(&self) -> usize {
        let groups: Vec<(ComponentType, Arc<ComponentGroup>)> = self
            .groups
            .read()
            .iter()
            .map(|(ty, group)| (*ty, group.clone()))
            .collect();

        let mut cleared = 0;
        for (ty, group) in groups {
            for key in group.drain_live() {
                self.counters.releases.fetch_add(1, Ordering::Relaxed);
                self.observers.released(&ty, &key);
                cleared += 1;
            }
        }
        cleared
    }

    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            creations: self.counters.creations.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            releases: self.counters.releases.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }

    fn group(&self, ty: ComponentType) -> Arc<ComponentGroup> {
        if let Some(group) = self.groups.read().get(&ty) {
            return group.clone();
        }
        self.groups.write().entry(ty).or_default().clone()
    }

    fn existing_group(&self, ty: &ComponentType) -> Option<Arc<ComponentGroup>> {
        self.groups.read().get(ty).cloned()
    }
}

impl Default for ComponentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentCache")
            .field("groups", &self.groups.read().len())
            .field("observers", &self.observers)
            .field("stats", &self.stats())
            .finish()
    }
}

fn downcast<T: Send + Sync + 'static>(instance: AnyArc) -> DiResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    creations: AtomicU64,
    failures: AtomicU64,
    releases: AtomicU64,
}

/// Cache counters, useful for checking how often scopes actually reuse
/// their components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from an existing instance
    pub hits: u64,
    /// Lookups that ran a factory
    pub misses: u64,
    /// Factories that produced an instance
    pub creations: u64,
    /// Factories that returned an error
    pub failures: u64,
    /// Instances evicted by release or clear
    pub releases: u64,
}

impl CacheStats {
    /// Total number of successful or attempted lookups.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups served from the cache.
    pub fn hit_ratio(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    /// Time-independent summary line.
    pub fn summary(&self) -> String {
        format!(
            "{} lookups, {} hits ({:.1}%), {} created, {} failed, {} released",
            self.lookups(),
            self.hits,
            self.hit_ratio() * 100.0,
            self.creations,
            self.failures,
            self.releases
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_creation_leaves_no_slot() {
        let cache = ComponentCache::new();
        let err = cache
            .get_or_create::<String, _>(|| Err("boom".into()))
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(cache.is_empty());
        assert_eq!(cache.component_groups()[&ComponentType::of::<String>()], Vec::<String>::new());

        let value = cache.get_or_create::<String, _>(|| Ok("ok".to_string())).unwrap();
        assert_eq!(*value, "ok");
    }

    #[test]
    fn racing_failures_leave_no_empty_slot() {
        use std::sync::Barrier;

        const THREADS: usize = 8;
        let cache = Arc::new(ComponentCache::new());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_create_keyed::<String, _>("flaky", || {
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        Err("unavailable".into())
                    })
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_err());
        }

        let group = cache.existing_group(&ComponentType::of::<String>()).unwrap();
        assert_eq!(group.slot_count(), 0);
        assert_eq!(cache.stats().failures, THREADS as u64);
    }

    #[test]
    fn erased_instance_of_wrong_type_is_a_mismatch() {
        let cache = ComponentCache::new();
        let ty = ComponentType::of::<u32>();
        cache
            .get_or_create_any(ty, ty.canonical_key(), Box::new(|| Ok(Arc::new("text") as AnyArc)))
            .unwrap();

        match cache.get_or_create::<u32, _>(|| Ok(1)) {
            Err(DiError::TypeMismatch(name)) => assert_eq!(name, "u32"),
            other => panic!("expected mismatch, got {:?}", other.map(|v| *v)),
        }
        assert!(cache.get::<u32>(ty.canonical_key()).is_none());
    }

    #[test]
    fn stats_track_hits_and_creations() {
        let cache = ComponentCache::new();
        cache.get_or_create::<u8, _>(|| Ok(1)).unwrap();
        cache.get_or_create::<u8, _>(|| Ok(2)).unwrap();
        cache.get_or_create::<u8, _>(|| Ok(3)).unwrap();
        let _ = cache.get_or_create::<u16, _>(|| Err("nope".into()));
        cache.release::<u8>();

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.creations, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.lookups(), 4);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn clear_reports_every_live_instance() {
        let cache = ComponentCache::new();
        cache.get_or_create_keyed::<u8, _>("a", || Ok(1)).unwrap();
        cache.get_or_create_keyed::<u8, _>("b", || Ok(2)).unwrap();
        cache.get_or_create::<u16, _>(|| Ok(3)).unwrap();

        assert_eq!(cache.clear(), 3);
        assert!(cache.is_empty());
        assert_eq!(cache.component_groups().len(), 2);
    }
}
