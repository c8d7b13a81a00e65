//! Scoped inject requests: fetch-or-create a component and evict it when the
//! bound lifecycle ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::cache::{AnyArc, ErasedFactory};
use crate::error::BoxError;
use crate::{
    Component, ComponentCache, ComponentCheck, ComponentType, DiError, DiResult, Disambiguator,
    MarkerCheck, ReleaseListener, ReleaseSource,
};

/// Per-request policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct RequestOptions {
    /// Keep the component when the scope ends with a restart
    pub retain_on_restart: bool,
    /// Which instance of the component type the request binds to
    pub disambiguator: Disambiguator,
}

impl RequestOptions {
    /// Eviction decision for a release signal.
    ///
    /// ```
    /// use ferrous_components::RequestOptions;
    ///
    /// let retaining = RequestOptions { retain_on_restart: true, ..Default::default() };
    /// assert!(!retaining.should_evict(true));
    /// assert!(retaining.should_evict(false));
    ///
    /// let default = RequestOptions::default();
    /// assert!(default.should_evict(true));
    /// assert!(default.should_evict(false));
    /// ```
    pub fn should_evict(&self, can_retain: bool) -> bool {
        should_evict(can_retain, self.retain_on_restart)
    }
}

fn should_evict(can_retain: bool, retain_on_restart: bool) -> bool {
    !(can_retain && retain_on_restart)
}

/// A request to obtain a component whose cached instance is released when
/// the bound [`ReleaseSource`] signals the end of its scope.
///
/// A request is configured with chained calls and consumed by
/// [`build`](Self::build), which returns the cached instance (creating it on a
/// miss) and registers a one-shot release listener with the source.
///
/// When the source fires, the listener evicts the instance unless the signal
/// says the scope is only restarting and the request asked to
/// [`retain_on_restart`](Self::retain_on_restart). Either way it then calls
/// [`ReleaseSource::unregister_releaser`].
///
/// Keep in mind that a retained component keeps everything it references
/// alive across the restart, including anything tied to the old scope.
///
/// # Examples
///
/// ```
/// use ferrous_components::{Component, ComponentCache, InjectRequest, ScopeReleaseSource};
/// use std::sync::Arc;
///
/// struct MainComponent {
///     greeting: String,
/// }
/// impl Component for MainComponent {}
///
/// let cache = Arc::new(ComponentCache::new());
///
/// // First scope instance
/// let scope = ScopeReleaseSource::new();
/// let component = InjectRequest::new(cache.clone(), scope.clone())
///     .retain_on_restart(true)
///     .build(|| Ok(MainComponent { greeting: "Hello".into() }))?;
///
/// // A restart keeps the component...
/// scope.restart();
/// assert!(cache.get::<MainComponent>(std::any::type_name::<MainComponent>()).is_some());
///
/// // ...so the next scope instance gets the same one back
/// let next_scope = ScopeReleaseSource::new();
/// let again = InjectRequest::new(cache.clone(), next_scope.clone())
///     .retain_on_restart(true)
///     .build(|| Ok(MainComponent { greeting: "Salut".into() }))?;
/// assert!(Arc::ptr_eq(&component, &again));
/// assert_eq!(again.greeting, "Hello");
///
/// // A terminal end evicts it
/// next_scope.finish();
/// assert!(cache.is_empty());
/// # Ok::<(), ferrous_components::DiError>(())
/// ```
pub struct InjectRequest {
    cache: Arc<ComponentCache>,
    source: Arc<dyn ReleaseSource>,
    check: Arc<dyn ComponentCheck>,
    options: RequestOptions,
}

impl InjectRequest {
    /// Creates a request bound to `cache` and `source`, with default options
    /// and the compile-time marker as the only capability check.
    pub fn new(cache: Arc<ComponentCache>, source: Arc<dyn ReleaseSource>) -> Self {
        Self {
            cache,
            source,
            check: Arc::new(MarkerCheck),
            options: RequestOptions::default(),
        }
    }

    /// Replaces the capability check, e.g. with a
    /// [`ComponentRegistry`](crate::ComponentRegistry).
    pub fn with_check(mut self, check: Arc<dyn ComponentCheck>) -> Self {
        self.check = check;
        self
    }

    /// Replaces every option at once.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether a release signal with `can_retain = true` keeps the component.
    pub fn retain_on_restart(mut self, retain_on_restart: bool) -> Self {
        self.options.retain_on_restart = retain_on_restart;
        self
    }

    /// Binds the request to the instance stored under `key`, so several
    /// instances of one component type can live side by side.
    pub fn allow_duplicates(mut self, key: impl Into<String>) -> Self {
        self.options.disambiguator = Disambiguator::Named(key.into());
        self
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Returns the component cached for this request, creating it with
    /// `factory` on a miss, and binds its eviction to the release source.
    ///
    /// # Errors
    ///
    /// - [`DiError::InvalidArgument`] if `T` fails the capability check. The
    ///   cache is not touched and nothing is registered.
    /// - [`DiError::Creation`] if the factory fails. Nothing is registered.
    pub fn build<T, F>(self, factory: F) -> DiResult<Arc<T>>
    where
        T: Component,
        F: FnOnce() -> Result<T, BoxError>,
    {
        self.bind(ComponentType::of::<T>(), |cache, key| {
            cache.get_or_create_keyed::<T, F>(key, factory)
        })
    }

    /// Type-erased form of [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// [`DiError::InvalidArgument`] if `ty` or `factory` is `None`, or if `ty`
    /// fails the capability check; [`DiError::Creation`] if the factory fails.
    pub fn build_dyn(
        self,
        ty: Option<ComponentType>,
        factory: Option<ErasedFactory>,
    ) -> DiResult<AnyArc> {
        let (ty, factory) = match (ty, factory) {
            (Some(ty), Some(factory)) => (ty, factory),
            _ => {
                return Err(DiError::InvalidArgument(
                    "Component type or factory is not provided".to_string(),
                ))
            }
        };
        self.bind(ty, move |cache, key| cache.get_or_create_any(ty, key, factory))
    }

    fn bind<R>(
        self,
        ty: ComponentType,
        get_or_create: impl FnOnce(&ComponentCache, &str) -> DiResult<R>,
    ) -> DiResult<R> {
        if !self.check.is_registered_component(&ty) {
            return Err(DiError::InvalidArgument(format!(
                "{} is not a registered component",
                ty.name()
            )));
        }

        let key = self.options.disambiguator.resolve(&ty);
        let instance = get_or_create(&*self.cache, &*key)?;

        let releaser = ScopedReleaser {
            cache: self.cache,
            source: Arc::downgrade(&self.source),
            ty,
            key: key.into_owned(),
            retain_on_restart: self.options.retain_on_restart,
            fired: AtomicBool::new(false),
        };
        self.source.register_releaser(Arc::new(releaser));
        Ok(instance)
    }
}

impl std::fmt::Debug for InjectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectRequest")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Release listener registered by [`InjectRequest::build`].
///
/// Holds exactly what the eviction needs. The source owns the listener until
/// `unregister_releaser`; the listener only points back at the source weakly,
/// so a source dropped without firing frees the listener and its cache handle.
struct ScopedReleaser {
    cache: Arc<ComponentCache>,
    source: Weak<dyn ReleaseSource>,
    ty: ComponentType,
    key: String,
    retain_on_restart: bool,
    fired: AtomicBool,
}

impl ReleaseListener for ScopedReleaser {
    fn on_release(&self, can_retain: bool) {
        if self.fired.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                component = self.ty.name(),
                key = %self.key,
                "release signal delivered twice; ignoring"
            );
            return;
        }

        if should_evict(can_retain, self.retain_on_restart) {
            let evicted = self.cache.release_any(self.ty, &self.key);
            tracing::debug!(
                component = self.ty.name(),
                key = %self.key,
                can_retain,
                evicted,
                "scope ended, component released"
            );
        } else {
            self.cache.observers().retained(&self.ty, &self.key);
            tracing::debug!(
                component = self.ty.name(),
                key = %self.key,
                "scope restarting, component retained"
            );
        }

        if let Some(source) = self.source.upgrade() {
            source.unregister_releaser();
        }
    }
}
