//! The injector: an explicitly owned cache plus the defaults every request
//! starts from.

use std::sync::Arc;

use crate::{
    CacheObserver, ComponentCache, ComponentCheck, ComponentGroups, ComponentRegistry,
    InjectRequest, InjectorOptions, LoggingObserver, MarkerCheck, Observers, ReleaseSource,
    RequestOptions,
};

/// Entry point that owns one [`ComponentCache`] and hands out requests bound
/// to it.
///
/// Share it as `Arc<Injector>` or pass it by reference; there is no hidden
/// global. See [`global`](crate::global) for an explicit process-wide
/// instance.
///
/// # Examples
///
/// ```
/// use ferrous_components::{Component, Injector, ScopeGuard};
///
/// struct ProfileComponent {
///     user: String,
/// }
/// impl Component for ProfileComponent {}
///
/// let injector = Injector::new();
///
/// {
///     let guard = ScopeGuard::new();
///     let profile = injector
///         .with(guard.source())
///         .build(|| Ok(ProfileComponent { user: "ada".into() }))
///         .unwrap();
///     assert_eq!(profile.user, "ada");
///     assert_eq!(injector.cache().len(), 1);
/// } // guard dropped: terminal end of the scope
///
/// assert!(injector.cache().is_empty());
/// ```
pub struct Injector {
    cache: Arc<ComponentCache>,
    check: Arc<dyn ComponentCheck>,
    defaults: RequestOptions,
}

impl Injector {
    /// Injector with default options, no observers and marker-only checking.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::default()
    }

    /// Starts a request bound to `source`, pre-configured with this
    /// injector's defaults.
    pub fn with(&self, source: Arc<dyn ReleaseSource>) -> InjectRequest {
        InjectRequest::new(self.cache.clone(), source)
            .with_check(self.check.clone())
            .with_options(self.defaults.clone())
    }

    pub fn cache(&self) -> &Arc<ComponentCache> {
        &self.cache
    }

    /// Options every request starts from.
    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    /// Snapshot of the live keys per component type.
    pub fn component_groups(&self) -> ComponentGroups {
        self.cache.component_groups()
    }

    /// Drops every cached component. Returns how many were evicted.
    pub fn clear_components(&self) -> usize {
        self.cache.clear()
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("cache", &self.cache)
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Builder for [`Injector`].
///
/// ```
/// use ferrous_components::{Component, ComponentRegistry, Injector, InjectorOptions};
///
/// struct CartComponent;
/// impl Component for CartComponent {}
///
/// let registry = ComponentRegistry::new();
/// registry.register::<CartComponent>();
///
/// let injector = Injector::builder()
///     .registry(registry)
///     .options(InjectorOptions { retain_on_restart: true, log_events: true })
///     .build();
///
/// assert!(injector.defaults().retain_on_restart);
/// ```
#[derive(Default)]
pub struct InjectorBuilder {
    check: Option<Arc<dyn ComponentCheck>>,
    observers: Observers,
    options: InjectorOptions,
}

impl InjectorBuilder {
    /// Only types registered in `registry` may be requested.
    pub fn registry(self, registry: ComponentRegistry) -> Self {
        self.check(Arc::new(registry))
    }

    /// Uses a custom capability check.
    pub fn check(mut self, check: Arc<dyn ComponentCheck>) -> Self {
        self.check = Some(check);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn options(mut self, options: InjectorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Injector {
        let mut observers = self.observers;
        if self.options.log_events {
            observers.add(Arc::new(LoggingObserver::new()));
        }

        Injector {
            cache: Arc::new(ComponentCache::with_observers(observers)),
            check: self.check.unwrap_or_else(|| Arc::new(MarkerCheck)),
            defaults: RequestOptions {
                retain_on_restart: self.options.retain_on_restart,
                ..RequestOptions::default()
            },
        }
    }
}

/// Explicit process-wide injector.
///
/// Nothing is created implicitly: call [`init`] once at startup and
/// [`shutdown`] when the process no longer needs its components.
///
/// ```
/// use ferrous_components::{global, Injector};
///
/// let injector = global::init(Injector::new()).unwrap();
/// assert!(global::init(Injector::new()).is_err());
///
/// injector.cache().get_or_create::<u32, _>(|| Ok(1)).unwrap();
/// assert!(global::instance().is_some());
///
/// global::shutdown();
/// assert!(global::instance().is_none());
/// assert!(injector.cache().is_empty());
/// ```
pub mod global {
    use std::sync::Arc;

    use parking_lot::RwLock;

    use super::Injector;
    use crate::{DiError, DiResult};

    static INSTANCE: RwLock<Option<Arc<Injector>>> = parking_lot::const_rwlock(None);

    /// Installs `injector` as the process-wide instance.
    ///
    /// # Errors
    ///
    /// [`DiError::AlreadyInitialized`] if an instance is installed; call
    /// [`shutdown`] first to replace it.
    pub fn init(injector: Injector) -> DiResult<Arc<Injector>> {
        let mut slot = INSTANCE.write();
        if slot.is_some() {
            return Err(DiError::AlreadyInitialized);
        }
        let injector = Arc::new(injector);
        *slot = Some(injector.clone());
        tracing::debug!("process-wide injector initialized");
        Ok(injector)
    }

    /// Returns the installed instance, if any.
    pub fn instance() -> Option<Arc<Injector>> {
        INSTANCE.read().clone()
    }

    /// Uninstalls the instance and drops every component it cached.
    ///
    /// Returns the uninstalled injector so outstanding handles can be
    /// inspected; `None` if nothing was installed.
    pub fn shutdown() -> Option<Arc<Injector>> {
        let injector = INSTANCE.write().take()?;
        let cleared = injector.clear_components();
        tracing::debug!(cleared, "process-wide injector shut down");
        Some(injector)
    }
}
