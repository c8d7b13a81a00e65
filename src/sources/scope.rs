//! Manually driven release source and its RAII guard.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{ReleaseListener, ReleaseSource, ScopeEnd};

/// Where a release source is in its one-shot lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    /// No listener registered yet
    Idle,
    /// A listener is waiting for the end of the scope
    Registered,
    /// The listener was invoked and has not unregistered yet
    Fired,
    /// The listener unregistered; the source is spent
    Unregistered,
}

enum Slot {
    Idle,
    Registered(Arc<dyn ReleaseListener>),
    Fired,
    Unregistered,
}

/// Release source ended explicitly by its owner.
///
/// Call [`restart`](Self::restart) for a transient end (the listener receives
/// `can_retain = true`) or [`finish`](Self::finish) for a terminal one. Only
/// the first signal after registration reaches the listener, and only the
/// first listener is accepted: a source binds one request.
///
/// # Examples
///
/// ```
/// use ferrous_components::{Component, ComponentCache, InjectRequest, ReleaseState, ScopeReleaseSource};
/// use std::sync::Arc;
///
/// struct EditorComponent;
/// impl Component for EditorComponent {}
///
/// let cache = Arc::new(ComponentCache::new());
/// let scope = ScopeReleaseSource::new();
///
/// InjectRequest::new(cache.clone(), scope.clone())
///     .build(|| Ok(EditorComponent))
///     .unwrap();
/// assert_eq!(scope.state(), ReleaseState::Registered);
///
/// assert!(scope.finish());
/// assert_eq!(scope.state(), ReleaseState::Unregistered);
/// assert!(cache.is_empty());
///
/// // Spent: later signals are ignored
/// assert!(!scope.finish());
/// ```
pub struct ScopeReleaseSource {
    slot: Mutex<Slot>,
}

impl ScopeReleaseSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot::Idle),
        })
    }

    /// Signals a transient end. Returns whether a listener was notified.
    pub fn restart(&self) -> bool {
        self.end(ScopeEnd::Restart)
    }

    /// Signals a terminal end. Returns whether a listener was notified.
    pub fn finish(&self) -> bool {
        self.end(ScopeEnd::Terminal)
    }

    /// Delivers `end` to the registered listener, if any.
    ///
    /// The listener runs without the source's lock held, so it may call
    /// [`unregister_releaser`](ReleaseSource::unregister_releaser) from
    /// inside `on_release`.
    pub fn end(&self, end: ScopeEnd) -> bool {
        let listener = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Fired) {
                Slot::Registered(listener) => listener,
                other => {
                    *slot = other;
                    return false;
                }
            }
        };
        listener.on_release(end.can_retain());
        true
    }

    pub fn state(&self) -> ReleaseState {
        match *self.slot.lock() {
            Slot::Idle => ReleaseState::Idle,
            Slot::Registered(_) => ReleaseState::Registered,
            Slot::Fired => ReleaseState::Fired,
            Slot::Unregistered => ReleaseState::Unregistered,
        }
    }
}

impl ReleaseSource for ScopeReleaseSource {
    fn register_releaser(&self, listener: Arc<dyn ReleaseListener>) {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Idle) {
            tracing::warn!("release source already in use; ignoring listener, it will never fire");
            return;
        }
        *slot = Slot::Registered(listener);
    }

    fn unregister_releaser(&self) {
        *self.slot.lock() = Slot::Unregistered;
    }
}

impl std::fmt::Debug for ScopeReleaseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeReleaseSource")
            .field("state", &self.state())
            .finish()
    }
}

/// Ties a scope to the lifetime of a value.
///
/// Dropping the guard ends the scope terminally. [`restart`](Self::restart)
/// consumes the guard and ends it with a restart instead.
///
/// ```
/// use ferrous_components::{Component, ComponentCache, InjectRequest, ScopeGuard};
/// use std::sync::Arc;
///
/// struct WizardComponent;
/// impl Component for WizardComponent {}
///
/// let cache = Arc::new(ComponentCache::new());
///
/// let guard = ScopeGuard::new();
/// InjectRequest::new(cache.clone(), guard.source())
///     .retain_on_restart(true)
///     .build(|| Ok(WizardComponent))
///     .unwrap();
/// guard.restart();
/// assert_eq!(cache.len(), 1);
///
/// let guard = ScopeGuard::new();
/// InjectRequest::new(cache.clone(), guard.source())
///     .retain_on_restart(true)
///     .build(|| Ok(WizardComponent))
///     .unwrap();
/// drop(guard);
/// assert!(cache.is_empty());
/// ```
#[derive(Debug)]
pub struct ScopeGuard {
    source: Arc<ScopeReleaseSource>,
}

impl ScopeGuard {
    pub fn new() -> Self {
        Self {
            source: ScopeReleaseSource::new(),
        }
    }

    /// The source to bind requests to.
    pub fn source(&self) -> Arc<ScopeReleaseSource> {
        self.source.clone()
    }

    /// Ends the scope with a restart. Returns whether a listener was notified.
    pub fn restart(self) -> bool {
        // Drop still runs afterwards, against a spent source
        self.source.restart()
    }
}

impl Default for ScopeGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.source.finish();
    }
}
