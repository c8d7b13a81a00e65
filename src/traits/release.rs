//! The release contract between a lifecycle source and a bound request.

use std::sync::Arc;

/// How a bound scope ended.
///
/// ```
/// use ferrous_components::ScopeEnd;
///
/// assert!(ScopeEnd::Restart.can_retain());
/// assert!(!ScopeEnd::Terminal.can_retain());
/// assert_eq!(ScopeEnd::from_can_retain(true), ScopeEnd::Restart);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeEnd {
    /// Transient end, such as a reconfiguration; the scope comes back
    Restart,
    /// The scope is gone for good
    Terminal,
}

impl ScopeEnd {
    /// The hint delivered to [`ReleaseListener::on_release`].
    pub fn can_retain(self) -> bool {
        matches!(self, ScopeEnd::Restart)
    }

    pub fn from_can_retain(can_retain: bool) -> Self {
        if can_retain {
            ScopeEnd::Restart
        } else {
            ScopeEnd::Terminal
        }
    }
}

/// Receives the one-shot end-of-scope signal.
pub trait ReleaseListener: Send + Sync {
    /// Called once when the bound scope ends.
    ///
    /// `can_retain` is true when the end is a transient restart the caller
    /// may choose to survive, false when it is terminal.
    fn on_release(&self, can_retain: bool);
}

/// A lifecycle that can tell a request when its scope ends.
///
/// Implementations move through `Idle -> Registered -> Fired -> Unregistered`.
/// After [`register_releaser`](Self::register_releaser) the source must call
/// `on_release` exactly once. The listener answers by calling
/// [`unregister_releaser`](Self::unregister_releaser), usually synchronously
/// from inside `on_release`, so implementations must not hold a lock while
/// they invoke the listener. Registering again after firing is unsupported.
///
/// Requests keep only a weak handle to their source. The owner keeps the
/// source alive until it fires; dropping an unfired source drops its
/// listener, and with it the listener's handle to the cache.
///
/// # Examples
///
/// ```
/// use ferrous_components::{ReleaseListener, ReleaseSource};
/// use parking_lot::Mutex;
/// use std::sync::Arc;
///
/// /// Ends the scope when the connection it was created for closes.
/// #[derive(Default)]
/// struct ConnectionLifecycle {
///     listener: Mutex<Option<Arc<dyn ReleaseListener>>>,
/// }
///
/// impl ConnectionLifecycle {
///     fn on_closed(&self, reconnecting: bool) {
///         let listener = self.listener.lock().clone();
///         if let Some(listener) = listener {
///             listener.on_release(reconnecting);
///         }
///     }
/// }
///
/// impl ReleaseSource for ConnectionLifecycle {
///     fn register_releaser(&self, listener: Arc<dyn ReleaseListener>) {
///         *self.listener.lock() = Some(listener);
///     }
///
///     fn unregister_releaser(&self) {
///         self.listener.lock().take();
///     }
/// }
/// ```
pub trait ReleaseSource: Send + Sync {
    /// Starts observing the bound scope on behalf of `listener`.
    fn register_releaser(&self, listener: Arc<dyn ReleaseListener>);

    /// Stops observing and drops the listener and any scope reference.
    fn unregister_releaser(&self);
}
