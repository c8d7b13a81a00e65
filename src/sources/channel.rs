//! Release source driven by a tokio oneshot channel.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{DiError, DiResult, ReleaseListener, ReleaseSource, ScopeEnd};

/// Sending half of a [`ChannelReleaseSource`].
///
/// Dropping it without sending ends the scope terminally.
#[derive(Debug)]
pub struct ScopeEndSender {
    tx: oneshot::Sender<ScopeEnd>,
}

impl ScopeEndSender {
    /// Ends the scope. Returns false if the source is already gone.
    pub fn send(self, end: ScopeEnd) -> bool {
        self.tx.send(end).is_ok()
    }

    pub fn restart(self) -> bool {
        self.send(ScopeEnd::Restart)
    }

    pub fn finish(self) -> bool {
        self.send(ScopeEnd::Terminal)
    }
}

/// Release source whose scope is ended by a message from any task or thread.
///
/// Registration spawns a task on the captured runtime that waits for the
/// [`ScopeEndSender`]; the listener runs on that task. Unregistering aborts
/// the wait if it has not fired yet.
///
/// # Examples
///
/// ```
/// use ferrous_components::{ChannelReleaseSource, Component, ComponentCache, InjectRequest};
/// use std::sync::Arc;
///
/// struct RequestComponent;
/// impl Component for RequestComponent {}
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), ferrous_components::DiError> {
/// let cache = Arc::new(ComponentCache::new());
/// let (source, sender) = ChannelReleaseSource::new()?;
///
/// InjectRequest::new(cache.clone(), source.clone()).build(|| Ok(RequestComponent))?;
/// assert_eq!(cache.len(), 1);
///
/// sender.finish();
/// source.released().await;
/// assert!(cache.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct ChannelReleaseSource {
    handle: Handle,
    inner: Mutex<Inner>,
    done: tokio::sync::Notify,
}

struct Inner {
    rx: Option<oneshot::Receiver<ScopeEnd>>,
    task: Option<JoinHandle<()>>,
    unregistered: bool,
}

impl ChannelReleaseSource {
    /// Creates a source on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// [`DiError::NoRuntime`] when called outside a runtime.
    pub fn new() -> DiResult<(Arc<Self>, ScopeEndSender)> {
        let handle = Handle::try_current().map_err(|_| DiError::NoRuntime)?;
        Ok(Self::with_handle(handle))
    }

    /// Creates a source that spawns its waiter on `handle`.
    pub fn with_handle(handle: Handle) -> (Arc<Self>, ScopeEndSender) {
        let (tx, rx) = oneshot::channel();
        let source = Arc::new(Self {
            handle,
            inner: Mutex::new(Inner {
                rx: Some(rx),
                task: None,
                unregistered: false,
            }),
            done: tokio::sync::Notify::new(),
        });
        (source, ScopeEndSender { tx })
    }

    /// True once the listener has unregistered.
    pub fn is_unregistered(&self) -> bool {
        self.inner.lock().unregistered
    }

    /// Waits until the listener has unregistered.
    pub async fn released(&self) {
        loop {
            let notified = self.done.notified();
            if self.is_unregistered() {
                return;
            }
            notified.await;
        }
    }
}

impl ReleaseSource for ChannelReleaseSource {
    fn register_releaser(&self, listener: Arc<dyn ReleaseListener>) {
        let mut inner = self.inner.lock();
        let Some(rx) = inner.rx.take() else {
            tracing::warn!("channel release source already registered; ignoring listener");
            return;
        };
        let task = self.handle.spawn(async move {
            // A dropped sender ends the scope for good
            let end = rx.await.unwrap_or(ScopeEnd::Terminal);
            listener.on_release(end.can_retain());
        });
        inner.task = Some(task);
    }

    fn unregister_releaser(&self) {
        {
            let mut inner = self.inner.lock();
            // The waiter calling this from its own task has no await left to cancel
            if let Some(task) = inner.task.take() {
                task.abort();
            }
            inner.unregistered = true;
        }
        self.done.notify_waiters();
    }
}

impl std::fmt::Debug for ChannelReleaseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelReleaseSource")
            .field("unregistered", &self.is_unregistered())
            .finish_non_exhaustive()
    }
}
