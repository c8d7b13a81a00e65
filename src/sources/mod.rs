//! Framework-free release sources.
//!
//! Concrete lifecycles (UI screens, sessions, connections) usually provide
//! their own [`ReleaseSource`](crate::ReleaseSource). The sources here cover
//! the cases that need no external framework: scopes driven by hand, scopes
//! tied to a value's lifetime, and (with the `async` feature) scopes ended by
//! a message from another task.

mod scope;

#[cfg(feature = "async")]
mod channel;

pub use scope::{ReleaseState, ScopeGuard, ScopeReleaseSource};

#[cfg(feature = "async")]
pub use channel::{ChannelReleaseSource, ScopeEndSender};
