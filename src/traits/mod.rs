//! Core traits for binding components to external lifecycles.

mod release;

pub use release::{ReleaseListener, ReleaseSource, ScopeEnd};
