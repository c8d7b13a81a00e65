//! # ferrous-components
//!
//! Lazily created, scope-bound components that survive repeated lookups
//! within a scope and are released automatically when an external lifecycle
//! says the scope is over.
//!
//! ## Features
//!
//! - **Create once per scope**: the first lookup runs the factory, later
//!   lookups share the same `Arc`
//! - **Lifecycle-driven release**: any [`ReleaseSource`] can end a scope
//! - **Retain across restarts**: a request may keep its component when the
//!   scope only restarts
//! - **Duplicates on demand**: several instances of one type under explicit keys
//! - **Thread-safe**: per-group and per-slot locking, factories never block
//!   unrelated keys
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_components::{Component, Injector, ScopeReleaseSource};
//! use std::sync::Arc;
//!
//! struct GreetingsGenerator {
//!     greetings: Vec<&'static str>,
//! }
//!
//! struct MainComponent {
//!     generator: GreetingsGenerator,
//! }
//! impl Component for MainComponent {}
//!
//! let injector = Injector::new();
//!
//! // A screen comes up and asks for its component
//! let screen = ScopeReleaseSource::new();
//! let component = injector
//!     .with(screen.clone())
//!     .retain_on_restart(true)
//!     .build(|| {
//!         Ok(MainComponent {
//!             generator: GreetingsGenerator { greetings: vec!["Hello", "Salut", "Oi"] },
//!         })
//!     })
//!     .unwrap();
//! assert_eq!(component.generator.greetings[0], "Hello");
//!
//! // It is rotated: the scope restarts and the component survives
//! screen.restart();
//! let rotated = ScopeReleaseSource::new();
//! let same = injector
//!     .with(rotated.clone())
//!     .retain_on_restart(true)
//!     .build(|| -> Result<MainComponent, _> { Err("not called".into()) })
//!     .unwrap();
//! assert!(Arc::ptr_eq(&component, &same));
//!
//! // It closes for good: the component is released
//! rotated.finish();
//! assert!(injector.cache().is_empty());
//! ```
//!
//! ## Duplicates
//!
//! ```rust
//! use ferrous_components::{Component, Injector, ScopeGuard};
//!
//! struct ChatComponent(&'static str);
//! impl Component for ChatComponent {}
//!
//! let injector = Injector::new();
//! let alice = ScopeGuard::new();
//! let bob = ScopeGuard::new();
//!
//! let a = injector.with(alice.source()).allow_duplicates("alice").build(|| Ok(ChatComponent("alice"))).unwrap();
//! let b = injector.with(bob.source()).allow_duplicates("bob").build(|| Ok(ChatComponent("bob"))).unwrap();
//! assert_eq!((a.0, b.0), ("alice", "bob"));
//!
//! drop(alice);
//! assert_eq!(injector.cache().len(), 1);
//! ```

// Module declarations
pub mod cache;
pub mod component;
pub mod config;
pub mod error;
pub mod injector;
pub mod key;
pub mod observer;
pub mod request;
pub mod sources;
pub mod traits;

// Re-export core types
pub use cache::{erase_factory, AnyArc, CacheStats, ComponentCache, ComponentGroups, ErasedFactory};
pub use component::{Component, ComponentCheck, ComponentRegistry, MarkerCheck};
pub use config::{
    ConfigProvider, ConfigSource, ConfigValue, EnvironmentConfigSource, InjectorOptions,
    MapConfigSource,
};
#[cfg(feature = "config")]
pub use config::JsonConfigSource;
pub use error::{BoxError, DiError, DiResult};
pub use injector::{global, Injector, InjectorBuilder};
pub use key::{ComponentType, Disambiguator};
pub use observer::{CacheObserver, LoggingObserver, Observers};
pub use request::{InjectRequest, RequestOptions};
pub use sources::{ReleaseState, ScopeGuard, ScopeReleaseSource};
#[cfg(feature = "async")]
pub use sources::{ChannelReleaseSource, ScopeEndSender};
pub use traits::{ReleaseListener, ReleaseSource, ScopeEnd};
