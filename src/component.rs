//! Component capability: the marker trait and the runtime checks a request
//! consults before touching the cache.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::ComponentType;

/// Marker for types that may be cached as scope-bound components.
///
/// The typed request API only accepts `T: Component`, so a type that never
/// opted in is rejected at compile time.
///
/// ```rust
/// use ferrous_components::Component;
///
/// struct MainComponent {
///     greeting: String,
/// }
///
/// impl Component for MainComponent {}
/// ```
pub trait Component: Send + Sync + 'static {}

/// Runtime capability check applied by [`InjectRequest`](crate::InjectRequest)
/// before any cache access.
pub trait ComponentCheck: Send + Sync {
    /// Returns true if `ty` may be cached as a component.
    fn is_registered_component(&self, ty: &ComponentType) -> bool;
}

/// Accepts every type: the [`Component`] bound already did the checking.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerCheck;

impl ComponentCheck for MarkerCheck {
    fn is_registered_component(&self, _ty: &ComponentType) -> bool {
        true
    }
}

/// Explicit registry of component types, populated at startup.
///
/// Requests checked against a registry reject any type that was not
/// registered, including ones reaching the cache through the type-erased
/// [`build_dyn`](crate::InjectRequest::build_dyn) path.
///
/// # Examples
///
/// ```rust
/// use ferrous_components::{Component, ComponentCheck, ComponentRegistry, ComponentType};
///
/// struct Checkout;
/// impl Component for Checkout {}
///
/// struct Unlisted;
/// impl Component for Unlisted {}
///
/// let registry = ComponentRegistry::new();
/// registry.register::<Checkout>();
///
/// assert!(registry.is_registered_component(&ComponentType::of::<Checkout>()));
/// assert!(!registry.is_registered_component(&ComponentType::of::<Unlisted>()));
/// ```
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    types: RwLock<HashSet<ComponentType>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`. Returns false if it was already present.
    pub fn register<T: Component>(&self) -> bool {
        self.register_type(ComponentType::of::<T>())
    }

    /// Registers an already erased component type.
    pub fn register_type(&self, ty: ComponentType) -> bool {
        self.types.write().insert(ty)
    }

    pub fn contains(&self, ty: &ComponentType) -> bool {
        self.types.read().contains(ty)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ComponentCheck for ComponentRegistry {
    fn is_registered_component(&self, ty: &ComponentType) -> bool {
        self.contains(ty)
    }
}
