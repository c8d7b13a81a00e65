//! Component type and disambiguator keys.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;

/// Primary cache key: the identity of a component type.
///
/// Carries the `TypeId` used for lookup and the type name used for
/// diagnostics and as the canonical disambiguator.
///
/// # Examples
///
/// ```rust
/// use ferrous_components::ComponentType;
///
/// struct MainComponent;
///
/// let ty = ComponentType::of::<MainComponent>();
/// assert_eq!(ty, ComponentType::of::<MainComponent>());
/// assert_ne!(ty, ComponentType::of::<String>());
/// assert!(ty.name().ends_with("MainComponent"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    /// Returns the component type of `T`.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` backing this key.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The type name, as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The key used when a request does not ask for duplicates.
    pub fn canonical_key(&self) -> &'static str {
        self.name
    }
}

// TypeId-only comparison; the name is diagnostic
impl PartialEq for ComponentType {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl std::hash::Hash for ComponentType {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Secondary key selecting one instance within a component group.
///
/// `Canonical` resolves to the type name, so every request in canonical mode
/// shares one instance per type. `Named` lets several live instances of the
/// same type coexist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum Disambiguator {
    /// One instance per component type
    #[default]
    Canonical,
    /// Instance identified by a caller-chosen key
    Named(String),
}

impl Disambiguator {
    /// Resolves the string key for `ty`.
    ///
    /// ```rust
    /// use ferrous_components::{ComponentType, Disambiguator};
    ///
    /// struct Player;
    /// let ty = ComponentType::of::<Player>();
    ///
    /// assert_eq!(Disambiguator::Canonical.resolve(&ty), ty.name());
    /// assert_eq!(Disambiguator::Named("p1".into()).resolve(&ty), "p1");
    /// ```
    pub fn resolve(&self, ty: &ComponentType) -> Cow<'static, str> {
        match self {
            Disambiguator::Canonical => Cow::Borrowed(ty.canonical_key()),
            Disambiguator::Named(key) => Cow::Owned(key.clone()),
        }
    }

    /// True when duplicates are allowed.
    pub fn is_named(&self) -> bool {
        matches!(self, Disambiguator::Named(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct First;
    struct Second;

    #[test]
    fn equality_ignores_name() {
        let a = ComponentType::of::<First>();
        let forged = ComponentType { id: TypeId::of::<First>(), name: "renamed" };
        assert_eq!(a, forged);
        assert_ne!(a, ComponentType::of::<Second>());
    }

    #[test]
    fn hashes_by_type() {
        let mut set = HashSet::new();
        set.insert(ComponentType::of::<First>());
        set.insert(ComponentType::of::<First>());
        set.insert(ComponentType::of::<Second>());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn canonical_key_distinguishes_types() {
        let first = Disambiguator::Canonical.resolve(&ComponentType::of::<First>());
        let second = Disambiguator::Canonical.resolve(&ComponentType::of::<Second>());
        assert_ne!(first, second);
        assert!(!Disambiguator::Canonical.is_named());
        assert!(Disambiguator::Named("x".into()).is_named());
    }
}
