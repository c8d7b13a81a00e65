//! Error types for the component cache.

use std::fmt;
use std::sync::Arc;

/// Boxed error returned by component factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Component cache errors
///
/// Represents the conditions that can occur while building a request,
/// creating a component, or reading configuration.
///
/// # Examples
///
/// ```rust
/// use ferrous_components::{ComponentCache, DiError};
///
/// struct Session;
///
/// let cache = ComponentCache::new();
/// let result = cache.get_or_create::<Session, _>(|| Err("backend offline".into()));
/// match result {
///     Err(DiError::Creation(source)) => assert_eq!(source.to_string(), "backend offline"),
///     _ => unreachable!(),
/// }
///
/// // The failed slot stays empty, so a later lookup retries.
/// assert!(cache.get_or_create::<Session, _>(|| Ok(Session)).is_ok());
/// ```
#[derive(Debug, Clone)]
pub enum DiError {
    /// Missing component type or factory, or the type failed the capability check
    InvalidArgument(String),
    /// The component factory failed; its error is kept as the source
    Creation(Arc<dyn std::error::Error + Send + Sync + 'static>),
    /// A cached instance could not be downcast to the requested type
    TypeMismatch(&'static str),
    /// Configuration key not present in any source
    NotFound(&'static str),
    /// The process-wide injector was already installed
    AlreadyInitialized,
    /// No async runtime is available to drive a release source
    NoRuntime,
}

impl DiError {
    /// Wraps a factory error.
    pub fn creation(err: BoxError) -> Self {
        DiError::Creation(Arc::from(err))
    }

    /// Returns true for errors a caller may retry (factory failures).
    pub fn is_retryable(&self) -> bool {
        matches!(self, DiError::Creation(_))
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            DiError::Creation(err) => write!(f, "Component creation failed: {}", err),
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::NotFound(name) => write!(f, "Not found: {}", name),
            DiError::AlreadyInitialized => write!(f, "Injector already initialized"),
            DiError::NoRuntime => write!(f, "No async runtime available"),
        }
    }
}

impl std::error::Error for DiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiError::Creation(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Result type for component operations
///
/// A convenience alias for `Result<T, DiError>`.
pub type DiResult<T> = Result<T, DiError>;
