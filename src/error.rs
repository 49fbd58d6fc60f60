/// Error types that can occur while building components
///
/// # Variants
///
/// - `ConfigError` - Indicates that a component descriptor is malformed or dimensionally
///   inconsistent. The message names the offending token and the expected form.
///
/// Calling `propagate`/`backpropagate` with matrices whose shapes disagree with the component's
/// declared dimensions is a programming error and panics instead of returning a `ModelError`.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    ConfigError(String),
}

impl ModelError {
    /// Builds a `ConfigError` naming the token that was found and the form that was expected.
    pub(crate) fn unexpected(found: &str, expected: &str) -> Self {
        ModelError::ConfigError(format!("expected {}, found '{}'", expected, found))
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

/// Implements the standard error trait for ModelError
impl std::error::Error for ModelError {}
