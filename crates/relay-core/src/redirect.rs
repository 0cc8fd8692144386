//! Model redirection records.

/// Records whether the routing stage redirected a request to a different
/// upstream model.
///
/// When a redirect happened, the relay masks the upstream's model field back
/// to [`original_model`](Self::original_model) so clients never learn which
/// model actually served them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectionContext {
    /// True when the served model differs from the requested one.
    pub was_redirected: bool,
    /// Model identifier the client asked for.
    pub original_model: String,
    /// Model identifier actually dispatched upstream.
    pub target_model: String,
}

impl RedirectionContext {
    /// Context for a request that was not redirected.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Context for a request redirected from `original` to `target`.
    #[must_use]
    pub fn redirected(original: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            was_redirected: true,
            original_model: original.into(),
            target_model: target.into(),
        }
    }
}
