//! Error types for the diff crate.

/// Errors that can occur during diff operations.
///
/// Diffing two well-formed trees never fails on its own; every variant is
/// either a misconfigured call or an error raised by caller-supplied code.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The options were rejected before any work was done.
    #[error("invalid diff options: {0}")]
    InvalidOptions(String),

    /// A tree was nested deeper than the configured maximum.
    #[error("tree nested deeper than {max_depth} levels at {path:?}")]
    DepthExceeded { path: String, max_depth: usize },

    /// The `prepare_map` hook failed; the caller's error is passed through.
    #[error(transparent)]
    Hook(#[from] anyhow::Error),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
