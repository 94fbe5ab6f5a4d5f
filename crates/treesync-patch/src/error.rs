//! Error types for the patch crate.

use treesync_types::{OpKind, TypeError};

/// Errors returned by [`apply`](crate::apply).
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The configuration was rejected before any operation ran.
    #[error("invalid patch configuration: {0}")]
    InvalidConfig(String),

    /// An operation did not fit the tree it was applied to. This means the
    /// producer and consumer disagree about the current tree.
    #[error("operation #{index} ({op} {path:?}) failed: {source}")]
    Operation {
        index: usize,
        op: OpKind,
        path: String,
        #[source]
        source: ApplyError,
    },

    /// A bounded-collection path could not be built.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Why a single operation could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("{0}")]
    InvalidPointer(String),

    #[error("path has {depth} segments, more than max_depth {max_depth}")]
    PathTooDeep { depth: usize, max_depth: usize },

    #[error("key {segment:?} not found")]
    PathNotFound { segment: String },

    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("segment {segment:?} is not a valid sequence index")]
    InvalidIndex { segment: String },

    #[error("segment {segment:?} addresses into a scalar")]
    NotAContainer { segment: String },

    #[error("target is not a sequence")]
    NotASequence,

    #[error("no element with identity {id:?}")]
    IdentityNotFound { id: String },

    #[error("upsert value must be a record with an {field:?} field")]
    MissingIdentity { field: String },

    #[error("limit must be an integer, got {0}")]
    InvalidLimit(String),

    #[error("operation requires a value")]
    MissingValue,

    #[error("cannot remove the root")]
    RootRemoval,
}

/// Convenience alias for patch results.
pub type PatchResult<T> = Result<T, PatchError>;
