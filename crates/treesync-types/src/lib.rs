//! Foundation types for treesync.
//!
//! treesync keeps a client-held mirror of a server-held tree in step by
//! shipping structural patches instead of whole snapshots. This crate holds
//! the vocabulary shared by the producer (`treesync-diff`) and the consumer
//! (`treesync-patch`).
//!
//! # Key Types
//!
//! - [`Value`] — The tree value: scalars, sequences (arrays), and records (objects)
//! - [`Pointer`] / [`Segment`] — Slash-delimited, `~`-escaped paths with `$$<id>` identity segments
//! - [`PatchOperation`] / [`OpKind`] — One `[op, path, value?]` instruction
//! - [`Normalizable`] / [`NormalizerRegistry`] — Hooks turning domain records into plain values
//! - [`SyncConfig`] — Explicit configuration threaded into diff and apply

pub mod config;
pub mod error;
pub mod normalize;
pub mod operation;
pub mod pointer;

pub use config::SyncConfig;
pub use error::{TypeError, TypeResult};
pub use normalize::{Normalizable, NormalizerRegistry, DEFAULT_TAG_FIELD};
pub use operation::{decode_patch, encode_patch, patch_from_str, patch_to_string, OpKind, PatchOperation};
pub use pointer::{escape, unescape, Pointer, Segment, APPEND_MARKER, IDENTITY_PREFIX};

/// The tree value diffed and patched by treesync.
///
/// `Null`, `Bool`, `Number` and `String` are scalars, `Array` is a sequence
/// and `Object` is a record.
pub use serde_json::Value;

/// A record: an unordered mapping from string key to tree value.
pub type Record = serde_json::Map<String, Value>;
