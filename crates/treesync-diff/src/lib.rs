//! Structural diff engine for treesync.
//!
//! Walks an old (source) and a new (destination) tree in parallel and emits
//! the ordered list of patch operations that turns one into the other.
//! Ordered sequences are reconciled either positionally or, when an
//! identity function is supplied, by matching elements on their identity.
//!
//! # Key Types
//!
//! - [`diff`] -- Entry point: `(source, destination, options) -> Vec<PatchOperation>`
//! - [`DiffOptions`] -- Ancestor path, `prepare_map` / `object_hash` hooks, and [`SyncConfig`]
//! - [`DiffError`] -- Option validation, depth limit, and caller hook failures
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use treesync_diff::{diff, DiffOptions};
//! use treesync_types::PatchOperation;
//!
//! let ops = diff(&json!({"name": "Bob"}), &json!({"name": "Jane"}), &DiffOptions::default()).unwrap();
//! assert_eq!(ops, vec![PatchOperation::replace("/name", json!("Jane"))]);
//! ```

pub mod differ;
pub mod error;
pub mod list;
pub mod options;

pub use differ::diff;
pub use error::{DiffError, DiffResult};
pub use options::{DiffOptions, ObjectHash, PrepareMap};
pub use treesync_types::SyncConfig;
