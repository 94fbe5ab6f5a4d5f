//! Patch applier for treesync.
//!
//! Takes a tree and an ordered list of patch operations and produces the
//! updated tree. Besides `replace`, `add` and `remove`, the applier
//! understands two operations for bounded live collections (a capped feed
//! of recent items, for example):
//!
//! - `upsert` replaces the element with the same identity in place, or
//!   inserts it at the given index when no such element exists
//! - `limit` truncates a sequence to its first N (or last |N|) elements
//!
//! # Key Types
//!
//! - [`apply`] / [`apply_in_place`] -- Apply operations strictly in order
//! - [`BoundedCollection`] / [`Position`] -- Build insert-then-cap operation pairs
//! - [`PatchError`] / [`ApplyError`] -- The failing operation and why it failed

pub mod applier;
pub mod bounded;
pub mod error;

#[cfg(test)]
mod roundtrip;

pub use applier::{apply, apply_in_place};
pub use bounded::{BoundedCollection, Position};
pub use error::{ApplyError, PatchError, PatchResult};
