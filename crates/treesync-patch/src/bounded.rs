//! Producer-side helpers for bounded live collections.
//!
//! A bounded collection is a sequence the consumer keeps capped, such as a
//! feed of the 50 most recent messages. The producer never diffs it; it
//! sends an insert (or upsert) followed by the `limit` that re-applies the
//! cap, and removes elements by identity rather than by index.

use serde_json::Value;
use treesync_types::{PatchOperation, Pointer, APPEND_MARKER};

use crate::error::PatchResult;

/// Where a new element goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    /// Index 0.
    Head,
    /// The `-` append marker.
    Tail,
    /// A concrete index; past the end appends.
    Index(usize),
}

impl Position {
    fn segment(&self) -> String {
        match self {
            Position::Head => "0".into(),
            Position::Tail => APPEND_MARKER.into(),
            Position::Index(i) => i.to_string(),
        }
    }
}

/// A capped sequence at a fixed path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundedCollection {
    path: Pointer,
    limit: Option<i64>,
}

impl BoundedCollection {
    /// `limit` follows the `limit` operation's convention: positive keeps
    /// the head, negative keeps the tail, `None` leaves the sequence uncapped.
    pub fn new(path: &str, limit: Option<i64>) -> PatchResult<Self> {
        Ok(Self {
            path: Pointer::parse(path)?,
            limit,
        })
    }

    /// The collection's pointer.
    pub fn path(&self) -> String {
        self.path.to_string()
    }

    /// `add` at `at`, then cap.
    pub fn insert(&self, at: Position, value: Value) -> Vec<PatchOperation> {
        let path = self.path.child(at.segment()).to_string();
        self.capped(PatchOperation::add(path, value))
    }

    /// `upsert` at `at`, then cap. An element with the same identity is
    /// replaced where it stands instead of moving to `at`.
    pub fn upsert(&self, at: Position, value: Value) -> Vec<PatchOperation> {
        let path = self.path.child(at.segment()).to_string();
        self.capped(PatchOperation::upsert(path, value))
    }

    /// Remove the element whose identity is `id`.
    pub fn remove(&self, id: &str) -> PatchOperation {
        PatchOperation::remove(self.path.child_identity(id).to_string())
    }

    /// Re-apply the cap on its own, e.g. after the limit itself changed.
    pub fn cap(&self) -> Option<PatchOperation> {
        self.limit
            .map(|n| PatchOperation::limit(self.path.to_string(), n))
    }

    fn capped(&self, op: PatchOperation) -> Vec<PatchOperation> {
        let mut ops = vec![op];
        ops.extend(self.cap());
        ops
    }
}
