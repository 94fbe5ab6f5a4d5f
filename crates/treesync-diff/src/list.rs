//! Sequence reconciliation for the tree differ.
//!
//! Two modes:
//!
//! - **Positional**: elements are paired by index; the longer side's tail
//!   becomes `add`s or `remove`s.
//! - **Identity**: each record is keyed by the caller's `object_hash`, and a
//!   greedy two-cursor walk decides between in-place diffs, runs of
//!   removals, and runs of insertions.
//!
//! Identity mode is attempted only when an `object_hash` is configured. If
//! any element is not a record, hashes to `None`, or shares its hash with
//! another element of the same sequence, that one sequence is diffed
//! positionally instead.
//!
//! The greedy walk is linear in the sequence lengths. It is not a minimal
//! edit script: a moved element is removed and re-added rather than moved.
//!
//! # Index discipline
//!
//! Emitted indices are resolved by the applier against the sequence as
//! mutated by all earlier operations. While walking, everything before the
//! cursors is already in its final shape, so the live sequence is always
//! `destination[..d] ++ source[s..]` and the current source element sits at
//! live index `d`. Removals are therefore emitted in ascending original
//! order, each at the current live index.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::debug;
use treesync_types::pointer;
use treesync_types::PatchOperation;

use crate::differ::Differ;
use crate::error::DiffResult;
use crate::options::ObjectHash;

/// Why a sequence fell back to positional mode.
#[derive(Debug)]
enum Fallback {
    NotARecord(usize),
    Unhashable(usize),
    Duplicate(usize),
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::NotARecord(i) => write!(f, "element {i} is not a record"),
            Fallback::Unhashable(i) => write!(f, "element {i} has no identity"),
            Fallback::Duplicate(i) => write!(f, "element {i} repeats an identity"),
        }
    }
}

/// Identities of one sequence and the position of each.
struct IdentityIndex {
    hashes: Vec<String>,
    positions: HashMap<String, usize>,
}

impl IdentityIndex {
    fn build(hash: &ObjectHash, items: &[Value]) -> Result<Self, Fallback> {
        let mut hashes = Vec::with_capacity(items.len());
        let mut positions = HashMap::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            let record = item.as_object().ok_or(Fallback::NotARecord(i))?;
            // Canonical JSON text, so any value can serve as an identity.
            let key = hash(record).ok_or(Fallback::Unhashable(i))?.to_string();
            if positions.insert(key.clone(), i).is_some() {
                return Err(Fallback::Duplicate(i));
            }
            hashes.push(key);
        }

        Ok(Self { hashes, positions })
    }

    /// Position of `hash` if it lies strictly after `cursor`.
    fn ahead_of(&self, hash: &str, cursor: usize) -> Option<usize> {
        self.positions.get(hash).copied().filter(|&i| i > cursor)
    }
}

impl Differ<'_> {
    /// Diff two sequences at `path`.
    pub(crate) fn diff_lists(
        &mut self,
        destination: &[Value],
        source: &[Value],
        path: &str,
        depth: usize,
    ) -> DiffResult<()> {
        let Some(hash) = self.options.object_hash.clone() else {
            return self.diff_positional(destination, source, path, depth);
        };

        let indexes = IdentityIndex::build(&hash, destination)
            .and_then(|d| IdentityIndex::build(&hash, source).map(|s| (d, s)));

        match indexes {
            Ok((dest_index, source_index)) => {
                self.diff_keyed(destination, source, &dest_index, &source_index, path, depth)
            }
            Err(reason) => {
                debug!(path, %reason, "identity diff unavailable, diffing positionally");
                self.diff_positional(destination, source, path, depth)
            }
        }
    }

    fn diff_positional(
        &mut self,
        destination: &[Value],
        source: &[Value],
        path: &str,
        depth: usize,
    ) -> DiffResult<()> {
        let common = destination.len().min(source.len());

        for (i, (d, s)) in destination.iter().zip(source).enumerate() {
            self.diff_value(d, s, &pointer::append_index(path, i), depth + 1)?;
        }
        self.insert_run(destination, common..destination.len(), path, depth)?;
        self.remove_run(source.len() - common, common, path);
        Ok(())
    }

    fn diff_keyed(
        &mut self,
        destination: &[Value],
        source: &[Value],
        dest_index: &IdentityIndex,
        source_index: &IdentityIndex,
        path: &str,
        depth: usize,
    ) -> DiffResult<()> {
        let (mut d, mut s) = (0, 0);

        loop {
            if d == destination.len() {
                self.remove_run(source.len() - s, d, path);
                return Ok(());
            }
            if s == source.len() {
                return self.insert_run(destination, d..destination.len(), path, depth);
            }

            let dest_hash = &dest_index.hashes[d];
            let source_hash = &source_index.hashes[s];

            if dest_hash == source_hash {
                self.diff_value(&destination[d], &source[s], &pointer::append_index(path, d), depth + 1)?;
                d += 1;
                s += 1;
                continue;
            }

            // Where the current source element reappears in the destination,
            // and where the current destination element sits in the source.
            let next_dest = dest_index.ahead_of(source_hash, d);
            let next_source = source_index.ahead_of(dest_hash, s);

            match (next_dest, next_source) {
                (Some(nd), Some(ns)) if nd - d < ns - s => {
                    self.insert_run(destination, d..nd, path, depth)?;
                    d = nd;
                }
                (Some(nd), None) => {
                    self.insert_run(destination, d..nd, path, depth)?;
                    d = nd;
                }
                // Ties go to the removal side.
                (_, Some(ns)) => {
                    self.remove_run(ns - s, d, path);
                    s = ns;
                }
                (None, None) => {
                    self.diff_value(&destination[d], &source[s], &pointer::append_index(path, d), depth + 1)?;
                    d += 1;
                    s += 1;
                }
            }
        }
    }

    /// `add` each destination element in `range` at its own index.
    fn insert_run(
        &mut self,
        destination: &[Value],
        range: std::ops::Range<usize>,
        path: &str,
        depth: usize,
    ) -> DiffResult<()> {
        for i in range {
            let child = pointer::append_index(path, i);
            let value = self.normalize(&destination[i], &child, depth + 1)?;
            self.emit(PatchOperation::add(child, value));
        }
        Ok(())
    }

    /// `remove` `count` consecutive elements starting at live index `at`.
    fn remove_run(&mut self, count: usize, at: usize, path: &str) {
        for _ in 0..count {
            self.emit(PatchOperation::remove(pointer::append_index(path, at)));
        }
    }
}
