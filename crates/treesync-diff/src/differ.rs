//! Tree-level diff: walk two trees in parallel and emit patch operations.
//!
//! Dispatch is type-directed on each `(destination, source)` pair:
//! records are diffed key by key, sequences go to the list reconciler,
//! and anything else that differs is replaced wholesale. Every record is
//! passed through the `prepare_map` hook before it is compared, and every
//! subtree carried by an `add` or `replace` is normalized the same way.

use std::borrow::Cow;

use serde_json::Value;
use tracing::{debug, trace};
use treesync_types::pointer;
use treesync_types::{PatchOperation, Record};

use crate::error::{DiffError, DiffResult};
use crate::options::DiffOptions;

/// Diff `source` (old) against `destination` (new).
///
/// Applying the returned operations, in order, to a tree equal to `source`
/// yields a tree equal to `destination`. Equal inputs yield no operations.
pub fn diff(
    source: &Value,
    destination: &Value,
    options: &DiffOptions,
) -> DiffResult<Vec<PatchOperation>> {
    let ancestor = options.validate()?;
    let path = options.ancestor_path.as_str();
    let mut differ = Differ::new(options);

    if options.config.diff_enabled {
        differ.diff_value(destination, source, path, ancestor.len())?;
    } else if source != destination {
        let value = differ.normalize(destination, path, ancestor.len())?;
        differ.emit(PatchOperation::replace(path, value));
    }

    let ops = differ.ops;
    debug!(ancestor = %path, ops = ops.len(), "diff complete");
    Ok(ops)
}

/// Accumulates operations for one diff call.
pub(crate) struct Differ<'a> {
    pub(crate) options: &'a DiffOptions,
    pub(crate) ops: Vec<PatchOperation>,
}

impl<'a> Differ<'a> {
    pub(crate) fn new(options: &'a DiffOptions) -> Self {
        Self {
            options,
            ops: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, op: PatchOperation) {
        trace!(op = %op.op, path = %op.path, "emit");
        self.ops.push(op);
    }

    /// Generic dispatch on one path position.
    pub(crate) fn diff_value(
        &mut self,
        destination: &Value,
        source: &Value,
        path: &str,
        depth: usize,
    ) -> DiffResult<()> {
        if destination == source {
            return Ok(());
        }
        self.check_depth(path, depth)?;

        let destination = self.prepare(destination)?;
        let source = self.prepare(source)?;

        match (&*destination, &*source) {
            (d, s) if d == s => {}
            (Value::Object(d), Value::Object(s)) => self.diff_records(d, s, path, depth)?,
            (Value::Array(d), Value::Array(s)) => self.diff_lists(d, s, path, depth)?,
            (d, _) => {
                let value = self.normalize_prepared(d, path, depth)?;
                self.emit(PatchOperation::replace(path, value));
            }
        }
        Ok(())
    }

    fn diff_records(
        &mut self,
        destination: &Record,
        source: &Record,
        path: &str,
        depth: usize,
    ) -> DiffResult<()> {
        for (key, d_val) in destination {
            let child = pointer::append(path, key);
            match source.get(key) {
                Some(s_val) => self.diff_value(d_val, s_val, &child, depth + 1)?,
                None => {
                    let value = self.normalize(d_val, &child, depth + 1)?;
                    self.emit(PatchOperation::add(child, value));
                }
            }
        }

        for key in source.keys() {
            if !destination.contains_key(key) {
                self.emit(PatchOperation::remove(pointer::append(path, key)));
            }
        }
        Ok(())
    }

    /// Run `prepare_map` on a record; other values pass through borrowed.
    fn prepare<'v>(&self, value: &'v Value) -> DiffResult<Cow<'v, Value>> {
        match (value, &self.options.prepare_map) {
            (Value::Object(record), Some(prepare)) => Ok(Cow::Owned(prepare(record)?)),
            _ => Ok(Cow::Borrowed(value)),
        }
    }

    /// Fully normalize a subtree that is about to be emitted as a payload.
    pub(crate) fn normalize(&self, value: &Value, path: &str, depth: usize) -> DiffResult<Value> {
        let prepared = self.prepare(value)?;
        self.normalize_prepared(&prepared, path, depth)
    }

    /// Normalize the children of a value whose own record (if any) is
    /// already prepared.
    fn normalize_prepared(&self, value: &Value, path: &str, depth: usize) -> DiffResult<Value> {
        if self.options.prepare_map.is_none() {
            return Ok(value.clone());
        }
        self.check_depth(path, depth)?;

        match value {
            Value::Object(record) => {
                let mut out = Record::new();
                for (key, child) in record {
                    out.insert(key.clone(), self.normalize(child, path, depth + 1)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.normalize(item, path, depth + 1))
                .collect::<DiffResult<Vec<_>>>()
                .map(Value::Array),
            scalar => Ok(scalar.clone()),
        }
    }

    fn check_depth(&self, path: &str, depth: usize) -> DiffResult<()> {
        let Some(max_depth) = self.options.config.max_depth else {
            return Ok(());
        };
        if depth > max_depth {
            return Err(DiffError::DepthExceeded {
                path: path.to_string(),
                max_depth,
            });
        }
        Ok(())
    }
}
