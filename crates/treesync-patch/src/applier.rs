//! Ordered patch application.
//!
//! Operations run one at a time, left to right. Each path is resolved
//! against the tree as left by every earlier operation, never against the
//! original snapshot, so `remove /l/1, remove /l/1` deletes two
//! consecutive elements and `add, add, limit` caps after inserting.
//!
//! Inside a sequence a segment may be an index, `-` (the tail, for `add`
//! and `upsert`), or `$$<id>`, which resolves to the element whose
//! configured identity field equals `<id>` wherever it currently sits.

use serde_json::Value;
use tracing::{debug, trace};
use treesync_types::{OpKind, PatchOperation, Pointer, Segment, SyncConfig};

use crate::error::{ApplyError, PatchError, PatchResult};

/// Apply `ops` to a copy of `initial` and return the result.
///
/// Atomic from the caller's side: `initial` is never touched, and on error
/// the partially patched copy is dropped.
pub fn apply(initial: &Value, ops: &[PatchOperation], config: &SyncConfig) -> PatchResult<Value> {
    let mut tree = initial.clone();
    apply_in_place(&mut tree, ops, config)?;
    Ok(tree)
}

/// Apply `ops` directly to `tree`.
///
/// On error, operations before the failing one have already been applied
/// and the tree is left in that partial state.
pub fn apply_in_place(
    tree: &mut Value,
    ops: &[PatchOperation],
    config: &SyncConfig,
) -> PatchResult<()> {
    config
        .validate()
        .map_err(|e| PatchError::InvalidConfig(e.to_string()))?;

    for (index, op) in ops.iter().enumerate() {
        if let Err(source) = apply_operation(tree, op, config) {
            debug!(index, op = %op.op, path = %op.path, error = %source, "patch operation failed");
            return Err(PatchError::Operation {
                index,
                op: op.op,
                path: op.path.clone(),
                source,
            });
        }
        trace!(index, op = %op.op, path = %op.path, "applied");
    }

    debug!(ops = ops.len(), "patch applied");
    Ok(())
}

fn apply_operation(
    tree: &mut Value,
    op: &PatchOperation,
    config: &SyncConfig,
) -> Result<(), ApplyError> {
    let pointer = Pointer::parse(&op.path).map_err(|e| ApplyError::InvalidPointer(e.to_string()))?;
    if let Some(max_depth) = config.max_depth {
        if pointer.len() > max_depth {
            return Err(ApplyError::PathTooDeep {
                depth: pointer.len(),
                max_depth,
            });
        }
    }
    let id_field = config.id_field.as_str();

    match op.op {
        OpKind::Replace => replace(tree, &pointer, payload(op)?, id_field),
        OpKind::Add => add(tree, &pointer, payload(op)?, id_field),
        OpKind::Remove => remove(tree, &pointer, id_field),
        OpKind::Upsert => upsert(tree, &pointer, payload(op)?, id_field),
        OpKind::Limit => limit(tree, &pointer, payload(op)?, id_field),
    }
}

fn payload(op: &PatchOperation) -> Result<&Value, ApplyError> {
    op.value.as_ref().ok_or(ApplyError::MissingValue)
}

fn replace(tree: &mut Value, pointer: &Pointer, value: &Value, id_field: &str) -> Result<(), ApplyError> {
    let Some((last, parents)) = pointer.split_last() else {
        *tree = value.clone();
        return Ok(());
    };

    match resolve_mut(tree, parents, id_field)? {
        Value::Object(record) => {
            record.insert(last.as_key().into_owned(), value.clone());
        }
        Value::Array(items) => {
            let i = existing_index(items, last, id_field)?;
            items[i] = value.clone();
        }
        _ => return Err(not_a_container(last)),
    }
    Ok(())
}

fn add(tree: &mut Value, pointer: &Pointer, value: &Value, id_field: &str) -> Result<(), ApplyError> {
    let Some((last, parents)) = pointer.split_last() else {
        *tree = value.clone();
        return Ok(());
    };

    match resolve_mut(tree, parents, id_field)? {
        Value::Object(record) => {
            record.insert(last.as_key().into_owned(), value.clone());
        }
        Value::Array(items) => {
            let i = insertion_index(items, last)?;
            items.insert(i, value.clone());
        }
        _ => return Err(not_a_container(last)),
    }
    Ok(())
}

fn remove(tree: &mut Value, pointer: &Pointer, id_field: &str) -> Result<(), ApplyError> {
    let (last, parents) = pointer.split_last().ok_or(ApplyError::RootRemoval)?;

    match resolve_mut(tree, parents, id_field)? {
        Value::Object(record) => {
            record
                .remove(last.as_key().as_ref())
                .ok_or_else(|| ApplyError::PathNotFound {
                    segment: last.to_string(),
                })?;
        }
        Value::Array(items) => {
            let i = existing_index(items, last, id_field)?;
            items.remove(i);
        }
        _ => return Err(not_a_container(last)),
    }
    Ok(())
}

/// Replace the element sharing `value`'s identity, wherever it is, or insert
/// `value` at the final segment's position.
fn upsert(tree: &mut Value, pointer: &Pointer, value: &Value, id_field: &str) -> Result<(), ApplyError> {
    let (last, parents) = pointer.split_last().ok_or(ApplyError::NotASequence)?;
    let identity = value
        .as_object()
        .and_then(|record| record.get(id_field))
        .ok_or_else(|| ApplyError::MissingIdentity {
            field: id_field.to_string(),
        })?;

    let Value::Array(items) = resolve_mut(tree, parents, id_field)? else {
        return Err(ApplyError::NotASequence);
    };

    match items.iter().position(|e| e.get(id_field) == Some(identity)) {
        Some(i) => items[i] = value.clone(),
        None => {
            let i = insertion_index(items, last)?;
            items.insert(i, value.clone());
        }
    }
    Ok(())
}

/// Keep the first `n` elements, or the last `|n|` when `n` is negative.
fn limit(tree: &mut Value, pointer: &Pointer, value: &Value, id_field: &str) -> Result<(), ApplyError> {
    let n = value
        .as_i64()
        .ok_or_else(|| ApplyError::InvalidLimit(value.to_string()))?;

    let Value::Array(items) = resolve_mut(tree, pointer.segments(), id_field)? else {
        return Err(ApplyError::NotASequence);
    };

    let keep = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
    if n >= 0 {
        items.truncate(keep);
    } else if items.len() > keep {
        let excess = items.len() - keep;
        items.drain(..excess);
    }
    Ok(())
}

fn resolve_mut<'t>(
    mut current: &'t mut Value,
    segments: &[Segment],
    id_field: &str,
) -> Result<&'t mut Value, ApplyError> {
    for segment in segments {
        current = match current {
            Value::Object(record) => record
                .get_mut(segment.as_key().as_ref())
                .ok_or_else(|| ApplyError::PathNotFound {
                    segment: segment.to_string(),
                })?,
            Value::Array(items) => {
                let i = existing_index(items, segment, id_field)?;
                &mut items[i]
            }
            _ => return Err(not_a_container(segment)),
        };
    }
    Ok(current)
}

/// Position of an element that must already exist.
fn existing_index(items: &[Value], segment: &Segment, id_field: &str) -> Result<usize, ApplyError> {
    match segment {
        Segment::Identity(id) => items
            .iter()
            .position(|e| has_identity(e, id_field, id))
            .ok_or_else(|| ApplyError::IdentityNotFound { id: id.clone() }),
        Segment::Key(key) => {
            let index = parse_index(key)?;
            if index < items.len() {
                Ok(index)
            } else {
                Err(ApplyError::IndexOutOfRange {
                    index,
                    len: items.len(),
                })
            }
        }
    }
}

/// Insertion position: `-`, `-1` and any index past the end append.
fn insertion_index(items: &[Value], segment: &Segment) -> Result<usize, ApplyError> {
    match segment {
        Segment::Key(key) if segment.is_append() || key == "-1" => Ok(items.len()),
        Segment::Key(key) => Ok(parse_index(key)?.min(items.len())),
        Segment::Identity(_) => Err(ApplyError::InvalidIndex {
            segment: segment.to_string(),
        }),
    }
}

fn parse_index(key: &str) -> Result<usize, ApplyError> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApplyError::InvalidIndex {
            segment: key.to_string(),
        });
    }
    key.parse().map_err(|_| ApplyError::InvalidIndex {
        segment: key.to_string(),
    })
}

/// Identity fields compare by their text: `$$42` matches `"42"` and `42`.
fn has_identity(element: &Value, id_field: &str, id: &str) -> bool {
    match element.get(id_field) {
        Some(Value::String(s)) => s == id,
        Some(other) => other.to_string() == id,
        None => false,
    }
}

fn not_a_container(segment: &Segment) -> ApplyError {
    ApplyError::NotAContainer {
        segment: segment.to_string(),
    }
}
