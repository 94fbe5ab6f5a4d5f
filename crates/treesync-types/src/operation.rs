//! Patch operations and their compact wire form.
//!
//! On the wire each operation is a JSON array: `[op, path]` for `remove`
//! and `[op, path, value]` for everything else.

use std::fmt;

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{TypeError, TypeResult};

/// The kind of a patch operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// Overwrite the value at the path.
    Replace,
    /// Insert a record key or a sequence element.
    Add,
    /// Delete a record key or a sequence element.
    Remove,
    /// Insert-or-replace a sequence element by identity.
    Upsert,
    /// Truncate a sequence to N elements (head if N >= 0, tail otherwise).
    Limit,
}

impl OpKind {
    /// The wire name of this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Replace => "replace",
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Upsert => "upsert",
            OpKind::Limit => "limit",
        }
    }

    /// Whether the wire form carries a value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, OpKind::Remove)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single patch instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchOperation {
    /// What to do.
    pub op: OpKind,
    /// Escaped pointer to the target.
    pub path: String,
    /// Payload; `None` only for `remove`.
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: OpKind::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: OpKind::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: OpKind::Remove,
            path: path.into(),
            value: None,
        }
    }

    pub fn upsert(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: OpKind::Upsert,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn limit(path: impl Into<String>, limit: i64) -> Self {
        Self {
            op: OpKind::Limit,
            path: path.into(),
            value: Some(Value::from(limit)),
        }
    }

    /// Check that the value slot agrees with the operation kind.
    pub fn validate(&self) -> TypeResult<()> {
        match (&self.op, &self.value) {
            (OpKind::Remove, Some(_)) => Err(TypeError::InvalidOperation(format!(
                "remove {} must not carry a value",
                self.path
            ))),
            (OpKind::Remove, None) => Ok(()),
            (op, None) => Err(TypeError::InvalidOperation(format!(
                "{op} {} requires a value",
                self.path
            ))),
            (OpKind::Limit, Some(v)) if v.as_i64().is_none() => Err(TypeError::InvalidOperation(
                format!("limit {} requires an integer, got {v}", self.path),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.op, self.path)
    }
}

impl Serialize for PatchOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.value.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.op)?;
        seq.serialize_element(&self.path)?;
        if let Some(value) = &self.value {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for PatchOperation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OperationVisitor;

        impl<'de> Visitor<'de> for OperationVisitor {
            type Value = PatchOperation;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an [op, path] or [op, path, value] array")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PatchOperation, A::Error> {
                let op: OpKind = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let path: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let value: Option<Value> = seq.next_element()?;
                if seq.next_element::<IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(4, &self));
                }

                let operation = PatchOperation { op, path, value };
                operation.validate().map_err(de::Error::custom)?;
                Ok(operation)
            }
        }

        deserializer.deserialize_seq(OperationVisitor)
    }
}

/// Encode a patch list into its wire form.
pub fn encode_patch(ops: &[PatchOperation]) -> TypeResult<Value> {
    serde_json::to_value(ops).map_err(|e| TypeError::Serialization(e.to_string()))
}

/// Decode a patch list from its wire form.
pub fn decode_patch(wire: &Value) -> TypeResult<Vec<PatchOperation>> {
    Vec::<PatchOperation>::deserialize(wire).map_err(|e| TypeError::Serialization(e.to_string()))
}

/// Encode a patch list as a JSON string.
pub fn patch_to_string(ops: &[PatchOperation]) -> TypeResult<String> {
    serde_json::to_string(ops).map_err(|e| TypeError::Serialization(e.to_string()))
}

/// Decode a patch list from a JSON string.
pub fn patch_from_str(s: &str) -> TypeResult<Vec<PatchOperation>> {
    serde_json::from_str(s).map_err(|e| TypeError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remove_is_two_elements() {
        let wire = serde_json::to_value(PatchOperation::remove("/a/0")).unwrap();
        assert_eq!(wire, json!(["remove", "/a/0"]));
    }

    #[test]
    fn value_ops_are_three_elements() {
        let ops = vec![
            PatchOperation::replace("/name", json!("Jane")),
            PatchOperation::add("/feed/0", json!({"id": 9})),
            PatchOperation::upsert("/feed/-", json!({"id": 9})),
            PatchOperation::limit("/feed", -5),
        ];
        let wire = encode_patch(&ops).unwrap();
        assert_eq!(
            wire,
            json!([
                ["replace", "/name", "Jane"],
                ["add", "/feed/0", {"id": 9}],
                ["upsert", "/feed/-", {"id": 9}],
                ["limit", "/feed", -5]
            ])
        );
        assert_eq!(decode_patch(&wire).unwrap(), ops);
    }

    #[test]
    fn null_value_is_kept() {
        let op = PatchOperation::replace("/x", Value::Null);
        let s = patch_to_string(std::slice::from_ref(&op)).unwrap();
        assert_eq!(s, r#"[["replace","/x",null]]"#);
        assert_eq!(patch_from_str(&s).unwrap(), vec![op]);
    }

    #[test]
    fn decode_rejects_unknown_op() {
        let err = decode_patch(&json!([["move", "/a", 1]])).unwrap_err();
        assert!(matches!(err, TypeError::Serialization(_)));
    }

    #[test]
    fn decode_rejects_wrong_arity() {
        assert!(decode_patch(&json!([["add", "/a"]])).is_err());
        assert!(decode_patch(&json!([["remove", "/a", 1]])).is_err());
        assert!(decode_patch(&json!([["add", "/a", 1, 2]])).is_err());
        assert!(decode_patch(&json!([["add"]])).is_err());
    }

    #[test]
    fn decode_rejects_non_integer_limit() {
        assert!(decode_patch(&json!([["limit", "/feed", "five"]])).is_err());
        assert!(decode_patch(&json!([["limit", "/feed", 2.5]])).is_err());
    }

    #[test]
    fn validate_checks_value_slot() {
        let bad = PatchOperation {
            op: OpKind::Replace,
            path: "/a".into(),
            value: None,
        };
        assert!(matches!(bad.validate(), Err(TypeError::InvalidOperation(_))));
        assert!(PatchOperation::remove("/a").validate().is_ok());
    }

    #[test]
    fn op_names() {
        assert_eq!(OpKind::Upsert.to_string(), "upsert");
        assert!(!OpKind::Remove.takes_value());
        assert!(OpKind::Limit.takes_value());
    }
}
