//! Normalization of domain records into plain tree values.
//!
//! The differ only understands scalars, sequences and records. Domain types
//! opt in by implementing [`Normalizable`]. Records that arrive already
//! encoded but still tagged with their domain type (a `"__struct__"` field
//! by default) can be normalized lazily through a [`NormalizerRegistry`],
//! which the differ consults as its `prepare_map` hook.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Record;

/// Field naming the domain type of a tagged record.
pub const DEFAULT_TAG_FIELD: &str = "__struct__";

/// A domain value that can be lowered to a plain tree value.
pub trait Normalizable {
    /// Convert into scalars, sequences and records only.
    fn to_plain_value(&self) -> Value;
}

impl Normalizable for Value {
    fn to_plain_value(&self) -> Value {
        self.clone()
    }
}

impl<T: Normalizable> Normalizable for Option<T> {
    fn to_plain_value(&self) -> Value {
        match self {
            Some(v) => v.to_plain_value(),
            None => Value::Null,
        }
    }
}

impl<T: Normalizable> Normalizable for Vec<T> {
    fn to_plain_value(&self) -> Value {
        Value::Array(self.iter().map(Normalizable::to_plain_value).collect())
    }
}

impl<T: Normalizable> Normalizable for BTreeMap<String, T> {
    fn to_plain_value(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_plain_value()))
                .collect(),
        )
    }
}

type NormalizeFn = Box<dyn Fn(&Record) -> anyhow::Result<Value> + Send + Sync>;

/// Registry of normalizers keyed by the record's type tag.
///
/// Records whose tag is absent or unregistered pass through unchanged.
pub struct NormalizerRegistry {
    tag_field: String,
    normalizers: HashMap<String, NormalizeFn>,
}

impl NormalizerRegistry {
    /// An empty registry reading [`DEFAULT_TAG_FIELD`].
    pub fn new() -> Self {
        Self::with_tag_field(DEFAULT_TAG_FIELD)
    }

    /// An empty registry reading a custom tag field.
    pub fn with_tag_field(tag_field: impl Into<String>) -> Self {
        Self {
            tag_field: tag_field.into(),
            normalizers: HashMap::new(),
        }
    }

    /// The field holding the type tag.
    pub fn tag_field(&self) -> &str {
        &self.tag_field
    }

    /// Register a raw normalizer for `tag`, replacing any previous one.
    pub fn register<F>(&mut self, tag: impl Into<String>, normalizer: F) -> &mut Self
    where
        F: Fn(&Record) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.normalizers.insert(tag.into(), Box::new(normalizer));
        self
    }

    /// Register a domain type: tagged records are decoded into `T` (tag
    /// field excluded) and lowered through [`Normalizable::to_plain_value`].
    pub fn register_type<T>(&mut self, tag: impl Into<String>) -> &mut Self
    where
        T: Normalizable + DeserializeOwned + 'static,
    {
        let tag_field = self.tag_field.clone();
        self.register(tag, move |record| {
            let mut fields = record.clone();
            fields.remove(&tag_field);
            let typed: T = serde_json::from_value(Value::Object(fields))?;
            Ok(typed.to_plain_value())
        })
    }

    /// Returns `true` if a normalizer is registered for `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.normalizers.contains_key(tag)
    }

    /// Normalize one record. The result may be any tree value.
    pub fn normalize(&self, record: &Record) -> anyhow::Result<Value> {
        let normalizer = record
            .get(&self.tag_field)
            .and_then(Value::as_str)
            .and_then(|tag| self.normalizers.get(tag));

        match normalizer {
            Some(f) => f(record),
            None => Ok(Value::Object(record.clone())),
        }
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NormalizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&String> = self.normalizers.keys().collect();
        tags.sort();
        f.debug_struct("NormalizerRegistry")
            .field("tag_field", &self.tag_field)
            .field("tags", &tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Timestamp {
        secs: i64,
    }

    impl Normalizable for Timestamp {
        fn to_plain_value(&self) -> Value {
            Value::String(format!("t+{}", self.secs))
        }
    }

    fn record(v: Value) -> Record {
        match v {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn untagged_record_passes_through() {
        let registry = NormalizerRegistry::new();
        let r = record(json!({"a": 1}));
        assert_eq!(registry.normalize(&r).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn unregistered_tag_passes_through() {
        let registry = NormalizerRegistry::new();
        let r = record(json!({"__struct__": "User", "name": "Bob"}));
        assert_eq!(registry.normalize(&r).unwrap(), Value::Object(r.clone()));
    }

    #[test]
    fn registered_type_lowers_to_scalar() {
        let mut registry = NormalizerRegistry::new();
        registry.register_type::<Timestamp>("Timestamp");
        assert!(registry.contains("Timestamp"));

        let r = record(json!({"__struct__": "Timestamp", "secs": 5}));
        assert_eq!(registry.normalize(&r).unwrap(), json!("t+5"));
    }

    #[test]
    fn decode_failure_propagates() {
        let mut registry = NormalizerRegistry::new();
        registry.register_type::<Timestamp>("Timestamp");

        let r = record(json!({"__struct__": "Timestamp", "secs": "soon"}));
        assert!(registry.normalize(&r).is_err());
    }

    #[test]
    fn raw_normalizer_and_custom_tag_field() {
        let mut registry = NormalizerRegistry::with_tag_field("kind");
        registry.register("secret", |r| {
            let mut out = r.clone();
            out.insert("token".into(), json!("***"));
            Ok(Value::Object(out))
        });

        let r = record(json!({"kind": "secret", "token": "abc"}));
        assert_eq!(
            registry.normalize(&r).unwrap(),
            json!({"kind": "secret", "token": "***"})
        );
        assert_eq!(registry.tag_field(), "kind");
    }

    #[test]
    fn container_impls() {
        let v: Vec<Option<Value>> = vec![Some(json!(1)), None];
        assert_eq!(v.to_plain_value(), json!([1, null]));

        let mut m = BTreeMap::new();
        m.insert("k".to_string(), json!(true));
        assert_eq!(m.to_plain_value(), json!({"k": true}));
    }
}
