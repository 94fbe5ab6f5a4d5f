//! Per-call diff options and the caller hooks they carry.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use treesync_types::{NormalizerRegistry, Pointer, Record, SyncConfig};

use crate::error::{DiffError, DiffResult};

/// Hook run on every record before it is compared or emitted.
///
/// Must be referentially transparent. It may lower a record to any value,
/// including a scalar.
pub type PrepareMap = Arc<dyn Fn(&Record) -> anyhow::Result<Value> + Send + Sync>;

/// Identity function for records inside sequences.
///
/// Returning `None` drops the whole sequence back to positional diffing.
pub type ObjectHash = Arc<dyn Fn(&Record) -> Option<Value> + Send + Sync>;

/// Options for a single [`diff`](crate::diff) call.
#[derive(Clone, Default)]
pub struct DiffOptions {
    /// Prefix for every emitted path, so a subtree can be diffed as if rooted.
    pub ancestor_path: String,
    /// Normalization hook; identity when `None`.
    pub prepare_map: Option<PrepareMap>,
    /// Identity function for keyed sequence diffing; positional when `None`.
    pub object_hash: Option<ObjectHash>,
    /// Shared configuration.
    pub config: SyncConfig,
}

impl DiffOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path every emitted operation is rooted at.
    pub fn ancestor_path(mut self, path: impl Into<String>) -> Self {
        self.ancestor_path = path.into();
        self
    }

    /// Install a `prepare_map` hook.
    pub fn prepare_map<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.prepare_map = Some(Arc::new(f));
        self
    }

    /// Use a [`NormalizerRegistry`] as the `prepare_map` hook.
    pub fn normalizers(mut self, registry: Arc<NormalizerRegistry>) -> Self {
        self.prepare_map = Some(Arc::new(move |record: &Record| registry.normalize(record)));
        self
    }

    /// Install an identity function.
    pub fn object_hash<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Option<Value> + Send + Sync + 'static,
    {
        self.object_hash = Some(Arc::new(f));
        self
    }

    /// Identify sequence records by the value of one field.
    pub fn hash_by_field(self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.object_hash(move |record| record.get(&field).cloned())
    }

    /// Replace the shared configuration.
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Parse and check the options. Returns the parsed ancestor pointer.
    ///
    /// The ancestor is only used as a prefix for emitted paths. A `$$`
    /// segment in it addresses a record key or a sequence element exactly
    /// as it would in any other operation path.
    pub fn validate(&self) -> DiffResult<Pointer> {
        self.config
            .validate()
            .map_err(|e| DiffError::InvalidOptions(e.to_string()))?;

        let ancestor = Pointer::parse(&self.ancestor_path)
            .map_err(|e| DiffError::InvalidOptions(format!("ancestor_path: {e}")))?;
        if let Some(max_depth) = self.config.max_depth {
            if ancestor.len() >= max_depth {
                return Err(DiffError::InvalidOptions(format!(
                    "ancestor_path {:?} is deeper than max_depth {max_depth}",
                    self.ancestor_path
                )));
            }
        }
        Ok(ancestor)
    }
}

impl fmt::Debug for DiffOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffOptions")
            .field("ancestor_path", &self.ancestor_path)
            .field("prepare_map", &self.prepare_map.is_some())
            .field("object_hash", &self.object_hash.is_some())
            .field("config", &self.config)
            .finish()
    }
}
