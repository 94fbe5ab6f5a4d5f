use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Configuration shared by the differ and the applier.
///
/// Callers build one per session (or load it from TOML) and pass it into
/// every diff and apply call. Nothing is read from process-wide state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// When `false`, diffing degrades to resending the whole subtree.
    pub diff_enabled: bool,
    /// Field carrying an element's identity for `$$<id>` segments and `upsert`.
    pub id_field: String,
    /// Optional cap on nesting depth for diff and on pointer length for
    /// apply. Unbounded when `None`.
    pub max_depth: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            diff_enabled: true,
            id_field: "id".into(),
            max_depth: None,
        }
    }
}

impl SyncConfig {
    /// A configuration that always resends the full tree.
    pub fn full_resend() -> Self {
        Self {
            diff_enabled: false,
            ..Default::default()
        }
    }

    /// Parse from TOML. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> TypeResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| TypeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no diff or apply call could honor.
    pub fn validate(&self) -> TypeResult<()> {
        if self.id_field.is_empty() {
            return Err(TypeError::InvalidConfig("id_field must not be empty".into()));
        }
        if self.max_depth == Some(0) {
            return Err(TypeError::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}
