//! Configuration structures for arbor-core.
//!
//! This module defines explicit configuration objects used by the engine and
//! by higher-level components (CLI, store adapters).
//!
//! The core crate itself does not read environment variables. All configuration
//! must be provided explicitly by the caller.

use crate::errors::{ArborError, ArborResult};

/// Engine configuration container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub duplicate_naming: DuplicateNaming,
    /// Suffix appended to duplicated names, e.g. `"(Copy)"`.
    pub copy_suffix: String,
    pub limits: LimitsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duplicate_naming: DuplicateNaming::RootOnly,
            copy_suffix: "(Copy)".to_string(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Structural limits enforced on every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Maximum `hierarchy_level` (roots are level 0).
    pub max_depth: u32,
    /// Maximum name length in characters.
    pub max_name_len: usize,
    /// Maximum number of active categories.
    pub max_categories: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_name_len: 200,
            max_categories: 100_000,
        }
    }
}

/// Which nodes of a duplicated subtree get the copy suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateNaming {
    /// Only the root of the cloned subtree is renamed.
    RootOnly,
    /// Every cloned node is renamed.
    AllNodes,
}

impl DuplicateNaming {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RootOnly => "root-only",
            Self::AllNodes => "all-nodes",
        }
    }

    pub fn parse(s: &str) -> ArborResult<Self> {
        match s {
            "root-only" => Ok(Self::RootOnly),
            "all-nodes" => Ok(Self::AllNodes),
            _ => Err(ArborError::invalid_argument(format!(
                "unknown duplicate naming policy: {s}"
            ))),
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &EngineConfig) -> ArborResult<()> {
    if cfg.copy_suffix.trim().is_empty() {
        return Err(ArborError::invalid_argument("copy suffix must not be empty"));
    }

    if cfg.limits.max_name_len == 0 {
        return Err(ArborError::invalid_argument(
            "max_name_len must be greater than zero",
        ));
    }

    if cfg.limits.max_categories == 0 {
        return Err(ArborError::invalid_argument(
            "max_categories must be greater than zero",
        ));
    }

    Ok(())
}
