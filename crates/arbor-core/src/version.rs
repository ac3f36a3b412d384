//! Version helpers.
//!
//! This module centralizes version handling for persisted tree state.
//! Legacy blobs written before versioning carry no version field and are
//! treated as version 0.

use crate::errors::{ArborError, ArborResult};

/// Version written by this crate.
pub const CURRENT_STATE_VERSION: u32 = 1;

/// Known persisted state versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StateVersion {
    /// Unversioned legacy layout (possibly snake_case field names).
    Legacy,
    V1,
}

impl StateVersion {
    /// Interpret the `version` field of a stored blob.
    pub fn from_field(field: Option<u64>) -> ArborResult<Self> {
        match field {
            None | Some(0) => Ok(Self::Legacy),
            Some(1) => Ok(Self::V1),
            Some(v) => Err(ArborError::invalid_argument(format!(
                "unsupported state version: {v}"
            ))),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            Self::Legacy => 0,
            Self::V1 => 1,
        }
    }

    pub fn is_current(&self) -> bool {
        self.as_u32() == CURRENT_STATE_VERSION
    }
}
