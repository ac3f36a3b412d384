//! Error types for arbor-core.
//!
//! Every engine operation returns an `ArborResult`. Callers are expected to
//! branch on the variant:
//! - `Validation` is caller-correctable ("fix your input")
//! - `NotFound` means the referenced id does not exist
//! - `Storage` means the state could not be persisted ("retry save")
//!
//! A failed operation never leaves a partial mutation behind.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type ArborResult<T> = Result<T, ArborError>;

/// Caller-correctable validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ValidationError {
    #[error("category name is required")]
    NameRequired,

    #[error("category description is required")]
    DescriptionRequired,

    #[error("a sibling category with this name already exists")]
    DuplicateName,

    #[error("parent category not found")]
    ParentNotFound,

    #[error("a category cannot be moved under itself or one of its descendants")]
    CyclicReparent,

    #[error("category has child categories; delete or move them first")]
    HasChildren,
}

impl ValidationError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NameRequired => "validation.name_required",
            Self::DescriptionRequired => "validation.description_required",
            Self::DuplicateName => "validation.duplicate_name",
            Self::ParentNotFound => "validation.parent_not_found",
            Self::CyclicReparent => "validation.cyclic_reparent",
            Self::HasChildren => "validation.has_children",
        }
    }
}

/// Top-level error for the category tree engine.
#[derive(Debug, Error)]
pub enum ArborError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("category not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ArborError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(v) => v.code(),
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Invariant(_) => "invariant",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Returns the validation kind, if this is a validation failure.
    pub fn validation(&self) -> Option<ValidationError> {
        match self {
            Self::Validation(v) => Some(*v),
            _ => None,
        }
    }

    /// Only storage failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
