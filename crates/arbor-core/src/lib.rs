//! arbor-core
//!
//! Core of the arbor category tree:
//! - Category / deleted-log / tree state models (one canonical schema)
//! - `CategoryTree` engine: validated mutations over a flat parent-linked list
//! - Display id regeneration (`CAT1.2.3`, name-ranked among siblings)
//! - Cascade search with ancestor/descendant expansion
//! - Verification, legacy normalization and repair of stored state
//! - The `StateStore` contract plus an in-memory store
//!
//! Nothing here touches the filesystem or reads the environment.

pub mod clock;
pub mod config;
pub mod display_id;
pub mod engine;
pub mod errors;
pub mod model;
pub mod normalize;
pub mod ordering;
pub mod search;
pub mod store;
pub mod tree;
pub mod verify;
pub mod version;

pub use crate::engine::CategoryTree;
pub use crate::errors::{ArborError, ArborResult, ValidationError};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{DuplicateNaming, EngineConfig, LimitsConfig};
    pub use crate::display_id::regenerate_category_ids;
    pub use crate::engine::{
        CategoryTree, ImportRecord, ImportReport, LevelDirection, OrderDirection, SkippedRecord,
        TreeStats,
    };
    pub use crate::model::{
        Category, CategoryInput, CategoryPatch, DeletedLogEntry, FieldDefinition, LogEntry, NodeId,
        Priority, Status, TreeState,
    };
    pub use crate::search::{SearchField, SearchFilters, SortBy, SortOrder};
    pub use crate::store::{MemoryStore, StateStore};
    pub use crate::verify::{Finding, FindingLevel, VerifyReport};
    pub use crate::{ArborError, ArborResult, ValidationError};
}
