//! arbor-interchange
//!
//! File formats for moving categories in and out of a tree:
//! - `FormatRegistry`: importers keyed by format id, resolvable by extension
//! - builtin importers: JSON (array or `{categories}`) and CSV
//! - export: JSON document and CSV table
//!
//! Importers only parse. Parent remapping, name clashes and persistence are
//! the engine's job (`CategoryTree::import`).

pub mod error;
pub mod export;
pub mod importer;
pub mod registry;
pub mod spec;

#[cfg(feature = "builtin")]
pub mod builtin;

pub use crate::error::{ExportError, ImportError};
pub use crate::export::{to_csv, to_json, ExportDocument, CSV_HEADER};
pub use crate::importer::Importer;
pub use crate::registry::{FormatRegistry, RegisteredFormat};
pub use crate::spec::{FormatId, FormatSpec};
