//! The importer contract.

use arbor_core::engine::ImportRecord;

use crate::error::ImportError;

/// Parses one file format into loosely-typed import records.
///
/// Importers are pure: they see the text, never the filesystem or the tree.
/// Tree rules (parent remapping, name clashes) are applied later by
/// `CategoryTree::import`.
pub trait Importer: Send + Sync {
    fn parse(&self, input: &str) -> Result<Vec<ImportRecord>, ImportError>;
}
