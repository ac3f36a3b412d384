//! Format specification types.
//!
//! A `FormatSpec` is the static, data-only description of an import format:
//! - stable id (`"json"`, `"csv"`)
//! - file extensions it claims
//! - media type and free-form metadata for UIs
//!
//! Specs never parse anything; the paired `Importer` does.

use std::collections::BTreeMap;

use anyhow::Result;

/// Stable format identifier, lowercase ASCII.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatId(pub String);

impl FormatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormatSpec {
    pub id: FormatId,

    /// Human-readable display name.
    pub name: String,

    /// Extensions without the dot, lowercase.
    pub extensions: Vec<String>,

    pub media_type: String,

    pub meta: BTreeMap<String, String>,
}

impl FormatSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: FormatId::new(id),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into().trim_start_matches('.').to_ascii_lowercase());
        self
    }

    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn claims_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn validate(&self) -> Result<()> {
        let id = self.id.as_str();
        if id.trim().is_empty() {
            anyhow::bail!("format id is empty");
        }
        if !id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') {
            anyhow::bail!("format id must be lowercase ASCII: {id}");
        }
        if self.name.trim().is_empty() {
            anyhow::bail!("format name is empty");
        }
        if self.extensions.iter().any(|e| e.is_empty()) {
            anyhow::bail!("format {id} declares an empty extension");
        }
        Ok(())
    }
}
