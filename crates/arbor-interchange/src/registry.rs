//! Format registry and resolution.
//!
//! The registry stores available import formats and resolves them by id or by
//! file extension.
//!
//! Requirements:
//! - stable ordering for lookups and iteration
//! - clear errors for unknown formats
//! - no global mutable state

use std::collections::BTreeMap;
use std::path::Path;

use arbor_core::engine::ImportRecord;

use crate::error::ImportError;
use crate::importer::Importer;
use crate::spec::FormatSpec;

/// An importer instance plus its static spec.
pub struct RegisteredFormat {
    pub spec: FormatSpec,
    pub importer: Box<dyn Importer>,
}

impl RegisteredFormat {
    pub fn parse(&self, input: &str) -> Result<Vec<ImportRecord>, ImportError> {
        self.importer.parse(input)
    }
}

/// Import formats keyed by format id.
#[derive(Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, RegisteredFormat>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the JSON and CSV importers.
    #[cfg(feature = "builtin")]
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        for (spec, importer) in crate::builtin::formats() {
            // Builtin specs are static and known to be valid and distinct.
            if let Err(e) = reg.register(spec, importer) {
                tracing::error!(error = %e, "builtin format rejected");
            }
        }
        reg
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    pub fn register(&mut self, spec: FormatSpec, importer: Box<dyn Importer>) -> anyhow::Result<()> {
        spec.validate()?;

        let id = spec.id.as_str().to_string();
        if self.formats.contains_key(&id) {
            anyhow::bail!("format id already registered: {id}");
        }
        for ext in &spec.extensions {
            if let Some(other) = self.formats.values().find(|f| f.spec.claims_extension(ext)) {
                anyhow::bail!(
                    "extension .{ext} of {id} is already claimed by {}",
                    other.spec.id.as_str()
                );
            }
        }

        self.formats.insert(id, RegisteredFormat { spec, importer });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredFormat> {
        self.formats.get(id)
    }

    /// Format ids in deterministic order.
    pub fn list_ids(&self) -> Vec<String> {
        self.formats.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegisteredFormat)> {
        self.formats.iter()
    }

    /// Resolve by exact id (case-insensitive).
    pub fn resolve(&self, id: &str) -> Result<&RegisteredFormat, ImportError> {
        let wanted = id.trim().to_ascii_lowercase();
        self.formats
            .get(&wanted)
            .ok_or_else(|| ImportError::UnsupportedFormat(id.to_string()))
    }

    /// Resolve by the extension of `path`.
    pub fn resolve_path(&self, path: &Path) -> Result<&RegisteredFormat, ImportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ImportError::UnsupportedFormat(path.display().to_string()))?;
        self.formats
            .values()
            .find(|f| f.spec.claims_extension(ext))
            .ok_or_else(|| ImportError::UnsupportedFormat(format!(".{ext}")))
    }

    /// Resolve (explicit id wins over the path's extension) and parse.
    pub fn parse(&self, format: Option<&str>, path: &Path, input: &str) -> Result<Vec<ImportRecord>, ImportError> {
        let fmt = match format {
            Some(id) => self.resolve(id)?,
            None => self.resolve_path(path)?,
        };
        let records = fmt.parse(input)?;
        tracing::debug!(format = fmt.spec.id.as_str(), records = records.len(), "parsed import file");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;
    impl Importer for Fixed {
        fn parse(&self, _input: &str) -> Result<Vec<ImportRecord>, ImportError> {
            Ok(vec![ImportRecord::new("A", "d")])
        }
    }

    #[test]
    fn register_and_resolve() {
        let mut reg = FormatRegistry::new();
        reg.register(FormatSpec::new("fixed", "Fixed").extension("fx"), Box::new(Fixed))
            .unwrap();

        assert_eq!(reg.list_ids(), vec!["fixed"]);
        assert!(reg.resolve("FIXED").is_ok());
        assert!(reg.resolve_path(Path::new("a/b.FX")).is_ok());
        assert!(matches!(
            reg.resolve_path(Path::new("a/b.txt")),
            Err(ImportError::UnsupportedFormat(_))
        ));
        let records = reg.parse(None, Path::new("x.fx"), "").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn duplicate_ids_and_extensions_are_rejected() {
        let mut reg = FormatRegistry::new();
        reg.register(FormatSpec::new("fixed", "Fixed").extension("fx"), Box::new(Fixed))
            .unwrap();
        assert!(reg
            .register(FormatSpec::new("fixed", "Again"), Box::new(Fixed))
            .is_err());
        assert!(reg
            .register(FormatSpec::new("other", "Other").extension("FX"), Box::new(Fixed))
            .is_err());
        assert_eq!(reg.len(), 1);
    }
}
