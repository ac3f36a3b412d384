use std::io::Write;

use anyhow::Result;
use arbor_core::verify::Finding;
use arbor_core::ArborError;
use serde::Serialize;

use super::Tree;
use crate::output;

#[derive(Debug, Serialize)]
pub struct CheckOut<'a> {
    pub ok: bool,
    pub findings: Vec<FindingOut<'a>>,
    /// Problems found in the stored file and fixed in memory on open.
    pub repaired: Vec<FindingOut<'a>>,
}

#[derive(Debug, Serialize)]
pub struct FindingOut<'a> {
    pub level: &'static str,
    pub code: &'a str,
    pub message: &'a str,
}

impl<'a> From<&'a Finding> for FindingOut<'a> {
    fn from(f: &'a Finding) -> Self {
        Self {
            level: f.level.as_str(),
            code: &f.code,
            message: &f.message,
        }
    }
}

/// Verify the loaded tree. Fails (exit 1) when errors remain after load repair.
pub fn run(tree: &Tree) -> Result<()> {
    let report = tree.verify();
    let out = CheckOut {
        ok: report.ok && tree.load_findings().is_empty(),
        findings: report.findings.iter().map(FindingOut::from).collect(),
        repaired: tree.load_findings().iter().map(FindingOut::from).collect(),
    };

    output::emit(&out, |w| {
        for f in out.repaired.iter().chain(&out.findings) {
            writeln!(w, "{:<7} {}  {}", f.level, f.code, f.message)?;
        }
        if out.ok {
            writeln!(w, "ok: {} categories", tree.categories().len())
        } else {
            writeln!(w, "stored state needed repair; the next change will save the repaired tree")
        }
    })?;

    if report.has_errors() {
        return Err(ArborError::invariant(format!("{} verification errors", report.findings.len())).into());
    }
    Ok(())
}
