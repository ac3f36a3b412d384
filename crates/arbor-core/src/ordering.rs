//! Ordering utilities for category names.
//!
//! Display ids rank siblings by name. The comparison follows the levels of a
//! root-locale collation:
//! - primary: base letters, with case and diacritics folded (`"Äpfel"` sorts
//!   with `"apfel"`)
//! - secondary: unaccented before accented (`"resume"` < `"résumé"`)
//! - tertiary: lowercase before uppercase at the first differing character
//! - equal names keep their array order, via stable sorting
//!
//! Sibling name uniqueness uses `name_key`, which folds case and trims.

use std::cmp::Ordering;

use itertools::Itertools;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::Category;

/// Lowercased canonical decomposition with combining marks removed.
fn primary_key(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect::<String>().to_lowercase()
}

/// Lowercased canonical decomposition, marks kept.
fn secondary_key(s: &str) -> String {
    s.nfd().collect::<String>().to_lowercase()
}

/// Compare two names the way a locale-aware UI sort would.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| secondary_key(a).cmp(&secondary_key(b)))
        // Reversed raw comparison puts lowercase first ("a" < "A").
        .then_with(|| b.nfd().cmp(a.nfd()))
}

/// Key used for sibling name uniqueness.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Return `indices` sorted by the name of the referenced categories.
///
/// Sorting is stable, so equal names keep their relative array order.
pub fn sort_indices_by_name(categories: &[Category], indices: &[usize]) -> Vec<usize> {
    indices
        .iter()
        .copied()
        .sorted_by(|&a, &b| locale_cmp(&categories[a].name, &categories[b].name))
        .collect()
}
