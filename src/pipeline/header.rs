//! Header resolution: header row → field-name → column-position.
//!
//! Matching is relaxed: header cells are trimmed, compared ASCII case-insensitively, and spaces,
//! underscores and hyphens are ignored, so `First Name`, `first_name` and `FIRSTNAME` all resolve
//! to `FirstName`. Configured aliases are consulted first. When two columns resolve to the same
//! field, the leftmost one wins. Columns that match no known field are ignored.

use std::collections::HashMap;

use crate::error::{ImportError, ImportResult};
use crate::types::RawRow;

/// Resolved positions of the recognized fields of one import kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    positions: HashMap<&'static str, usize>,
}

impl HeaderMap {
    /// Column position of `field`, or `None` when an optional field is absent.
    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.positions.contains_key(field)
    }

    /// Number of recognized fields present in the document.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Map `header` onto the `required` and `optional` fields of an import kind.
///
/// Fails with [`ImportError::MissingColumns`] naming every required field that is not present.
pub fn resolve_header(
    header: &RawRow,
    required: &[&'static str],
    optional: &[&'static str],
    aliases: &HashMap<String, String>,
) -> ImportResult<HeaderMap> {
    let aliases: HashMap<String, String> = aliases
        .iter()
        .map(|(alias, canonical)| (normalize(alias), normalize(canonical)))
        .collect();

    let known: HashMap<String, &'static str> = required
        .iter()
        .chain(optional.iter())
        .map(|f| (normalize(f), *f))
        .collect();

    let mut positions: HashMap<&'static str, usize> = HashMap::new();
    for (position, (column, _)) in header.iter().enumerate() {
        let mut key = normalize(column);
        if let Some(canonical) = aliases.get(&key) {
            key = canonical.clone();
        }
        if let Some(field) = known.get(&key) {
            positions.entry(*field).or_insert(position);
        }
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|f| !positions.contains_key(*f))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns { columns: missing });
    }

    Ok(HeaderMap { positions })
}
