//! Import configuration.
//!
//! [`ImportConfig`] holds the knobs that are fixed per deployment rather than per upload. It
//! deserializes from TOML with every field optional:
//!
//! ```toml
//! sample_size = 25
//! strict_optional_fields = true
//! alert_at_or_above = "error"
//! sheet = { named = "Students" }
//!
//! [column_aliases]
//! "Admission No" = "StudentId"
//! "Mobile" = "Phone"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ImportResult;
use crate::pipeline::ImportSeverity;
use crate::tabular::SheetSelection;

/// Default number of records returned in [`crate::pipeline::ImportOutcome::data`].
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// How many created/updated records to echo back in the outcome.
    pub sample_size: usize,
    /// Report malformed optional dates/numbers instead of silently dropping them.
    pub strict_optional_fields: bool,
    /// Extra header spellings: alias → canonical field name
    /// (e.g. `"Admission No" → "StudentId"`).
    pub column_aliases: HashMap<String, String>,
    /// Sheet to read from multi-sheet documents.
    pub sheet: SheetSelection,
    /// Severity at which observers receive `on_alert`.
    pub alert_at_or_above: ImportSeverity,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            strict_optional_fields: false,
            column_aliases: HashMap::new(),
            sheet: SheetSelection::First,
            alert_at_or_above: ImportSeverity::Critical,
        }
    }
}

impl ImportConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(input: &str) -> ImportResult<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Load a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> ImportResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::{ImportConfig, DEFAULT_SAMPLE_SIZE};
    use crate::pipeline::ImportSeverity;
    use crate::tabular::SheetSelection;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = ImportConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ImportConfig::default());
        assert_eq!(cfg.sample_size, DEFAULT_SAMPLE_SIZE);
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let cfg = ImportConfig::from_toml_str(
            r#"
            sample_size = 3
            strict_optional_fields = true
            alert_at_or_above = "error"
            sheet = { named = "Students" }

            [column_aliases]
            "Admission No" = "StudentId"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.sample_size, 3);
        assert!(cfg.strict_optional_fields);
        assert_eq!(cfg.alert_at_or_above, ImportSeverity::Error);
        assert_eq!(cfg.sheet, SheetSelection::Named("Students".to_string()));
        assert_eq!(cfg.column_aliases["Admission No"], "StudentId");
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = ImportConfig::from_toml_str("sample_size = \"many\"").unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
