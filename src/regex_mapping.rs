//! Regex keyword mapping: rule files may reference a named keyword (e.g.
//! `RE_WHITESPACE`) instead of an inline pattern; this resolves those
//! keywords against a YAML mapping loaded once at startup.
//!
//! Loaded straight into a typed struct with `serde_yml`, no intermediate
//! `serde_yaml::Value` walk.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// A keyword → regex-source lookup table.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RegexMapping {
    #[serde(flatten)]
    patterns: HashMap<String, String>,
}

impl RegexMapping {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        serde_yml::from_str(contents).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::TldList(path.display().to_string(), e))?;
        Self::from_yaml_str(&contents)
    }

    /// Resolve a keyword to its regex source. Keywords are matched
    /// case-sensitively since they're identifiers, not user text.
    pub fn resolve<'a>(&'a self, keyword: &str) -> Option<&'a str> {
        self.patterns.get(keyword).map(String::as_str)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.patterns.contains_key(keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_keyword() {
        let mapping = RegexMapping::from_yaml_str("RE_WHITESPACE: \"\\\\s+\"\n").unwrap();
        assert_eq!(mapping.resolve("RE_WHITESPACE"), Some(r"\s+"));
    }

    #[test]
    fn unknown_keyword_is_none() {
        let mapping = RegexMapping::empty();
        assert!(mapping.resolve("RE_MISSING").is_none());
        assert!(!mapping.contains("RE_MISSING"));
    }
}
