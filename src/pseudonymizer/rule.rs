//! Pseudonymizer rule loading and validation.

use crate::error::{RuleDefinitionError, RuleFileError};
use crate::filter::FilterExpression;
use crate::regex_mapping::RegexMapping;
use crate::rule_tree::FilterableRule;
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const EXPECTED_KEYS: &[&str] = &["filter", "pseudonymize", "url_fields", "description"];

#[derive(Debug, Deserialize)]
struct RawPseudonymizerRule {
    filter: String,
    pseudonymize: IndexMap<String, String>,
    #[serde(default)]
    url_fields: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    extra: std::collections::HashMap<String, serde_json::Value>,
}

/// A loaded, compiled pseudonymizer rule.
///
/// `field_patterns` keeps the rule's declared JSON key order (`IndexMap`)
/// since field iteration order during `process` must match the rule's
/// declared order.
#[derive(Debug, Clone)]
pub struct PseudonymizerRule {
    filter: FilterExpression,
    field_patterns: IndexMap<String, Regex>,
    url_fields: HashSet<String>,
    description: String,
}

impl PseudonymizerRule {
    pub fn field_patterns(&self) -> &IndexMap<String, Regex> {
        &self.field_patterns
    }

    pub fn is_url_field(&self, path: &str) -> bool {
        self.url_fields.contains(path)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn load_from_directory(
        dir: &Path,
        mapping: &RegexMapping,
    ) -> Result<Vec<PseudonymizerRule>, RuleFileError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| RuleFileError::Io {
                path: dir.display().to_string(),
                source: e,
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut rules = Vec::new();
        for path in paths {
            rules.extend(Self::load_from_file(&path, mapping)?);
        }
        Ok(rules)
    }

    pub fn load_from_file(
        path: &Path,
        mapping: &RegexMapping,
    ) -> Result<Vec<PseudonymizerRule>, RuleFileError> {
        let contents = std::fs::read_to_string(path).map_err(|e| RuleFileError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let raw: Vec<RawPseudonymizerRule> =
            serde_json::from_str(&contents).map_err(|e| RuleFileError::Json {
                path: path.display().to_string(),
                source: e,
            })?;

        raw.into_iter()
            .enumerate()
            .map(|(index, rule)| {
                Self::from_raw(rule, mapping).map_err(|source| RuleFileError::InvalidRule {
                    path: path.display().to_string(),
                    index,
                    source,
                })
            })
            .collect()
    }

    fn from_raw(
        raw: RawPseudonymizerRule,
        mapping: &RegexMapping,
    ) -> Result<PseudonymizerRule, RuleDefinitionError> {
        if !raw.extra.is_empty() {
            let mut found: Vec<String> = vec!["filter".into(), "pseudonymize".into()];
            found.push("url_fields".into());
            found.push("description".into());
            found.extend(raw.extra.keys().cloned());
            return Err(RuleDefinitionError::UnexpectedKeys {
                found,
                expected: EXPECTED_KEYS.iter().map(|s| s.to_string()).collect(),
            });
        }

        let filter = FilterExpression::parse(&raw.filter)?;

        let mut field_patterns = IndexMap::with_capacity(raw.pseudonymize.len());
        for (path, keyword_or_pattern) in raw.pseudonymize {
            let source = resolve_keyword(&keyword_or_pattern, mapping)
                .ok_or_else(|| RuleDefinitionError::UnresolvedKeyword(keyword_or_pattern.clone()))?;
            let regex = Regex::new(&source)
                .map_err(|e| RuleDefinitionError::InvalidRegex(path.clone(), e))?;
            field_patterns.insert(path, regex);
        }

        let url_fields: HashSet<String> = raw.url_fields.into_iter().collect();
        for field in &url_fields {
            if !field_patterns.contains_key(field) {
                return Err(RuleDefinitionError::UrlFieldNotPseudonymized(field.clone()));
            }
        }

        Ok(PseudonymizerRule {
            filter,
            field_patterns,
            url_fields,
            description: raw.description,
        })
    }
}

impl FilterableRule for PseudonymizerRule {
    fn filter(&self) -> &FilterExpression {
        &self.filter
    }
}

#[cfg(test)]
impl PseudonymizerRule {
    /// Build a rule directly from already-parsed parts, bypassing file
    /// loading, for use by other modules' unit tests.
    pub fn for_test(
        filter: &str,
        field_patterns: IndexMap<String, Regex>,
        url_fields: HashSet<String>,
    ) -> Self {
        Self {
            filter: FilterExpression::parse(filter).unwrap(),
            field_patterns,
            url_fields,
            description: "test".to_string(),
        }
    }
}

/// Resolve a `RE_*` keyword against the regex mapping. Anything not
/// starting with `RE_` is treated as an inline pattern. `RE_*` references
/// that don't resolve are a validation error.
fn resolve_keyword(raw: &str, mapping: &RegexMapping) -> Option<String> {
    if let Some(resolved) = mapping.resolve(raw) {
        return Some(resolved.to_string());
    }
    if raw.starts_with("RE_") {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> RegexMapping {
        RegexMapping::from_yaml_str("RE_WHOLE_FIELD: \"^.*$\"\nRE_CAP: \"(\\\\w+)@(\\\\w+)\"\n")
            .unwrap()
    }

    #[test]
    fn resolves_keyword_and_preserves_field_order() {
        let raw: RawPseudonymizerRule = serde_json::from_str(
            r#"{"filter": "event_id: 1234",
                "pseudonymize": {"b": "RE_WHOLE_FIELD", "a": "RE_CAP"},
                "url_fields": [],
                "description": "x"}"#,
        )
        .unwrap();
        let rule = PseudonymizerRule::from_raw(raw, &mapping()).unwrap();
        let keys: Vec<&str> = rule.field_patterns().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn unresolved_keyword_is_rejected() {
        let raw: RawPseudonymizerRule = serde_json::from_str(
            r#"{"filter": "a: 1", "pseudonymize": {"x": "RE_MISSING"}, "url_fields": [], "description": ""}"#,
        )
        .unwrap();
        let err = PseudonymizerRule::from_raw(raw, &mapping()).unwrap_err();
        assert!(matches!(err, RuleDefinitionError::UnresolvedKeyword(_)));
    }

    #[test]
    fn url_field_must_be_a_pseudonymized_key() {
        let raw: RawPseudonymizerRule = serde_json::from_str(
            r#"{"filter": "a: 1", "pseudonymize": {"x": "RE_WHOLE_FIELD"}, "url_fields": ["y"], "description": ""}"#,
        )
        .unwrap();
        let err = PseudonymizerRule::from_raw(raw, &mapping()).unwrap_err();
        assert!(matches!(err, RuleDefinitionError::UrlFieldNotPseudonymized(_)));
    }

    #[test]
    fn rejects_unexpected_top_level_keys() {
        let raw: RawPseudonymizerRule = serde_json::from_str(
            r#"{"filter": "a: 1", "pseudonymize": {}, "url_fields": [], "description": "", "bogus": 1}"#,
        )
        .unwrap();
        let err = PseudonymizerRule::from_raw(raw, &mapping()).unwrap_err();
        assert!(matches!(err, RuleDefinitionError::UnexpectedKeys { .. }));
    }
}
