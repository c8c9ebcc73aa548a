//! Clusterer rule loading and validation.

use crate::error::{RuleDefinitionError, RuleFileError};
use crate::filter::FilterExpression;
use crate::regex_mapping::RegexMapping;
use crate::rule_tree::FilterableRule;
use crate::signature::SignatureRule;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

const EXPECTED_KEYS: &[&str] = &["filter", "pattern", "repl", "tests"];

#[derive(Debug, Deserialize)]
struct RawTest {
    raw: String,
    result: String,
}

#[derive(Debug, Deserialize)]
struct RawClustererRule {
    filter: String,
    pattern: String,
    repl: String,
    #[serde(default)]
    tests: Option<Vec<RawTest>>,
    #[serde(flatten)]
    extra: std::collections::HashMap<String, serde_json::Value>,
}

/// A loaded, compiled clusterer rule: a filter gating which events it
/// applies to, a single signature rewrite step, and optional self-tests.
#[derive(Debug, Clone)]
pub struct ClustererRule {
    filter: FilterExpression,
    signature: SignatureRule,
    tests: Vec<(String, String)>,
    description: String,
}

impl ClustererRule {
    pub fn signature_rule(&self) -> &SignatureRule {
        &self.signature
    }

    pub fn tests(&self) -> &[(String, String)] {
        &self.tests
    }

    /// Load every `*.json` rule file in `dir`, in lexicographic file-name
    /// order, each file's rules in declared array order.
    pub fn load_from_directory(
        dir: &Path,
        mapping: &RegexMapping,
    ) -> Result<Vec<ClustererRule>, RuleFileError> {
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
    ) -> Result<Vec<ClustererRule>, RuleFileError> {
        let contents = std::fs::read_to_string(path).map_err(|e| RuleFileError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let raw: Vec<RawClustererRule> =
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
        raw: RawClustererRule,
        mapping: &RegexMapping,
    ) -> Result<ClustererRule, RuleDefinitionError> {
        if !raw.extra.is_empty() {
            let mut found: Vec<String> = vec!["filter".into(), "pattern".into(), "repl".into()];
            if raw.tests.is_some() {
                found.push("tests".into());
            }
            found.extend(raw.extra.keys().cloned());
            return Err(RuleDefinitionError::UnexpectedKeys {
                found,
                expected: EXPECTED_KEYS.iter().map(|s| s.to_string()).collect(),
            });
        }

        let filter = FilterExpression::parse(&raw.filter)?;

        let pattern_source = resolve_keyword(&raw.pattern, mapping)
            .ok_or_else(|| RuleDefinitionError::UnresolvedKeyword(raw.pattern.clone()))?;
        let pattern = Regex::new(&pattern_source)
            .map_err(|e| RuleDefinitionError::InvalidRegex(raw.pattern.clone(), e))?;

        let tests = raw
            .tests
            .unwrap_or_default()
            .into_iter()
            .map(|t| (t.raw, t.result))
            .collect();

        Ok(ClustererRule {
            filter,
            signature: SignatureRule::new(pattern, raw.repl),
            tests,
            description: raw.filter,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl FilterableRule for ClustererRule {
    fn filter(&self) -> &FilterExpression {
        &self.filter
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

    #[test]
    fn rejects_unexpected_keys() {
        let mapping = RegexMapping::empty();
        let raw: RawClustererRule = serde_json::from_str(
            r#"{"filter": "a: 1", "pattern": "x", "repl": "y", "bogus": true}"#,
        )
        .unwrap();
        let err = ClustererRule::from_raw(raw, &mapping).unwrap_err();
        assert!(matches!(err, RuleDefinitionError::UnexpectedKeys { .. }));
    }

    #[test]
    fn resolves_regex_keyword() {
        let mapping = RegexMapping::from_yaml_str("RE_DIGITS: \"\\\\d+\"\n").unwrap();
        let raw: RawClustererRule =
            serde_json::from_str(r#"{"filter": "a: 1", "pattern": "RE_DIGITS", "repl": "N"}"#)
                .unwrap();
        let rule = ClustererRule::from_raw(raw, &mapping).unwrap();
        assert!(rule.signature_rule().pattern.is_match("123"));
    }

    #[test]
    fn unresolved_keyword_is_rejected() {
        let mapping = RegexMapping::empty();
        let raw: RawClustererRule = serde_json::from_str(
            r#"{"filter": "a: 1", "pattern": "RE_MISSING", "repl": "y"}"#,
        )
        .unwrap();
        let err = ClustererRule::from_raw(raw, &mapping).unwrap_err();
        assert!(matches!(err, RuleDefinitionError::UnresolvedKeyword(_)));
    }
}
