//! Signature Engine: ordered regex rewrites producing a stable cluster
//! signature string.

use regex::Regex;

/// A single ordered rewrite step: `pattern` is matched against the running
/// text and replaced with `repl`, which may reference capture groups using
/// `regex`'s `$1`-style replacement syntax.
#[derive(Debug, Clone)]
pub struct SignatureRule {
    pub pattern: Regex,
    pub repl: String,
}

impl SignatureRule {
    pub fn new(pattern: Regex, repl: impl Into<String>) -> Self {
        Self {
            pattern,
            repl: repl.into(),
        }
    }
}

/// Apply a single rule to `raw`, returning the rewritten text. Exposed
/// standalone so rule self-tests (`test_rules`) can check one rule's output
/// in isolation without running the whole chain.
pub fn apply_signature_rule(rule: &SignatureRule, raw: &str) -> String {
    rule.pattern.replace_all(raw, rule.repl.as_str()).into_owned()
}

/// Runs an ordered chain of rules over `raw`, feeding each rule's output as
/// the next rule's input. An empty rule list returns `raw` unchanged.
pub fn run(raw: &str, rules: &[&SignatureRule]) -> String {
    let mut text = raw.to_string();
    for rule in rules {
        text = apply_signature_rule(rule, &text);
    }
    text
}
