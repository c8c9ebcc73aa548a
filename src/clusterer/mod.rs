//! Clusterer processor: gates clusterability, runs the Signature Engine,
//! composes the final cluster signature.

pub mod rule;

use crate::error::RuleFileError;
use crate::event::{Event, EventValue};
use crate::processor::{ProcessorStats, Processor};
use crate::regex_mapping::RegexMapping;
use crate::rule_tree::RuleTree;
use crate::signature;
use rule::ClustererRule;
use std::path::PathBuf;
use tracing::debug;

/// Per-rule self-test outcome: `(actual, expected)` for each declared test
/// case, or `None` when the rule carries no `tests`.
pub type RuleTestResults = Vec<(String, Vec<Option<(String, String)>>)>;

pub struct Clusterer {
    name: String,
    output_field_name: String,
    rule_dirs: Vec<PathBuf>,
    regex_mapping: RegexMapping,
    rules: RuleTree<ClustererRule>,
    events_processed: u64,
    stats: ProcessorStats,
}

impl Clusterer {
    pub fn new(
        name: impl Into<String>,
        rule_dirs: Vec<PathBuf>,
        regex_mapping: RegexMapping,
        output_field_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            output_field_name: output_field_name.into(),
            rule_dirs,
            regex_mapping,
            rules: RuleTree::new(),
            events_processed: 0,
            stats: ProcessorStats::new(),
        }
    }

    fn load_rules(&mut self) -> Result<(), RuleFileError> {
        let mut loaded = Vec::new();
        for dir in &self.rule_dirs {
            loaded.extend(ClustererRule::load_from_directory(dir, &self.regex_mapping)?);
        }
        let total = loaded.len();
        for rule in loaded {
            self.rules.insert(rule);
        }
        debug!(
            "{} loaded {} rules",
            self.describe(),
            total
        );
        self.stats
            .record_rules(self.rules.len(), 0, self.rules.len());
        Ok(())
    }

    /// Mutates `event` by setting the output field iff clusterable.
    /// No-op on non-clusterable events.
    pub fn process(&mut self, event: &mut Event) {
        self.events_processed += 1;

        if !is_clusterable(event) {
            return;
        }

        let matching: Vec<&ClustererRule> = self.rules.matches(event);
        let signature_rules: Vec<_> = matching.iter().map(|r| r.signature_rule()).collect();

        let message = event.get_str("message").unwrap_or_default().to_string();
        let message_signature = signature::run(&message, &signature_rules);

        let final_signature = match syslog_pri(event) {
            Some((facility, severity)) => {
                format!("{facility} , {severity} , {message_signature}")
            }
            None => message_signature,
        };

        event.set(&self.output_field_name, EventValue::from(final_signature));
    }

    /// Read-only rule self-test runner.
    pub fn test_rules(&self) -> RuleTestResults {
        self.rules
            .iter()
            .map(|rule| {
                let key = rule.description().to_string();
                if rule.tests().is_empty() {
                    (key, vec![None])
                } else {
                    let results = rule
                        .tests()
                        .iter()
                        .map(|(raw, expected)| {
                            let actual =
                                signature::apply_signature_rule(rule.signature_rule(), raw);
                            Some((actual, expected.clone()))
                        })
                        .collect();
                    (key, results)
                }
            })
            .collect()
    }
}

impl Processor for Clusterer {
    type SetupError = RuleFileError;

    fn setup(&mut self) -> Result<(), Self::SetupError> {
        self.load_rules()
    }

    fn events_processed_count(&self) -> u64 {
        self.events_processed
    }

    fn describe(&self) -> String {
        format!("Clusterer ({})", self.name)
    }

    fn shut_down(&mut self) {}
}

/// Clusterability predicate: `clusterable` is checked first, then the
/// `tags` membership check, then syslog-PRI inference.
fn is_clusterable(event: &Event) -> bool {
    match event.get("message") {
        None => return false,
        Some(v) if v.is_null() => return false,
        _ => {}
    }

    if let Some(v) = event.get("clusterable") {
        return v
            .as_scalar()
            .map(|v| matches!(v, crate::value::Value::Bool(true)))
            .unwrap_or(false);
    }

    if let Some(tags) = event.get("tags") {
        if tags.contains_text("clusterable") {
            return true;
        }
    }

    syslog_pri(event).is_some()
}

fn syslog_pri(event: &Event) -> Option<(String, String)> {
    let facility = event.get("syslog.facility")?.as_scalar()?;
    let severity = event.get("event.severity")?.as_scalar()?;
    Some((facility.to_display_string(), severity.to_display_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignatureRule;
    use regex::Regex;

    fn engine() -> Clusterer {
        Clusterer::new("test", Vec::new(), RegexMapping::empty(), "cluster_signature")
    }

    #[test]
    fn missing_message_is_not_clusterable() {
        let mut c = engine();
        let mut event = Event::from([("other", "x")]);
        c.process(&mut event);
        assert!(!event.contains_path("cluster_signature"));
    }

    #[test]
    fn null_message_is_not_clusterable() {
        let mut c = engine();
        let mut event = Event::new();
        event.set("message", EventValue::Scalar(crate::value::Value::Null));
        c.process(&mut event);
        assert!(!event.contains_path("cluster_signature"));
    }

    #[test]
    fn explicit_clusterable_false_overrides_tags() {
        let mut c = engine();
        let mut event = Event::from([("message", "hi")]);
        event.set("clusterable", EventValue::from(false));
        event.set("tags", EventValue::Sequence(vec![EventValue::from("clusterable")]));
        c.process(&mut event);
        assert!(!event.contains_path("cluster_signature"));
    }

    #[test]
    fn tag_triggers_clusterable() {
        let mut c = engine();
        let mut event = Event::from([("message", "hello world")]);
        event.set("tags", EventValue::Sequence(vec![EventValue::from("clusterable")]));
        c.process(&mut event);
        assert_eq!(event.get_str("cluster_signature"), Some("hello world"));
    }

    #[test]
    fn syslog_pri_composes_facility_and_severity() {
        let mut c = engine();
        let mut event = Event::new();
        event.set("message", EventValue::from("boot sequence 42"));
        event.set("syslog.facility", EventValue::from(16i64));
        event.set("event.severity", EventValue::from(5i64));
        c.process(&mut event);
        assert_eq!(event.get_str("cluster_signature"), Some("16 , 5 , boot sequence 42"));
    }

    #[test]
    fn test_rules_reports_none_for_rules_without_tests() {
        let c = engine();
        assert!(c.test_rules().is_empty());
    }

    #[test]
    fn signature_engine_runs_matching_rules_in_order() {
        let digits = SignatureRule::new(Regex::new(r"\d+").unwrap(), "<NUM>");
        assert_eq!(
            signature::apply_signature_rule(&digits, "port 8080"),
            "port <NUM>"
        );
    }
}
