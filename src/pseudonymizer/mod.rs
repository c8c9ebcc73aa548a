//! Pseudonymizer processor: per-field regex → hash → wrap, integrating the
//! URL decomposer and pseudonym cache.

pub mod cache;
pub mod crypto;
pub mod rule;
pub mod url;

use crate::error::{ProcessingError, RuleFileError};
use crate::event::{Event, EventValue};
use crate::processor::{Processor, ProcessorStats};
use crate::regex_mapping::RegexMapping;
use crate::rule_tree::RuleTree;
use cache::{Clock, PseudonymCache};
use crypto::OriginKeys;
use regex::Regex;
use rule::PseudonymizerRule;
use std::path::PathBuf;
use tracing::warn;
use url::PublicSuffixList;

/// A record emitted for a newly-pseudonymized cleartext.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PseudonymRecord {
    pub pseudonym: String,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

pub struct Pseudonymizer<C: Clock> {
    name: String,
    topic: String,
    salt: Vec<u8>,
    keys: OriginKeys,
    specific_rule_dirs: Vec<PathBuf>,
    generic_rule_dirs: Vec<PathBuf>,
    regex_mapping: RegexMapping,
    specific_rules: RuleTree<PseudonymizerRule>,
    generic_rules: RuleTree<PseudonymizerRule>,
    psl: PublicSuffixList,
    cache: PseudonymCache<C>,
    events_processed: u64,
    stats: ProcessorStats,
}

impl<C: Clock> Pseudonymizer<C> {
    /// `regex_mapping` and `psl` are loaded once at startup by the
    /// configuration layer and handed in already parsed, the same way
    /// [`crate::clusterer::Clusterer`] takes its `RegexMapping`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        topic: impl Into<String>,
        salt: impl Into<Vec<u8>>,
        keys: OriginKeys,
        specific_rule_dirs: Vec<PathBuf>,
        generic_rule_dirs: Vec<PathBuf>,
        regex_mapping: RegexMapping,
        psl: PublicSuffixList,
        max_cached_pseudonyms: usize,
        max_caching_days: i64,
        clock: C,
    ) -> Self {
        Self {
            name: name.into(),
            topic: topic.into(),
            salt: salt.into(),
            keys,
            specific_rule_dirs,
            generic_rule_dirs,
            regex_mapping,
            specific_rules: RuleTree::new(),
            generic_rules: RuleTree::new(),
            psl,
            cache: PseudonymCache::new(
                max_cached_pseudonyms,
                chrono::Duration::days(max_caching_days),
                clock,
            ),
            events_processed: 0,
            stats: ProcessorStats::new(),
        }
    }

    fn load_rules(&mut self) -> Result<(), RuleFileError> {
        for dir in self.specific_rule_dirs.clone() {
            for rule in PseudonymizerRule::load_from_directory(&dir, &self.regex_mapping)? {
                self.specific_rules.insert(rule);
            }
        }
        for dir in self.generic_rule_dirs.clone() {
            for rule in PseudonymizerRule::load_from_directory(&dir, &self.regex_mapping)? {
                self.generic_rules.insert(rule);
            }
        }
        self.stats.record_rules(
            self.specific_rules.len() + self.generic_rules.len(),
            0,
            0,
        );
        Ok(())
    }

    /// Mutates matched string fields in place, returning newly-emitted
    /// pseudonym records and the configured topic.
    pub fn process(&mut self, event: &mut Event) -> (Vec<PseudonymRecord>, String) {
        self.events_processed += 1;
        let mut records = Vec::new();
        let timestamp = event.get_str("@timestamp").map(str::to_string);

        let mut processed_fields: std::collections::HashSet<String> =
            std::collections::HashSet::new();

        let specific: Vec<PseudonymizerRule> = self.specific_rules.matches(event).into_iter().cloned().collect();
        let generic: Vec<PseudonymizerRule> = self.generic_rules.matches(event).into_iter().cloned().collect();

        for rule in specific.iter().chain(generic.iter()) {
            for (path, regex) in rule.field_patterns() {
                if processed_fields.contains(path) {
                    continue;
                }
                let changed =
                    self.process_field(event, path, regex, rule.is_url_field(path), timestamp.as_deref(), &mut records);
                if changed {
                    processed_fields.insert(path.clone());
                }
            }
        }

        (records, self.topic.clone())
    }

    fn process_field(
        &mut self,
        event: &mut Event,
        path: &str,
        regex: &Regex,
        is_url_field: bool,
        timestamp: Option<&str>,
        records: &mut Vec<PseudonymRecord>,
    ) -> bool {
        let Some(current) = event.get(path).and_then(EventValue::as_str) else {
            return false;
        };
        if current.is_empty() {
            return false;
        }
        let current = current.to_string();

        let rewritten = if is_url_field {
            self.pseudonymize_url_field(&current, regex, timestamp, records)
        } else {
            self.pseudonymize_with_regex(&current, regex, timestamp, records)
        };

        if rewritten == current {
            return false;
        }
        event.set(path, EventValue::from(rewritten));
        true
    }

    /// Whole-field or capture-group pseudonymization, applied to plain
    /// (non-URL) fields and to the leftover text of URL fields once
    /// embedded URLs have been rewritten.
    fn pseudonymize_with_regex(
        &mut self,
        text: &str,
        regex: &Regex,
        timestamp: Option<&str>,
        records: &mut Vec<PseudonymRecord>,
    ) -> String {
        if !regex.is_match(text) {
            return text.to_string();
        }

        if regex.captures_len() == 1 {
            // No capture groups: pseudonymize the entire string as one unit.
            match self.pseudonymize_text(text, timestamp, records) {
                Ok(marker) => marker,
                Err(err) => {
                    warn!("{err}");
                    text.to_string()
                }
            }
        } else {
            self.pseudonymize_captures(regex, text, timestamp, records)
        }
    }

    /// Each capture group in a match is pseudonymized independently, on its
    /// own text, with its own marker — group 1 and group 2 of the same
    /// match get different markers unless their text happens to be equal.
    /// Literal text between groups (and before/after them, within the
    /// whole match) is preserved verbatim.
    fn pseudonymize_captures(
        &mut self,
        regex: &Regex,
        text: &str,
        timestamp: Option<&str>,
        records: &mut Vec<PseudonymRecord>,
    ) -> String {
        let mut result = String::with_capacity(text.len());
        let mut last_end = 0;

        for caps in regex.captures_iter(text) {
            let whole = caps.get(0).expect("group 0 always present");
            result.push_str(&text[last_end..whole.start()]);

            let mut has_group = false;
            let mut cursor = whole.start();
            for i in 1..caps.len() {
                if let Some(g) = caps.get(i) {
                    has_group = true;
                    result.push_str(&text[cursor..g.start()]);
                    match self.pseudonymize_text(g.as_str(), timestamp, records) {
                        Ok(marker) => result.push_str(&marker),
                        Err(err) => {
                            warn!("{err}");
                            result.push_str(g.as_str());
                        }
                    }
                    cursor = g.end();
                }
            }

            if has_group {
                result.push_str(&text[cursor..whole.end()]);
            } else {
                result.push_str(whole.as_str());
            }
            last_end = whole.end();
        }
        result.push_str(&text[last_end..]);
        result
    }

    fn pseudonymize_url_field(
        &mut self,
        value: &str,
        regex: &Regex,
        timestamp: Option<&str>,
        records: &mut Vec<PseudonymRecord>,
    ) -> String {
        if let Some(parts) = url::parse(value, &self.psl) {
            return self.rebuild_url(&parts, timestamp, records);
        }

        let (rewritten, any_url) = self.rewrite_embedded_urls(value, timestamp, records);
        if any_url {
            self.pseudonymize_with_regex(&rewritten, regex, timestamp, records)
        } else {
            self.pseudonymize_with_regex(value, regex, timestamp, records)
        }
    }

    fn rewrite_embedded_urls(
        &mut self,
        text: &str,
        timestamp: Option<&str>,
        records: &mut Vec<PseudonymRecord>,
    ) -> (String, bool) {
        let token_re = Regex::new(r"\S+").expect("static pattern");
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut any_url = false;

        let matches: Vec<(usize, usize, String)> = token_re
            .find_iter(text)
            .map(|m| (m.start(), m.end(), m.as_str().to_string()))
            .collect();

        for (start, end, token) in matches {
            out.push_str(&text[last..start]);
            if url::looks_like_url(&token, &self.psl) {
                let had_scheme = token.contains("://");
                let candidate = if had_scheme {
                    token.clone()
                } else {
                    format!("http://{token}")
                };
                if let Some(parts) = url::parse(&candidate, &self.psl) {
                    any_url = true;
                    let rebuilt = self.rebuild_url(&parts, timestamp, records);
                    let rebuilt = if had_scheme {
                        rebuilt
                    } else {
                        rebuilt.strip_prefix("http://").unwrap_or(&rebuilt).to_string()
                    };
                    out.push_str(&rebuilt);
                } else {
                    out.push_str(&token);
                }
            } else {
                out.push_str(&token);
            }
            last = end;
        }
        out.push_str(&text[last..]);
        (out, any_url)
    }

    fn rebuild_url(
        &mut self,
        parts: &url::UrlParts,
        timestamp: Option<&str>,
        records: &mut Vec<PseudonymRecord>,
    ) -> String {
        let mut out = String::new();
        if let Some(scheme) = &parts.scheme {
            out.push_str(scheme);
            out.push_str("://");
        }
        if let Some(userinfo) = &parts.userinfo {
            out.push_str(&self.pseudonymize_field_value(userinfo, timestamp, records));
            out.push('@');
        }
        if let Some(subdomain) = &parts.subdomain {
            out.push_str(&self.pseudonymize_field_value(subdomain, timestamp, records));
            out.push('.');
        }
        out.push_str(&parts.registrable_domain);
        if let Some(port) = parts.port {
            out.push(':');
            out.push_str(&port.to_string());
        }
        if parts.has_explicit_slash {
            out.push('/');
            if let Some(path) = &parts.path {
                out.push_str(&self.pseudonymize_field_value(path, timestamp, records));
            }
        }
        if !parts.query.is_empty() {
            out.push('?');
            for (i, (key, value)) in parts.query.iter().enumerate() {
                if i > 0 {
                    out.push('&');
                }
                out.push_str(key);
                out.push('=');
                out.push_str(&self.pseudonymize_field_value(value, timestamp, records));
            }
        }
        if let Some(fragment) = &parts.fragment {
            out.push('#');
            out.push_str(&self.pseudonymize_field_value(fragment, timestamp, records));
        }
        out
    }

    fn pseudonymize_field_value(
        &mut self,
        value: &str,
        timestamp: Option<&str>,
        records: &mut Vec<PseudonymRecord>,
    ) -> String {
        match self.pseudonymize_text(value, timestamp, records) {
            Ok(marker) => marker,
            Err(err) => {
                warn!("{err}");
                value.to_string()
            }
        }
    }

    /// Hash `x`, check the cache, emit a record on cache miss. Returns the
    /// `<pseudonym:HEX>` marker.
    fn pseudonymize_text(
        &mut self,
        x: &str,
        timestamp: Option<&str>,
        records: &mut Vec<PseudonymRecord>,
    ) -> Result<String, ProcessingError> {
        let pseudonym = crypto::hash(&self.salt, x);

        if !self.cache.contains_fresh(&pseudonym) {
            let origin = crypto::origin(&self.keys, x)?;
            records.push(PseudonymRecord {
                pseudonym: pseudonym.clone(),
                origin,
                timestamp: timestamp.map(str::to_string),
            });
            self.cache.record(pseudonym.clone());
        }

        Ok(format!("<pseudonym:{pseudonym}>"))
    }

    /// Read-only rule self-test runner. Pseudonymizer rules
    /// carry no `tests` field in the rule file format, so every rule
    /// contributes the `None` placeholder.
    pub fn test_rules(&self) -> Vec<(String, Option<()>)> {
        self.specific_rules
            .iter()
            .chain(self.generic_rules.iter())
            .map(|rule| (rule.description().to_string(), None))
            .collect()
    }
}

impl<C: Clock> Processor for Pseudonymizer<C> {
    type SetupError = RuleFileError;

    fn setup(&mut self) -> Result<(), Self::SetupError> {
        self.load_rules()
    }

    fn events_processed_count(&self) -> u64 {
        self.events_processed
    }

    fn describe(&self) -> String {
        format!("Pseudonymizer ({})", self.name)
    }

    fn shut_down(&mut self) {}
}
