//! URL Decomposer: splits a URL into parts that the Pseudonymizer
//! pseudonymizes independently, preserving scheme, registrable domain,
//! port, and structural separators verbatim.

use crate::error::ConfigError;
use std::path::Path;

/// The public suffix list, used to determine the registrable domain of a
/// host. Parsed directly from the standard flat-file PSL format: one
/// suffix per line, `//`-prefixed comments and blank lines ignored, `*.`
/// wildcard and `!` exception rules per the PSL grammar.
#[derive(Debug, Clone, Default)]
pub struct PublicSuffixList {
    exact: std::collections::HashSet<String>,
    wildcard: std::collections::HashSet<String>,
    exceptions: std::collections::HashSet<String>,
}

impl PublicSuffixList {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::TldList(path.display().to_string(), e))?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut list = Self::default();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            if let Some(rest) = line.strip_prefix('!') {
                list.exceptions.insert(rest.to_string());
            } else if let Some(rest) = line.strip_prefix("*.") {
                list.wildcard.insert(rest.to_string());
            } else {
                list.exact.insert(line.to_string());
            }
        }
        list
    }

    fn is_suffix(&self, labels: &[&str]) -> bool {
        let candidate = labels.join(".");
        if self.exceptions.contains(&candidate) {
            return false;
        }
        if self.exact.contains(&candidate) {
            return true;
        }
        if labels.len() > 1 {
            let rest = labels[1..].join(".");
            if self.wildcard.contains(&rest) {
                return true;
            }
        }
        false
    }

    /// Longest public suffix matching a trailing run of `host`'s labels,
    /// then the registrable domain (one label below it), per the PSL
    /// algorithm. Falls back to the last two labels when the list has no
    /// match (e.g. an empty PSL in tests).
    ///
    /// An exception rule (`!co.uk`) matching a candidate exactly means that
    /// candidate itself IS the registrable domain, not the suffix — it
    /// carves the entry back out of the wildcard rule that would otherwise
    /// cover it, so it's handled before the general `is_suffix` scan.
    pub fn registrable_domain<'a>(&self, host: &'a str) -> &'a str {
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return host;
        }
        for i in 0..labels.len() {
            let suffix_labels = &labels[i..];
            let candidate = suffix_labels.join(".");
            if self.exceptions.contains(&candidate) {
                return join_from(host, &labels, i);
            }
            if self.is_suffix(suffix_labels) && i > 0 {
                return join_from(host, &labels, i - 1);
            }
        }
        // No PSL match: treat the last two labels as the registrable domain.
        join_from(host, &labels, labels.len().saturating_sub(2))
    }

    pub fn has_known_suffix(&self, host: &str) -> bool {
        let labels: Vec<&str> = host.split('.').collect();
        (0..labels.len()).any(|i| self.is_suffix(&labels[i..]))
    }
}

fn join_from<'a>(host: &'a str, labels: &[&str], start: usize) -> &'a str {
    let byte_offset: usize = labels[..start].iter().map(|l| l.len() + 1).sum();
    &host[byte_offset..]
}

/// A query parameter as `(key, value)`, order-preserved.
pub type QueryPair = (String, String);

/// The decomposed parts of a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlParts {
    pub scheme: Option<String>,
    pub userinfo: Option<String>,
    pub subdomain: Option<String>,
    pub registrable_domain: String,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub query: Vec<QueryPair>,
    pub fragment: Option<String>,
    /// Whether the original text had an explicit `/` after the authority.
    /// The `url` crate always normalizes to a `/`-rooted path, so this is
    /// tracked separately: `https://www.test.de` (scenario 4) must rebuild
    /// WITHOUT a trailing slash, while `https://test.de:123/#test`
    /// (scenario 5) must keep the one it had.
    pub has_explicit_slash: bool,
}

/// Parse `text` as a URL using the `url` crate, then split its host into
/// subdomain / registrable domain via the public suffix list. Returns
/// `None` on parse failure — callers fall back to plain pseudonymization.
pub fn parse(text: &str, psl: &PublicSuffixList) -> Option<UrlParts> {
    let parsed = url::Url::parse(text).ok()?;
    let host = parsed.host_str()?.to_string();

    let registrable = psl.registrable_domain(&host).to_string();
    let subdomain = host
        .strip_suffix(&registrable)
        .map(|s| s.trim_end_matches('.'))
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let userinfo = if parsed.username().is_empty() && parsed.password().is_none() {
        None
    } else {
        Some(match parsed.password() {
            Some(pw) => format!("{}:{}", parsed.username(), pw),
            None => parsed.username().to_string(),
        })
    };

    let path = parsed
        .path()
        .strip_prefix('/')
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    let query: Vec<QueryPair> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let has_explicit_slash = {
        let prefix = format!("{}://", parsed.scheme());
        text.find(&prefix)
            .map(|i| i + prefix.len())
            .and_then(|start| text[start..].find(['/', '?', '#']))
            .map(|offset_from_start| {
                let start = text.find(&prefix).unwrap() + prefix.len();
                text.as_bytes()[start + offset_from_start] == b'/'
            })
            .unwrap_or(false)
    };

    Some(UrlParts {
        scheme: Some(parsed.scheme().to_string()),
        userinfo,
        subdomain,
        registrable_domain: registrable,
        has_explicit_slash,
        port: parsed.port(),
        path,
        query,
        fragment: parsed.fragment().map(str::to_string),
    })
}

/// Detects whether `token` is likely to be a bare (schemeless) URL: either
/// it already contains `://`, or it starts with `www.`, or its host labels
/// end in a known public suffix.
pub fn looks_like_url(token: &str, psl: &PublicSuffixList) -> bool {
    if token.contains("://") {
        return true;
    }
    let host_candidate = token.split(['/', '?', '#']).next().unwrap_or(token);
    if host_candidate.starts_with("www.") {
        return true;
    }
    psl.has_known_suffix(host_candidate)
}
