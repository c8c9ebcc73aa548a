//! Error taxonomy: startup errors are fatal, `ProcessingError` is a
//! log-and-continue signal the processors catch internally.

use thiserror::Error;

/// A filter expression failed to parse.
#[derive(Debug, Error)]
pub enum FilterParseError {
    #[error("unexpected token '{0}' in filter expression")]
    UnexpectedToken(String),
    #[error("missing closing parenthesis in filter expression")]
    MissingClosingParenthesis,
    #[error("term '{0}' is missing a value (expected 'field: value')")]
    MissingValue(String),
    #[error("invalid regex in filter term '{0}': {1}")]
    InvalidRegex(String, regex::Error),
    #[error("empty filter expression")]
    Empty,
}

/// Configuration could not be loaded. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is missing required key '{0}'")]
    MissingKey(String),
    #[error("failed to deserialize configuration: {0}")]
    Deserialize(String),
    #[error("failed to read key file '{0}': {1}")]
    KeyFile(String, std::io::Error),
    #[error("invalid public key in '{0}': {1}")]
    InvalidKey(String, String),
    #[error("failed to read public suffix list '{0}': {1}")]
    TldList(String, std::io::Error),
}

/// A rule's content was structurally invalid. Fatal at startup; identifies
/// the offending file and rule.
#[derive(Debug, Error)]
pub enum RuleDefinitionError {
    #[error("rule has keys {found:?} but must have exactly {expected:?}")]
    UnexpectedKeys {
        found: Vec<String>,
        expected: Vec<String>,
    },
    #[error("rule filter is invalid: {0}")]
    Filter(#[from] FilterParseError),
    #[error("regex keyword '{0}' does not resolve against the loaded regex mapping")]
    UnresolvedKeyword(String),
    #[error("field '{0}' has an invalid regex: {1}")]
    InvalidRegex(String, regex::Error),
    #[error("url_fields entry '{0}' is not a key of pseudonymize")]
    UrlFieldNotPseudonymized(String),
    #[error("clusterer rule is missing required key '{0}'")]
    MissingKey(String),
}

/// A rule file could not be read or parsed as JSON. Fatal at startup.
#[derive(Debug, Error)]
pub enum RuleFileError {
    #[error("failed to read rule file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rule file '{path}' as JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("rule {index} in '{path}' is invalid: {source}")]
    InvalidRule {
        path: String,
        index: usize,
        #[source]
        source: RuleDefinitionError,
    },
}

/// A runtime anomaly while processing a single event. Policy: log and
/// continue — the processor passes the affected field through unmodified
/// rather than dropping the event.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("failed to parse '{0}' as a URL, falling back to plain pseudonymization")]
    UrlParse(String),
    #[error("encryption of pseudonymized value failed: {0}")]
    Encryption(String),
    #[error("field '{0}' was not a string, skipping")]
    NotAString(String),
}
