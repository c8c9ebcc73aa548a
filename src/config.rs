//! Processor configuration.
//!
//! Deserialized with `serde` straight into a typed struct, no intermediate
//! `Value` walk. Every required key is a non-`Option` field, so a missing
//! key surfaces as a `serde_yml`/`serde_json` error at load time.

use crate::clusterer::Clusterer;
use crate::error::ConfigError;
use crate::pseudonymizer::cache::SystemClock;
use crate::pseudonymizer::crypto::OriginKeys;
use crate::pseudonymizer::url::PublicSuffixList;
use crate::pseudonymizer::Pseudonymizer;
use crate::regex_mapping::RegexMapping;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use serde::Deserialize;
use std::path::PathBuf;

/// Pseudonymizer configuration: `{type, pseudonyms_topic, pubkey_analyst,
/// pubkey_depseudo, hash_salt, specific_rules, generic_rules, regex_mapping,
/// max_cached_pseudonyms, max_caching_days, tld_list}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PseudonymizerConfig {
    #[serde(rename = "type")]
    pub processor_type: String,
    pub pseudonyms_topic: String,
    pub pubkey_analyst: PathBuf,
    pub pubkey_depseudo: PathBuf,
    pub hash_salt: String,
    pub specific_rules: Vec<PathBuf>,
    pub generic_rules: Vec<PathBuf>,
    pub regex_mapping: PathBuf,
    pub max_cached_pseudonyms: usize,
    pub max_caching_days: i64,
    pub tld_list: PathBuf,
}

impl PseudonymizerConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        serde_yml::from_str(contents).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Build a runnable [`Pseudonymizer`], reading and parsing every external
    /// resource this config references (public keys, regex mapping, public
    /// suffix list). Rule files themselves are loaded later by `setup()`.
    pub fn build(&self) -> Result<Pseudonymizer<SystemClock>, ConfigError> {
        let analyst = load_public_key(&self.pubkey_analyst)?;
        let depseudo = load_public_key(&self.pubkey_depseudo)?;
        let keys = OriginKeys { analyst, depseudo };

        let regex_mapping = RegexMapping::load(&self.regex_mapping)?;
        let psl = PublicSuffixList::load(&self.tld_list)?;

        Ok(Pseudonymizer::new(
            self.processor_type.clone(),
            self.pseudonyms_topic.clone(),
            self.hash_salt.as_bytes().to_vec(),
            keys,
            self.specific_rules.clone(),
            self.generic_rules.clone(),
            regex_mapping,
            psl,
            self.max_cached_pseudonyms,
            self.max_caching_days,
            SystemClock,
        ))
    }
}

/// Clusterer configuration: `{type, rules, regex_mapping,
/// output_field_name}`. The output field name defaults to
/// `cluster_signature` when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ClustererConfig {
    #[serde(rename = "type")]
    pub processor_type: String,
    pub rules: Vec<PathBuf>,
    pub regex_mapping: PathBuf,
    #[serde(default = "default_output_field_name")]
    pub output_field_name: String,
}

fn default_output_field_name() -> String {
    "cluster_signature".to_string()
}

impl ClustererConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        serde_yml::from_str(contents).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    pub fn build(&self) -> Result<Clusterer, ConfigError> {
        let regex_mapping = RegexMapping::load(&self.regex_mapping)?;
        Ok(Clusterer::new(
            self.processor_type.clone(),
            self.rules.clone(),
            regex_mapping,
            self.output_field_name.clone(),
        ))
    }
}

fn load_public_key(path: &std::path::Path) -> Result<RsaPublicKey, ConfigError> {
    let pem = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::KeyFile(path.display().to_string(), e))?;
    RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| ConfigError::InvalidKey(path.display().to_string(), e.to_string()))
}
