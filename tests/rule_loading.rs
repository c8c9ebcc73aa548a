//! Directory-driven rule-loading tests: every fixture rule file under
//! `tests/fixtures` must load cleanly through the public `setup()` path.

use logsig_core::regex_mapping::RegexMapping;
use logsig_core::{Clusterer, Processor, Pseudonymizer};
use rsa::RsaPrivateKey;
use std::path::PathBuf;
use walkdir::WalkDir;

fn fixture_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn every_pseudonymizer_fixture_file_parses() {
    let dir = fixture_dir("pseudonymizer_rules");
    let json_files: Vec<_> = WalkDir::new(&dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .collect();
    assert!(!json_files.is_empty(), "fixture directory should contain rule files");

    let mut rng = rand::thread_rng();
    let analyst = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let depseudo = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let keys = logsig_core::pseudonymizer::crypto::OriginKeys {
        analyst: analyst.to_public_key(),
        depseudo: depseudo.to_public_key(),
    };

    let mut p = Pseudonymizer::new(
        "pseudonymizer",
        "pseudonyms",
        b"salt".to_vec(),
        keys,
        vec![dir],
        vec![],
        RegexMapping::empty(),
        logsig_core::pseudonymizer::url::PublicSuffixList::parse(""),
        1000,
        30,
        logsig_core::pseudonymizer::cache::SystemClock,
    );
    p.setup().expect("every fixture rule should load cleanly");
}

#[test]
fn every_clusterer_fixture_file_parses() {
    let dir = fixture_dir("clusterer_rules");
    let json_files: Vec<_> = WalkDir::new(&dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .collect();
    assert!(!json_files.is_empty(), "fixture directory should contain rule files");

    let mut c = Clusterer::new("clusterer", vec![dir], RegexMapping::empty(), "cluster_signature");
    c.setup().expect("every fixture rule should load cleanly");
}
