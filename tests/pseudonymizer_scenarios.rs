//! End-to-end scenarios exercised through the Pseudonymizer's real
//! rule-directory loading path, not hand-built fixtures.

use logsig_core::event::{Event, EventValue};
use logsig_core::pseudonymizer::cache::FixedClock;
use logsig_core::pseudonymizer::crypto::OriginKeys;
use logsig_core::pseudonymizer::url::PublicSuffixList;
use logsig_core::regex_mapping::RegexMapping;
use logsig_core::{Processor, Pseudonymizer};
use rsa::RsaPrivateKey;
use std::path::PathBuf;

fn test_keys() -> OriginKeys {
    let mut rng = rand::thread_rng();
    let analyst = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let depseudo = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    OriginKeys {
        analyst: analyst.to_public_key(),
        depseudo: depseudo.to_public_key(),
    }
}

fn rule_dir(name: &str, rules_json: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "logsig-core-test-{name}-{}-{}",
        std::process::id(),
        name.len()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("rules.json"), rules_json).unwrap();
    dir
}

#[test]
fn two_field_rule_produces_both_fixed_hashes() {
    let dir = rule_dir(
        "two-field",
        r#"[{
            "filter": "winlog.event_id: 1234 AND winlog.provider_name: Test456",
            "pseudonymize": {
                "winlog.event_data.param1": "^.*$",
                "winlog.event_data.param2": "^.*$"
            },
            "url_fields": [],
            "description": "two-field pseudonymize"
        }]"#,
    );

    let mut p = Pseudonymizer::new(
        "pseudonymizer",
        "pseudonyms",
        b"a_secret_tasty_ingredient".to_vec(),
        test_keys(),
        vec![dir],
        vec![],
        RegexMapping::empty(),
        PublicSuffixList::parse(""),
        1_000_000,
        30,
        FixedClock::new("2024-01-01T00:00:00Z".parse().unwrap()),
    );
    p.setup().unwrap();

    let mut event = Event::new();
    event.set("winlog.event_id", EventValue::from(1234i64));
    event.set("winlog.provider_name", EventValue::from("Test456"));
    event.set("winlog.event_data.param1", EventValue::from("Pseudonymize me."));
    event.set("winlog.event_data.param2", EventValue::from("Pseudonymize me!"));

    let (records, topic) = p.process(&mut event);

    assert_eq!(topic, "pseudonyms");
    assert_eq!(
        event.get_str("winlog.event_data.param1"),
        Some("<pseudonym:8f86699f51fc217651b1512f0bc0a2fa7717ffc700fe3e5426229a6ab063b47a>")
    );
    assert_eq!(
        event.get_str("winlog.event_data.param2"),
        Some("<pseudonym:c40348196f85b761e0633fa568a79c751201a50d63f3a92195985e92cdee2077>")
    );
    assert_eq!(records.len(), 2);
}

#[test]
fn filter_miss_leaves_fields_untouched() {
    let dir = rule_dir(
        "filter-miss",
        r#"[{
            "filter": "event_id: 1234",
            "pseudonymize": {"something": "^.*$"},
            "url_fields": [],
            "description": "whole field"
        }]"#,
    );

    let mut p = Pseudonymizer::new(
        "pseudonymizer",
        "pseudonyms",
        b"a_secret_tasty_ingredient".to_vec(),
        test_keys(),
        vec![dir],
        vec![],
        RegexMapping::empty(),
        PublicSuffixList::parse(""),
        1_000_000,
        30,
        FixedClock::new("2024-01-01T00:00:00Z".parse().unwrap()),
    );
    p.setup().unwrap();

    let mut event = Event::new();
    event.set("event_id", EventValue::from(1105i64));
    event.set("something", EventValue::from("Not pseudonymized"));
    let (records, _) = p.process(&mut event);

    assert!(records.is_empty());
    assert_eq!(event.get_str("something"), Some("Not pseudonymized"));
}
