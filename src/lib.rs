#![forbid(unsafe_code)]
//! `logsig-core` is a rule-driven log-event processing library: field
//! pseudonymization and message-signature clustering over a shared
//! filter-expression/rule-tree substrate.

pub mod clusterer;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod processor;
pub mod pseudonymizer;
pub mod regex_mapping;
pub mod rule_tree;
pub mod signature;
pub mod value;

pub use clusterer::Clusterer;
pub use config::{ClustererConfig, PseudonymizerConfig};
pub use event::Event;
pub use processor::Processor;
pub use pseudonymizer::{Pseudonymizer, PseudonymRecord};

/// Parse an event from a JSON string.
pub fn event_from_json(json: &str) -> Result<Event, serde_json::Error> {
    Event::from_json_str(json)
}
