//! Shared processor substrate: the interface the pipeline driver consumes
//! and per-processor rule-load statistics, kept separate from metrics
//! sinks.

/// Counts gathered at rule-load time, surfaced through `describe()`'s debug
/// form rather than any metrics sink.
#[derive(Debug, Clone, Default)]
pub struct ProcessorStats {
    pub rule_count: usize,
    pub indexed_rule_count: usize,
    pub fallback_rule_count: usize,
}

impl ProcessorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rules(&mut self, rule_count: usize, indexed: usize, fallback: usize) {
        self.rule_count = rule_count;
        self.indexed_rule_count = indexed;
        self.fallback_rule_count = fallback;
    }
}

/// The interface a rule-based processor exposes to the pipeline driver.
/// `setup`/`shut_down` bracket the processor's lifetime; `process` is a
/// synchronous hot path with no suspension points.
pub trait Processor {
    type SetupError;

    fn setup(&mut self) -> Result<(), Self::SetupError>;
    fn events_processed_count(&self) -> u64;
    fn describe(&self) -> String;
    fn shut_down(&mut self);
}

/// List every `*.json` file under `dir`, sorted lexicographically by full
/// path — the loading order both processors require.
pub fn list_json_files_sorted(dir: &std::path::Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}
