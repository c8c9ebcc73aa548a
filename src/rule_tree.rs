//! Rule Tree: indexes rules by their first `FieldEquals` conjunct so a
//! lookup only re-evaluates filters that could plausibly match, instead of
//! scanning every loaded rule per event.
//!
//! Indexing only narrows the candidate set; every candidate's full filter
//! is still re-evaluated before it's accepted; correctness never depends on
//! the index being complete.

use crate::event::Event;
use crate::filter::FilterExpression;
use crate::value::Value;
use indexmap::IndexMap;

/// Anything a [`RuleTree`] can index and match must expose its filter.
pub trait FilterableRule {
    fn filter(&self) -> &FilterExpression;
}

/// An insertion-ordered index over rules of type `R`.
///
/// Rules whose filter is a pure conjunction of `Equals`/`Matches` terms are
/// indexed under their first `Equals` conjunct (dotted path + value).
/// Everything else — any filter containing `Or`/`Not` — lands in a fallback
/// set scanned for every event. Rules themselves live in a single
/// insertion-ordered `Vec`; the index only narrows which positions get
/// full-filter-evaluated for a given event, so match order always reflects
/// original insertion order regardless of which bucket a rule landed in.
pub struct RuleTree<R> {
    rules: Vec<R>,
    indexed: IndexMap<(String, ValueKey), Vec<usize>>,
    fallback: Vec<usize>,
}

/// `Value` doesn't implement `Eq`/`Hash` for floats; the index key only
/// ever needs the discrete kinds filter terms actually produce.
#[derive(PartialEq, Eq, Hash, Clone)]
enum ValueKey {
    String(String),
    Int(i64),
    Bool(bool),
    Null,
    Unkeyable,
}

impl From<&Value> for ValueKey {
    fn from(v: &Value) -> Self {
        match v {
            Value::String(s) => ValueKey::String(s.clone()),
            Value::Int(i) => ValueKey::Int(*i),
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::Null => ValueKey::Null,
            Value::Float(_) => ValueKey::Unkeyable,
        }
    }
}

impl<R: FilterableRule> Default for RuleTree<R> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            indexed: IndexMap::new(),
            fallback: Vec::new(),
        }
    }
}

impl<R: FilterableRule> RuleTree<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule, picking the index bucket or the fallback scan set.
    /// Insertion order is the order rules appear in `matches`.
    pub fn insert(&mut self, rule: R) {
        let position = self.rules.len();
        let indexed_key = if rule.filter().is_pure_conjunction() {
            rule.filter()
                .first_equals_conjunct()
                .map(|(path, value)| (path.to_string(), ValueKey::from(value)))
        } else {
            None
        };
        self.rules.push(rule);
        match indexed_key {
            Some(key) => self.indexed.entry(key).or_default().push(position),
            None => self.fallback.push(position),
        }
    }

    /// Rules whose filter matches `event`, in original insertion order. The
    /// index only narrows which positions are re-evaluated; it never
    /// reorders or shortcuts the full filter evaluation.
    pub fn matches<'a>(&'a self, event: &Event) -> Vec<&'a R> {
        let mut candidates: std::collections::BTreeSet<usize> =
            self.fallback.iter().copied().collect();
        for (path, value) in event.flatten_scalars() {
            let key = (path, ValueKey::from(value));
            if let Some(positions) = self.indexed.get(&key) {
                candidates.extend(positions.iter().copied());
            }
        }
        candidates
            .into_iter()
            .filter_map(|i| self.rules.get(i))
            .filter(|rule| rule.filter().evaluate(event))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rules.iter()
    }
}
