//! The [`Event`] data model: a nested document addressed by dotted paths.

use crate::value::Value;
use indexmap::IndexMap;

/// A node in an event tree: a scalar leaf, a list, or a nested mapping.
///
/// The `Map` variant is mutable in place, since rule processors rewrite
/// leaves deep inside an event without rebuilding the whole tree.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    Scalar(Value),
    Sequence(Vec<EventValue>),
    Map(IndexMap<String, EventValue>),
}

impl EventValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            EventValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Value::as_str)
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, EventValue>> {
        match self {
            EventValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[EventValue]> {
        match self {
            EventValue::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, EventValue::Scalar(Value::Null))
    }

    /// Substring containment used by keyword-style filter terms and list
    /// membership checks: scans scalars, recurses into sequences/maps.
    pub fn contains_text(&self, needle: &str) -> bool {
        match self {
            EventValue::Scalar(v) => v.to_display_string().contains(needle),
            EventValue::Sequence(seq) => seq.iter().any(|v| v.contains_text(needle)),
            EventValue::Map(m) => m.values().any(|v| v.contains_text(needle)),
        }
    }
}

impl<T> From<T> for EventValue
where
    T: Into<Value>,
{
    fn from(value: T) -> Self {
        EventValue::Scalar(value.into())
    }
}

impl From<serde_json::Value> for EventValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => {
                EventValue::Sequence(items.into_iter().map(EventValue::from).collect())
            }
            serde_json::Value::Object(map) => EventValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, EventValue::from(v)))
                    .collect(),
            ),
            scalar => EventValue::Scalar(Value::from(scalar)),
        }
    }
}

/// A log event: a mapping from string keys to nested values, addressed by
/// dotted paths (`winlog.event_data.param1`).
///
/// In-place mutation is the whole point of a rule-based processor, so
/// `get_mut`/`set`/`remove` all walk the same dotted-path traversal as
/// `get`, never exposing the backing map directly across a rule boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    inner: IndexMap<String, EventValue>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(Self::from(value))
    }

    pub fn to_json(&self) -> serde_json::Value {
        fn to_json_value(v: &EventValue) -> serde_json::Value {
            match v {
                EventValue::Scalar(Value::String(s)) => serde_json::Value::String(s.clone()),
                EventValue::Scalar(Value::Int(i)) => serde_json::Value::from(*i),
                EventValue::Scalar(Value::Float(f)) => serde_json::json!(f),
                EventValue::Scalar(Value::Bool(b)) => serde_json::Value::Bool(*b),
                EventValue::Scalar(Value::Null) => serde_json::Value::Null,
                EventValue::Sequence(seq) => {
                    serde_json::Value::Array(seq.iter().map(to_json_value).collect())
                }
                EventValue::Map(map) => serde_json::Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), to_json_value(v)))
                        .collect(),
                ),
            }
        }
        serde_json::Value::Object(
            self.inner
                .iter()
                .map(|(k, v)| (k.clone(), to_json_value(v)))
                .collect(),
        )
    }

    /// Insert/replace a top-level key.
    pub fn insert<T: Into<EventValue>>(&mut self, key: impl Into<String>, value: T) {
        self.inner.insert(key.into(), value.into());
    }

    /// Insert/replace a value at a dotted path, creating intermediate maps
    /// as needed.
    pub fn set(&mut self, path: &str, value: EventValue) {
        let mut segments = path.split('.').peekable();
        let mut map = &mut self.inner;
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                map.insert(seg.to_string(), value);
                return;
            }
            let entry = map
                .entry(seg.to_string())
                .or_insert_with(|| EventValue::Map(IndexMap::new()));
            match entry {
                EventValue::Map(m) => map = m,
                _ => {
                    *entry = EventValue::Map(IndexMap::new());
                    match entry {
                        EventValue::Map(m) => map = m,
                        _ => unreachable!(),
                    }
                }
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&EventValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.inner.get(first)?;
        for seg in segments {
            current = current.as_map()?.get(seg)?;
        }
        Some(current)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut EventValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.inner.get_mut(first)?;
        for seg in segments {
            current = match current {
                EventValue::Map(m) => m.get_mut(seg)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(EventValue::as_str)
    }

    pub fn remove(&mut self, path: &str) -> Option<EventValue> {
        if let Some((head, tail)) = path.rsplit_once('.') {
            let parent = self.get_mut(head)?;
            match parent {
                EventValue::Map(m) => m.shift_remove(tail),
                _ => None,
            }
        } else {
            self.inner.shift_remove(path)
        }
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Flatten the event into `(dotted_path, &Value)` pairs for scalar
    /// leaves only; used by the rule-tree index to look up candidate rules
    /// without re-walking the tree per indexed key.
    pub fn flatten_scalars(&self) -> Vec<(String, &Value)> {
        let mut out = Vec::new();
        Self::flatten_into(&self.inner, String::new(), &mut out);
        out
    }

    fn flatten_into<'a>(
        map: &'a IndexMap<String, EventValue>,
        prefix: String,
        out: &mut Vec<(String, &'a Value)>,
    ) {
        for (k, v) in map {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            match v {
                EventValue::Scalar(val) => out.push((path, val)),
                EventValue::Map(m) => Self::flatten_into(m, path, out),
                EventValue::Sequence(_) => {}
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EventValue)> {
        self.inner.iter()
    }
}

impl<T, S, const N: usize> From<[(S, T); N]> for Event
where
    S: Into<String>,
    T: Into<EventValue>,
{
    fn from(values: [(S, T); N]) -> Self {
        let mut inner = IndexMap::with_capacity(N);
        for (k, v) in values {
            inner.insert(k.into(), v.into());
        }
        Self { inner }
    }
}

impl From<serde_json::Value> for Event {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Event {
                inner: map
                    .into_iter()
                    .map(|(k, v)| (k, EventValue::from(v)))
                    .collect(),
            },
            _ => Event::default(),
        }
    }
}
