//! Sink adapter over the structured logging backend.
//!
//! A [`SinkEvent`] is a level plus an ordered list of typed fields. Building
//! one has no side effects; nothing is logged until [`Sink::commit`] is
//! called, so whoever builds the event also decides when it is written.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Severity of a committed telemetry event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

impl Level {
    /// `Info` for a successful unit of work, `Error` otherwise.
    pub fn for_outcome<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Level::Info
        } else {
            Level::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Id(Uuid),
    /// Arbitrary structured value, rendered as JSON
    Json(Value),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Id(id) => Value::String(id.to_string()),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

/// One uncommitted sink record.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkEvent {
    level: Level,
    fields: Vec<(String, FieldValue)>,
}

impl SinkEvent {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            fields: Vec::new(),
        }
    }

    pub fn str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), FieldValue::Str(value.into())));
        self
    }

    pub fn int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.fields.push((key.into(), FieldValue::Int(value)));
        self
    }

    pub fn bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.fields.push((key.into(), FieldValue::Bool(value)));
        self
    }

    pub fn id(mut self, key: impl Into<String>, value: Uuid) -> Self {
        self.fields.push((key.into(), FieldValue::Id(value)));
        self
    }

    /// Attach a structured value. Values that fail to serialize are recorded
    /// as JSON `null` rather than dropping the whole event.
    pub fn json<T: Serialize>(mut self, key: impl Into<String>, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.push((key.into(), FieldValue::Json(value)));
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Value of the last field written under `key`
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Render the fields as a JSON object. Later writes to a key win.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.to_json());
        }
        Value::Object(map)
    }
}

/// Destination for committed telemetry events.
///
/// Implementations must accept concurrent commits from independent units of
/// work. Commit failures are the sink's business; callers never retry.
pub trait Sink: Send + Sync {
    fn commit(&self, event: SinkEvent);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn commit(&self, event: SinkEvent) {
        (**self).commit(event)
    }
}

/// Default sink: one `tracing` event per commit on the `telemetry` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn commit(&self, event: SinkEvent) {
        let record = event.to_json();
        match event.level() {
            Level::Info => tracing::info!(target: "telemetry", telemetry = true, %record),
            Level::Error => tracing::error!(target: "telemetry", telemetry = true, %record),
        }
    }
}

/// Sink that drops everything, selected when telemetry is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn commit(&self, _event: SinkEvent) {}
}

/// In-memory sink that keeps every committed event.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of committed events in commit order
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn take(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl Sink for MemorySink {
    fn commit(&self, event: SinkEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder_keeps_types() {
        let id = Uuid::from_u128(7);
        let event = SinkEvent::new(Level::Info)
            .str("provider", "github")
            .int("count", 3)
            .bool("telemetry", true)
            .id("project", id)
            .json("profile", &json!({"name": "p"}));

        assert_eq!(event.level(), Level::Info);
        assert_eq!(event.fields().len(), 5);
        assert_eq!(event.get("project"), Some(&FieldValue::Id(id)));
        assert_eq!(
            event.to_json(),
            json!({
                "provider": "github",
                "count": 3,
                "telemetry": true,
                "project": id.to_string(),
                "profile": {"name": "p"},
            })
        );
    }

    #[test]
    fn test_last_write_wins_on_duplicate_keys() {
        let event = SinkEvent::new(Level::Error).str("k", "a").str("k", "b");
        assert_eq!(event.get("k"), Some(&FieldValue::Str("b".into())));
        assert_eq!(event.to_json(), json!({"k": "b"}));
    }

    #[test]
    fn test_level_for_outcome() {
        let ok: Result<(), ()> = Ok(());
        let err: Result<(), ()> = Err(());
        assert_eq!(Level::for_outcome(&ok), Level::Info);
        assert_eq!(Level::for_outcome(&err), Level::Error);
    }

    #[test]
    fn test_memory_sink_records_in_commit_order() {
        let sink = MemorySink::new();
        sink.commit(SinkEvent::new(Level::Info).int("n", 1));
        sink.commit(SinkEvent::new(Level::Error).int("n", 2));

        let events = sink.take();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].get("n"), Some(&FieldValue::Int(1)));
        assert_eq!(events[1].level(), Level::Error);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_null_sink_discards() {
        NullSink.commit(SinkEvent::new(Level::Info));
    }
}
