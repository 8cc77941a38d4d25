//! Per-request / per-event value carrier and the telemetry binding.
//!
//! [`Context`] is an immutable, cheaply cloned bag of values keyed by type.
//! Deriving a context copies the (small) map of `Arc`s and leaves the parent
//! untouched, so a binding is only visible to contexts derived from the one
//! it was made on.
//!
//! Telemetry stores its handle under a private key type, which no other
//! module can name and therefore cannot overwrite or read.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::record::RecordHandle;

/// Ambient values travelling with one request or event.
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Context {
    /// An empty root context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that additionally carries `value`. A value of the
    /// same type already present is shadowed in the derived context only.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut values = HashMap::clone(&self.values);
        values.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            values: Arc::new(values),
        }
    }

    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.values.len())
            .finish()
    }
}

struct TelemetryKey(RecordHandle);

/// Derive a context in which [`lookup`] yields `record`. No copy of the
/// record is made.
pub fn with_record(ctx: &Context, record: RecordHandle) -> Context {
    ctx.with_value(TelemetryKey(record))
}

/// The record bound to `ctx`, or a detached handle when there is none.
pub fn lookup(ctx: &Context) -> RecordHandle {
    ctx.value::<TelemetryKey>()
        .map(|key| key.0.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_lookup_without_binding_is_detached() {
        let ctx = Context::background();
        assert!(lookup(&ctx).is_detached());
    }

    #[test]
    fn test_lookup_returns_the_bound_record() {
        let record = RecordHandle::new();
        let ctx = with_record(&Context::background(), record.clone());

        assert!(lookup(&ctx).ptr_eq(&record));
    }

    #[test]
    fn test_binding_does_not_leak_into_parent() {
        let parent = Context::background().with_value(42u32);
        let child = with_record(&parent, RecordHandle::new());

        assert!(lookup(&parent).is_detached());
        assert!(!lookup(&child).is_detached());
        assert_eq!(child.value::<u32>(), Some(&42));
    }

    #[test]
    fn test_foreign_values_do_not_collide() {
        // Another subsystem storing its own handle type does not shadow ours
        let record = RecordHandle::new();
        let ctx = with_record(&Context::background(), record.clone()).with_value(RecordHandle::new());

        assert!(lookup(&ctx).ptr_eq(&record));
    }

    #[test]
    fn test_mutations_through_lookup_are_shared() {
        let record = RecordHandle::new();
        let ctx = record.bind(&Context::background());
        let project = Uuid::from_u128(1);

        lookup(&ctx).set_project(project);
        assert_eq!(record.snapshot().unwrap().project, Some(project));
    }

    #[test]
    fn test_detached_bind_returns_context_unchanged() {
        let ctx = Context::background().with_value("marker");
        let bound = RecordHandle::detached().bind(&ctx);

        assert_eq!(bound.len(), 1);
        assert!(lookup(&bound).is_detached());
    }
}
