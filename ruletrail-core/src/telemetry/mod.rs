//! Business telemetry: one structured record per unit of work.
//!
//! A unit of work (an RPC call, or one dispatched event) gets a fresh
//! [`TelemetryRecord`] bound into its [`Context`]. Any code holding the
//! context can fetch it with [`lookup`] and add to it; when the unit of work
//! ends, the record is turned into a single [`SinkEvent`] and committed.
//!
//! ```text
//! Context ──bind──> RecordHandle::Bound ──(shared)──> nested call sites
//!                         │                            lookup(ctx).set_*(..)
//!                         │                            lookup(ctx).append_rule_evaluation(..)
//!                         └── emit(level) ──> SinkEvent ──commit──> Sink
//! ```
//!
//! Code running outside any telemetry scope gets [`RecordHandle::Detached`]
//! from [`lookup`]; every mutator on it is a no-op.
//!
//! Concurrency: handles alias one record behind a mutex, so fan-out within a
//! unit of work is safe. Appends from one task stay in call order.

pub mod context;
pub(crate) mod guard;
pub mod record;
pub mod rpc;
pub mod sink;
pub mod writer;

pub use context::{lookup, with_record, Context};
pub use record::{
    ActionEvaluation, IdName, ProjectTombstone, RecordHandle, RuleEvaluation, TelemetryRecord,
};
pub use sink::{FieldValue, Level, MemorySink, NullSink, Sink, SinkEvent, TracingSink};
pub use writer::JsonLinesSink;
