//! Telemetry middleware for event handlers.
//!
//! Wraps a [`Handler`] so each message is bracketed by one telemetry record:
//!
//! ```text
//! RECEIVED ─parse─> PARSED ─project+bind─> BOUND ─inner─> HANDLED ─emit─> EMITTED ─> RETURNED
//!     └── parse error: returned as-is, nothing emitted
//! ```
//!
//! The inner handler's result is returned untouched; it only picks the sink
//! level (`info` on success, `error` on failure).

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::entities::{self, EntityEnvelope};
use crate::telemetry::guard::EmissionGuard;
use crate::telemetry::{Level, RecordHandle, Sink};

use super::{Handler, Message};

/// Handler wrapper that binds a fresh telemetry record to every message.
pub struct TelemetryMiddleware<H> {
    inner: H,
    sink: Arc<dyn Sink>,
}

impl<H: Handler> TelemetryMiddleware<H> {
    pub fn new(inner: H, sink: Arc<dyn Sink>) -> Self {
        Self { inner, sink }
    }
}

#[async_trait]
impl<H: Handler> Handler for TelemetryMiddleware<H> {
    async fn handle(&self, mut msg: Message) -> Result<Vec<Message>> {
        let envelope = EntityEnvelope::parse(&msg.payload)?;

        let (record, projection_err) = entities::project(&envelope);
        if let Some(e) = projection_err {
            info!(error = %e, msg_id = %msg.uuid, "error creating telemetry store from entity");
        }

        let record = RecordHandle::from(record);
        msg.context = record.bind(&msg.context);

        let mut guard = EmissionGuard::new(record, &*self.sink);
        let result = self.inner.handle(msg).await;
        guard.commit(Level::for_outcome(&result));

        result
    }
}
