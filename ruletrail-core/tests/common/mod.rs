//! Test helpers shared by the telemetry integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use ruletrail_core::entities::{EntityEnvelope, EntityKind};
use ruletrail_core::events::Message;
use std::io;
use std::sync::{Arc, Once};
use tracing::subscriber::DefaultGuard;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Log output captured by [`capture_logs`]
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Captured lines containing `needle`
    pub fn lines_with(&self, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route INFO and above on the current thread into a buffer until the guard drops.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

/// `00000000-0000-0000-0000-0000000000NN`
pub fn uuid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn entity_message(provider: Uuid, project: Uuid, kind: EntityKind, entity: Uuid) -> Message {
    let payload = EntityEnvelope::new(provider, project, kind, entity)
        .to_payload()
        .expect("envelope serializes");
    Message::new(payload)
}
