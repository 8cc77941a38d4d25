//! `ruletrail replay` - push recorded envelopes through the middleware

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use ruletrail_core::config::TelemetryConfig;
use ruletrail_core::entities::{EntityEnvelope, EntityKind, EnvelopeError};
use ruletrail_core::events::{Handler, Message, TelemetryMiddleware};
use ruletrail_core::telemetry::lookup;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Handler that reports what telemetry it was handed, failing on demand.
struct ReplayHandler {
    fail_kind: Option<EntityKind>,
}

#[async_trait]
impl Handler for ReplayHandler {
    async fn handle(&self, msg: Message) -> Result<Vec<Message>> {
        let envelope = EntityEnvelope::parse(&msg.payload)?;
        let record = lookup(&msg.context);

        if let Some(snapshot) = record.snapshot() {
            debug!(
                msg_id = %msg.uuid,
                kind = %envelope.entity_kind,
                project = ?snapshot.project,
                "handling replayed event"
            );
        }

        if self.fail_kind == Some(envelope.entity_kind) {
            bail!("replay handler configured to fail for {}", envelope.entity_kind);
        }
        Ok(Vec::new())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub processed: usize,
    pub failed: usize,
    pub rejected: usize,
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed: {}, failed: {}, rejected: {}",
            self.processed, self.failed, self.rejected
        )
    }
}

pub async fn run(
    file: &Path,
    config_path: &Path,
    fail_kind: Option<EntityKind>,
) -> Result<ReplaySummary> {
    let config = TelemetryConfig::load_or_default(config_path).await?;
    let sink = config.build_sink()?;
    let middleware = TelemetryMiddleware::new(ReplayHandler { fail_kind }, sink);

    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read events file {:?}", file))?;

    let mut summary = ReplaySummary::default();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let msg = Message::new(line.as_bytes().to_vec()).with_metadata("line", (idx + 1).to_string());

        match middleware.handle(msg).await {
            Ok(_) => summary.processed += 1,
            Err(e) if e.downcast_ref::<EnvelopeError>().is_some() => {
                warn!(line = idx + 1, error = %e, "rejected event");
                summary.rejected += 1;
            }
            Err(e) => {
                info!(line = idx + 1, error = %e, "handler failed");
                summary.processed += 1;
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruletrail_core::telemetry::writer::{read_records, TELEMETRY_FILE};
    use std::fs;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn line(kind: EntityKind, n: u128) -> String {
        let envelope =
            EntityEnvelope::new(Uuid::from_u128(1), Uuid::from_u128(2), kind, Uuid::from_u128(n));
        String::from_utf8(envelope.to_payload().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_replay_summary_and_records() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let config = tmp.path().join("telemetry.yml");
        fs::write(&config, format!("format: json\ndestination: {}\n", out.display())).unwrap();

        let events = tmp.path().join("events.jsonl");
        fs::write(
            &events,
            [
                line(EntityKind::Repository, 10),
                String::new(),
                line(EntityKind::Artifact, 11),
                "garbage".to_string(),
            ]
            .join("\n"),
        )
        .unwrap();

        let summary = run(&events, &config, Some(EntityKind::Artifact)).await.unwrap();
        assert_eq!(
            summary,
            ReplaySummary {
                processed: 2,
                failed: 1,
                rejected: 1
            }
        );

        let records = read_records(&out.join(TELEMETRY_FILE)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["level"], "info");
        assert_eq!(records[1]["level"], "error");
        assert_eq!(records[1]["artifact"], Uuid::from_u128(11).to_string());
    }
}
