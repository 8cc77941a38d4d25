//! Entity event envelopes and their projection onto a telemetry record.
//!
//! Every event the engine dispatches concerns exactly one entity. The payload
//! is a JSON envelope:
//!
//! ```json
//! {
//!   "provider_id": "…uuid…",
//!   "project_id": "…uuid…",
//!   "entity_kind": "repository",
//!   "provider": "github",
//!   "entity": { "id": "…uuid…", "...": "kind-specific fields" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::telemetry::TelemetryRecord;

/// Kind of entity an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Repository,
    Artifact,
    PullRequest,
    BuildEnvironment,
    Release,
    PipelineRun,
    TaskRun,
    Build,
    Organization,
    /// Anything we do not recognise
    #[serde(other)]
    Unspecified,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Repository,
        EntityKind::Artifact,
        EntityKind::PullRequest,
        EntityKind::BuildEnvironment,
        EntityKind::Release,
        EntityKind::PipelineRun,
        EntityKind::TaskRun,
        EntityKind::Build,
        EntityKind::Organization,
        EntityKind::Unspecified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Repository => "repository",
            EntityKind::Artifact => "artifact",
            EntityKind::PullRequest => "pull_request",
            EntityKind::BuildEnvironment => "build_environment",
            EntityKind::Release => "release",
            EntityKind::PipelineRun => "pipeline_run",
            EntityKind::TaskRun => "task_run",
            EntityKind::Build => "build",
            EntityKind::Organization => "organization",
            EntityKind::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown entity kind: '{s}'"))
    }
}

/// Failures decoding an envelope or resolving its entity.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("failed to parse entity envelope: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to encode entity envelope: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("unknown entity kind")]
    UnknownKind,

    #[error("entity of kind {kind} carries no id")]
    MissingId { kind: EntityKind },

    #[error("entity of kind {kind} has malformed id '{value}'")]
    InvalidId {
        kind: EntityKind,
        value: String,
        #[source]
        source: uuid::Error,
    },
}

/// Decoded event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEnvelope {
    pub provider_id: Uuid,
    pub project_id: Uuid,
    pub entity_kind: EntityKind,
    /// Provider name, when the producer knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Kind-specific entity body
    #[serde(default)]
    pub entity: Value,
}

impl EntityEnvelope {
    pub fn new(provider_id: Uuid, project_id: Uuid, entity_kind: EntityKind, entity_id: Uuid) -> Self {
        Self {
            provider_id,
            project_id,
            entity_kind,
            provider: None,
            entity: serde_json::json!({ "id": entity_id.to_string() }),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Decode a message payload.
    pub fn parse(payload: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(EnvelopeError::Encode)
    }

    /// The id of the entity instance this event refers to.
    pub fn entity_id(&self) -> Result<Uuid, EnvelopeError> {
        if self.entity_kind == EntityKind::Unspecified {
            return Err(EnvelopeError::UnknownKind);
        }
        let raw = self
            .entity
            .get("id")
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MissingId {
                kind: self.entity_kind,
            })?;
        Uuid::parse_str(raw).map_err(|source| EnvelopeError::InvalidId {
            kind: self.entity_kind,
            value: raw.to_string(),
            source,
        })
    }
}

/// Seed a telemetry record from an envelope.
///
/// Always returns a usable record. When the entity id cannot be resolved the
/// record comes back empty alongside the error; otherwise provider, project
/// and (for repositories, artifacts and pull requests) the entity id are set.
pub fn project(envelope: &EntityEnvelope) -> (TelemetryRecord, Option<EnvelopeError>) {
    let mut record = TelemetryRecord::new();

    let id = match envelope.entity_id() {
        Ok(id) => id,
        Err(e) => return (record, Some(e)),
    };

    record.provider_id = Some(envelope.provider_id);
    record.project = Some(envelope.project_id);
    if let Some(ref provider) = envelope.provider {
        record.provider = provider.clone();
    }

    match envelope.entity_kind {
        EntityKind::Repository => record.repository = Some(id),
        EntityKind::Artifact => record.artifact = Some(id),
        EntityKind::PullRequest => record.pull_request = Some(id),
        EntityKind::BuildEnvironment
        | EntityKind::Release
        | EntityKind::PipelineRun
        | EntityKind::TaskRun
        | EntityKind::Build
        | EntityKind::Organization
        | EntityKind::Unspecified => {}
    }

    (record, None)
}
