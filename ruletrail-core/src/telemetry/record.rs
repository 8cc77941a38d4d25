//! The telemetry record and the handle call sites mutate it through.
//!
//! A [`TelemetryRecord`] is plain data: what one unit of work observed. The
//! [`RecordHandle`] is what gets shared. A bound handle aliases one record
//! behind a mutex; a detached handle stands in when nothing is bound and
//! silently ignores every mutation, so deep call sites can write
//! `lookup(&ctx).append_rule_evaluation(..)` without checking first.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::{ActionKind, ActionState, ActionStatus, EvalParams, EvalStatus};

use super::context::{self, Context};
use super::sink::{Level, SinkEvent};

/// An `{id, name}` pair for profiles and rule types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdName {
    pub id: Uuid,
    pub name: String,
}

impl IdName {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.id.is_nil() && self.name.is_empty()
    }
}

/// Summary of a deleted project, recorded on project-deletion flows.
///
/// Equality compares every field; entitlements compare in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTombstone {
    pub project: Uuid,
    pub profile_count: i64,
    pub repositories_count: i64,
    pub entitlements: Vec<String>,
}

impl ProjectTombstone {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Configured state and outcome of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvaluation {
    pub state: ActionState,
    pub result: ActionStatus,
}

/// Normalized outcome of one rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    #[serde(rename = "ruletype")]
    pub rule_type: IdName,
    pub profile: IdName,
    pub eval_result: EvalStatus,
    pub actions: BTreeMap<ActionKind, ActionEvaluation>,
}

impl RuleEvaluation {
    /// Build an entry from engine parameters and the rule type name.
    pub fn from_params(params: &EvalParams, rule_type_name: &str) -> Self {
        let actions = ActionKind::ALL
            .into_iter()
            .map(|kind| {
                let action = ActionEvaluation {
                    state: params.action_state(kind),
                    result: ActionStatus::classify(params.action_errors.get(kind)),
                };
                (kind, action)
            })
            .collect();

        Self {
            rule_type: IdName::new(params.rule_type_id, rule_type_name),
            profile: IdName::new(params.profile.id, params.profile.name.clone()),
            eval_result: EvalStatus::classify(params.eval_error.as_ref()),
            actions,
        }
    }
}

/// Observational data accumulated over one unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub project: Option<Uuid>,
    pub provider: String,
    pub provider_id: Option<Uuid>,
    pub login_hash: String,
    pub repository: Option<Uuid>,
    pub artifact: Option<Uuid>,
    pub pull_request: Option<Uuid>,
    pub profile: IdName,
    pub rule_type: IdName,
    /// Append-only, in call order
    pub evaluations: Vec<RuleEvaluation>,
    pub project_tombstone: ProjectTombstone,
}

fn present(id: Option<Uuid>) -> Option<Uuid> {
    id.filter(|id| !id.is_nil())
}

impl TelemetryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decorate `event` with every populated field plus the `telemetry`
    /// marker. Pure read.
    pub fn write_fields(&self, mut event: SinkEvent) -> SinkEvent {
        if let Some(project) = present(self.project) {
            event = event.id("project", project);
        }
        if !self.provider.is_empty() {
            event = event.str("provider", self.provider.as_str());
        }
        if let Some(provider_id) = present(self.provider_id) {
            event = event.id("provider_id", provider_id);
        }
        if !self.login_hash.is_empty() {
            event = event.str("login_sha", self.login_hash.as_str());
        }
        if let Some(repository) = present(self.repository) {
            event = event.id("repository", repository);
        }
        if let Some(artifact) = present(self.artifact) {
            event = event.id("artifact", artifact);
        }
        if let Some(pr) = present(self.pull_request) {
            event = event.id("pr", pr);
        }
        if !self.profile.is_zero() {
            event = event.json("profile", &self.profile);
        }
        if !self.rule_type.is_zero() {
            event = event.json("ruletype", &self.rule_type);
        }
        if !self.project_tombstone.is_zero() {
            event = event.json("project_tombstone", &self.project_tombstone);
        }
        if !self.evaluations.is_empty() {
            event = event.json("rules", &self.evaluations);
        }
        event.str("telemetry", "true")
    }
}

/// Result of looking up telemetry in a [`Context`].
#[derive(Debug, Clone, Default)]
pub enum RecordHandle {
    /// Aliases a live record
    Bound(Arc<Mutex<TelemetryRecord>>),
    /// No record bound; mutations are discarded
    #[default]
    Detached,
}

impl From<TelemetryRecord> for RecordHandle {
    fn from(record: TelemetryRecord) -> Self {
        RecordHandle::Bound(Arc::new(Mutex::new(record)))
    }
}

impl RecordHandle {
    /// A fresh, empty, bound record.
    pub fn new() -> Self {
        TelemetryRecord::new().into()
    }

    pub fn detached() -> Self {
        RecordHandle::Detached
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, RecordHandle::Detached)
    }

    /// True when both handles alias the same record. Detached handles are
    /// never the same record as anything.
    pub fn ptr_eq(&self, other: &RecordHandle) -> bool {
        match (self, other) {
            (RecordHandle::Bound(a), RecordHandle::Bound(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Apply `f` to the bound record; no-op when detached.
    pub fn update<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&mut TelemetryRecord),
    {
        if let RecordHandle::Bound(record) = self {
            f(&mut record.lock());
        }
        self
    }

    /// Copy of the current record state, `None` when detached.
    pub fn snapshot(&self) -> Option<TelemetryRecord> {
        match self {
            RecordHandle::Bound(record) => Some(record.lock().clone()),
            RecordHandle::Detached => None,
        }
    }

    pub fn set_project(&self, project: Uuid) -> &Self {
        self.update(|r| r.project = Some(project))
    }

    pub fn set_provider(&self, provider: impl Into<String>) -> &Self {
        match self {
            RecordHandle::Bound(_) => {
                let provider = provider.into();
                self.update(|r| r.provider = provider)
            }
            RecordHandle::Detached => self,
        }
    }

    pub fn set_provider_id(&self, provider_id: Uuid) -> &Self {
        self.update(|r| r.provider_id = Some(provider_id))
    }

    pub fn set_login_hash(&self, login_hash: impl Into<String>) -> &Self {
        match self {
            RecordHandle::Bound(_) => {
                let login_hash = login_hash.into();
                self.update(|r| r.login_hash = login_hash)
            }
            RecordHandle::Detached => self,
        }
    }

    pub fn set_repository(&self, repository: Uuid) -> &Self {
        self.update(|r| r.repository = Some(repository))
    }

    pub fn set_artifact(&self, artifact: Uuid) -> &Self {
        self.update(|r| r.artifact = Some(artifact))
    }

    pub fn set_pull_request(&self, pull_request: Uuid) -> &Self {
        self.update(|r| r.pull_request = Some(pull_request))
    }

    pub fn set_profile(&self, profile: IdName) -> &Self {
        self.update(|r| r.profile = profile)
    }

    pub fn set_rule_type(&self, rule_type: IdName) -> &Self {
        self.update(|r| r.rule_type = rule_type)
    }

    pub fn set_project_tombstone(&self, tombstone: ProjectTombstone) -> &Self {
        self.update(|r| r.project_tombstone = tombstone)
    }

    /// Append one normalized rule evaluation.
    ///
    /// The engine's rule object carries only the rule type id, so the caller
    /// supplies the name. Detached handles return before building anything.
    pub fn append_rule_evaluation(&self, params: &EvalParams, rule_type_name: &str) -> &Self {
        let RecordHandle::Bound(record) = self else {
            return self;
        };
        let entry = RuleEvaluation::from_params(params, rule_type_name);
        record.lock().evaluations.push(entry);
        self
    }

    /// Build the sink event for this record without committing it.
    ///
    /// A detached handle yields an event carrying only the marker field.
    pub fn emit(&self, level: Level) -> SinkEvent {
        let event = SinkEvent::new(level);
        match self {
            RecordHandle::Bound(record) => record.lock().write_fields(event),
            RecordHandle::Detached => event.str("telemetry", "true"),
        }
    }

    /// Derive a context carrying this record. Detached handles hand back
    /// `ctx` unchanged.
    pub fn bind(&self, ctx: &Context) -> Context {
        match self {
            RecordHandle::Bound(_) => context::with_record(ctx, self.clone()),
            RecordHandle::Detached => ctx.clone(),
        }
    }
}
