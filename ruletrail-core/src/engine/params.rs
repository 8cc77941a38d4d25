//! Evaluation parameters handed to telemetry once a rule has run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// The kinds of action a rule can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Remediate,
    Alert,
}

impl ActionKind {
    pub const ALL: [ActionKind; 2] = [ActionKind::Remediate, ActionKind::Alert];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Remediate => "remediate",
            ActionKind::Alert => "alert",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured on/off state of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    On,
    #[default]
    Off,
    DryRun,
}

impl ActionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionState::On => "on",
            ActionState::Off => "off",
            ActionState::DryRun => "dry_run",
        }
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile the rule was evaluated under
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileRef {
    pub id: Uuid,
    pub name: String,
}

/// Per-action errors produced while running the actions of one rule.
#[derive(Debug, Default)]
pub struct ActionsErrors {
    pub remediate: Option<anyhow::Error>,
    pub alert: Option<anyhow::Error>,
}

impl ActionsErrors {
    pub fn get(&self, kind: ActionKind) -> Option<&anyhow::Error> {
        match kind {
            ActionKind::Remediate => self.remediate.as_ref(),
            ActionKind::Alert => self.alert.as_ref(),
        }
    }
}

/// Everything the engine knows about one finished rule evaluation.
///
/// The rule object only stores the rule type id; the rule type name is
/// supplied separately by the caller when recording.
#[derive(Debug, Default)]
pub struct EvalParams {
    pub rule_type_id: Uuid,
    pub profile: ProfileRef,
    /// `None` means the rule passed
    pub eval_error: Option<anyhow::Error>,
    /// Configured state per action; kinds not present are `off`
    pub action_states: BTreeMap<ActionKind, ActionState>,
    pub action_errors: ActionsErrors,
}

impl EvalParams {
    pub fn new(rule_type_id: Uuid, profile: ProfileRef) -> Self {
        Self {
            rule_type_id,
            profile,
            ..Default::default()
        }
    }

    pub fn with_eval_error(mut self, err: impl Into<anyhow::Error>) -> Self {
        self.eval_error = Some(err.into());
        self
    }

    pub fn with_action(mut self, kind: ActionKind, state: ActionState) -> Self {
        self.action_states.insert(kind, state);
        self
    }

    pub fn with_action_error(mut self, kind: ActionKind, err: impl Into<anyhow::Error>) -> Self {
        let slot = match kind {
            ActionKind::Remediate => &mut self.action_errors.remediate,
            ActionKind::Alert => &mut self.action_errors.alert,
        };
        *slot = Some(err.into());
        self
    }

    pub fn action_state(&self, kind: ActionKind) -> ActionState {
        self.action_states.get(&kind).copied().unwrap_or_default()
    }
}
