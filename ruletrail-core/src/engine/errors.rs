//! Rule engine error taxonomy and its categorical telemetry statuses.
//!
//! The engine reports outcomes as errors: a rule that fails is an
//! [`EvaluationError::Failed`], a remediation that had nothing to do is an
//! [`ActionError::NotNeeded`], and so on. Telemetry never inspects the error
//! text, only the variant, and maps it onto [`EvalStatus`] / [`ActionStatus`].
//!
//! Errors arrive as `anyhow::Error` from arbitrary call sites, so
//! classification downcasts. Anything that is not one of our variants is an
//! `error`, never a `success`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Outcome of evaluating a rule against an entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// The entity is not subject to the rule
    #[error("evaluation skipped: rule not applicable to entity")]
    Skipped,

    /// Skipped without notifying the user
    #[error("evaluation skipped silently")]
    SkippedSilently,

    /// The rule produced a definitive non-conformance
    #[error("evaluation failure: {0}")]
    Failed(String),

    /// Upstream data the rule needs is not available yet
    #[error("evaluation pending: {0}")]
    Pending(String),

    /// The evaluator itself broke
    #[error("internal evaluation error: {0}")]
    Internal(String),
}

/// Outcome of running an action (remediate or alert) for a rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Configured dry-run or otherwise deliberately not performed
    #[error("action skipped")]
    Skipped,

    /// Configured off
    #[error("action turned off")]
    TurnedOff,

    /// Turned on, but the entity is already in the desired state
    #[error("action not needed")]
    NotNeeded,

    /// The rule type defines no such action
    #[error("action not available")]
    NotAvailable,

    /// Attempted and failed
    #[error("action failed: {0}")]
    Failed(String),
}

/// Categorical result of a rule evaluation as emitted in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalStatus {
    Success,
    Skipped,
    Failure,
    Pending,
    Error,
}

impl EvalStatus {
    /// Classify an evaluation error. First match wins.
    pub fn classify(err: Option<&anyhow::Error>) -> Self {
        let Some(err) = err else {
            return EvalStatus::Success;
        };
        match err.downcast_ref::<EvaluationError>() {
            Some(EvaluationError::Skipped) | Some(EvaluationError::SkippedSilently) => {
                EvalStatus::Skipped
            }
            Some(EvaluationError::Failed(_)) => EvalStatus::Failure,
            Some(EvaluationError::Pending(_)) => EvalStatus::Pending,
            Some(EvaluationError::Internal(_)) | None => EvalStatus::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvalStatus::Success => "success",
            EvalStatus::Skipped => "skipped",
            EvalStatus::Failure => "failure",
            EvalStatus::Pending => "pending",
            EvalStatus::Error => "error",
        }
    }
}

impl fmt::Display for EvalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical result of an action as emitted in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Skipped,
    NotNeeded,
    Error,
}

impl ActionStatus {
    /// Classify an action error. First match wins.
    pub fn classify(err: Option<&anyhow::Error>) -> Self {
        let Some(err) = err else {
            return ActionStatus::Success;
        };
        match err.downcast_ref::<ActionError>() {
            Some(ActionError::Skipped) | Some(ActionError::TurnedOff) => ActionStatus::Skipped,
            Some(ActionError::NotNeeded) => ActionStatus::NotNeeded,
            Some(ActionError::NotAvailable) | Some(ActionError::Failed(_)) | None => {
                ActionStatus::Error
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Success => "success",
            ActionStatus::Skipped => "skipped",
            ActionStatus::NotNeeded => "not_needed",
            ActionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
