//! Rule engine surface consumed by telemetry.
//!
//! Only what the telemetry store needs lives here: the error taxonomy the
//! engine reports outcomes with, and the parameter bundle describing one
//! finished rule evaluation.

pub mod errors;
pub mod params;

pub use errors::{ActionError, ActionStatus, EvalStatus, EvaluationError};
pub use params::{ActionKind, ActionState, ActionsErrors, EvalParams, ProfileRef};
