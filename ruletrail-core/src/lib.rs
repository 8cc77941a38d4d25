//! Ruletrail - business telemetry for rule evaluation
//!
//! One structured record per unit of work, collected from arbitrarily deep
//! call sites through the request/event [`telemetry::Context`] and committed
//! once when the work ends.

pub mod config;
pub mod engine;
pub mod entities;
pub mod events;
pub mod telemetry;
