//! Dialogue scripts and the engine that runs them.
//!
//! Scripts are immutable data describing a bounded, retryable multi-turn
//! exchange with the device; the executor is the single loop that runs
//! any of them.

pub mod definition;
pub mod executor;

pub use definition::{RetryBudget, Script, ScriptKind, Step, StepAction};
pub use executor::{DialogueEngine, DialogueReport};
