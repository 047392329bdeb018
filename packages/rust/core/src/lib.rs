//! Core pipeline orchestration for CreatorFlow.
//!
//! This crate sequences the generation stages for one request, enforces
//! the dependency/timeout/retry/cancellation policy, keeps the
//! append-only execution ledger, and aggregates stage payloads into the
//! final [`creatorflow_shared::PipelineRun`].

pub mod ledger;
pub mod persist;
pub mod pipeline;

pub use ledger::ExecutionLedger;
pub use persist::{NullSink, PersistenceSink};
pub use pipeline::{Pipeline, ProgressReporter, SilentProgress, StageSet};
