//! Shared types, error model, and configuration for CreatorFlow.
//!
//! This crate is the foundation depended on by all other CreatorFlow crates.
//! It provides:
//! - [`CreatorFlowError`] — the unified error type
//! - Domain types ([`Platform`], [`Tone`], [`Lead`], [`ContentDraft`], ...)
//! - The run model ([`PipelineRun`], [`StageResult`], [`LedgerEntry`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod request;
pub mod run;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LeadGenConfig, PipelineConfig, PipelinePolicyConfig,
    ProviderConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{CreatorFlowError, Result};
pub use request::Request;
pub use run::{
    LedgerEntry, PipelineRun, RunStatus, StageError, StageErrorKind, StageKind, StagePayload,
    StageResult, StageStatus,
};
pub use types::{
    ContentDraft, Lead, OutreachMessage, Platform, ResearchBrief, ResearchSource, RunId, Tone,
};
