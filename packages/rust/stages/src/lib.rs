//! Stage interface and the four built-in generation stages.
//!
//! Each stage satisfies the [`Stage`] capability contract: it reads the
//! request and prior stage results from an immutable [`StageContext`] and
//! returns its own payload variant or a classified [`StageFailure`].
//! Stages hold no mutable pipeline state; all external effects go
//! through injected collaborators (the [`GenerationProvider`]).

pub mod content;
pub mod leads;
pub mod outreach;
pub mod provider;
pub mod research;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use creatorflow_shared::{
    Lead, Request, ResearchBrief, StageKind, StagePayload, StageResult,
};

pub use content::ContentCreationStage;
pub use leads::LeadGenerationStage;
pub use outreach::OutreachStage;
pub use provider::{
    DraftSpec, GenerationProvider, HttpProvider, LeadCandidate, ProviderError, ProviderResult,
    ResearchFindings, SourceCandidate, TemplateProvider,
};
pub use research::ResearchStage;

// ---------------------------------------------------------------------------
// Stage context
// ---------------------------------------------------------------------------

/// Read-only execution context handed to a stage.
///
/// Carries the request, the accumulated results of prior stages in this
/// run, and the run's cancellation signal. A stage must not mutate any
/// of it.
pub struct StageContext<'a> {
    pub request: &'a Request,
    /// Results of stages that already completed, in execution order.
    pub completed: &'a [StageResult],
    /// Fires when the caller cancels the run.
    pub cancel: CancellationToken,
}

impl StageContext<'_> {
    /// Result recorded for a prior stage, if any.
    pub fn result_for(&self, kind: StageKind) -> Option<&StageResult> {
        self.completed.iter().find(|r| r.kind == kind)
    }

    /// Research brief produced earlier in this run, if usable.
    pub fn research_brief(&self) -> Option<&ResearchBrief> {
        self.result_for(StageKind::Research)
            .filter(|r| r.has_usable_payload())
            .and_then(|r| match &r.payload {
                Some(StagePayload::Research { brief }) => Some(brief),
                _ => None,
            })
    }

    /// Leads produced earlier in this run; empty if none.
    pub fn leads(&self) -> &[Lead] {
        self.result_for(StageKind::LeadGeneration)
            .filter(|r| r.has_usable_payload())
            .and_then(|r| match &r.payload {
                Some(StagePayload::Leads { leads }) => Some(leads.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Stage failures
// ---------------------------------------------------------------------------

/// A stage-level failure, classified for the orchestrator's retry policy.
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    /// Transient provider/network failure; the orchestrator may retry.
    #[error("recoverable stage error: {0}")]
    Recoverable(String),

    /// Invalid input or unrecoverable state; never retried.
    #[error("fatal stage error: {0}")]
    Fatal(String),
}

impl From<ProviderError> for StageFailure {
    fn from(err: ProviderError) -> Self {
        if err.is_recoverable() {
            StageFailure::Recoverable(err.to_string())
        } else {
            StageFailure::Fatal(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Stage trait
// ---------------------------------------------------------------------------

/// The capability contract every generation stage satisfies.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Which pipeline stage this implementation provides.
    fn kind(&self) -> StageKind;

    /// Execute the stage against the given context.
    ///
    /// The returned payload must be the variant matching `kind()`.
    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StagePayload, StageFailure>;
}
