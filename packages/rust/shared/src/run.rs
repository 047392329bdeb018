//! The pipeline run model: stage results, ledger entries, and the
//! aggregated [`PipelineRun`] returned to callers.
//!
//! A `StageResult` is immutable once appended to a run. The run is only
//! ever mutated by appending results; its overall status is derived from
//! the stage results, never stored independently of them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::Request;
use crate::types::{ContentDraft, Lead, OutreachMessage, Platform, ResearchBrief, RunId};

// ---------------------------------------------------------------------------
// Stage identity and status
// ---------------------------------------------------------------------------

/// The closed set of pipeline stages, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Research,
    LeadGeneration,
    ContentCreation,
    Outreach,
}

impl StageKind {
    /// All stages in fixed execution order:
    /// research → lead-generation → content-creation → outreach.
    pub const ORDER: [StageKind; 4] = [
        StageKind::Research,
        StageKind::LeadGeneration,
        StageKind::ContentCreation,
        StageKind::Outreach,
    ];

    /// Stable snake_case identifier (matches the serde wire name).
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Research => "research",
            StageKind::LeadGeneration => "lead_generation",
            StageKind::ContentCreation => "content_creation",
            StageKind::Outreach => "outreach",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one stage within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Partial,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Succeeded => "succeeded",
            StageStatus::Partial => "partial",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage errors
// ---------------------------------------------------------------------------

/// Classification of a stage failure or skip reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// A required upstream payload was not produced; the stage was
    /// skipped, not invoked.
    DependencyUnmet,
    /// Transient provider/network failure (retry-eligible).
    Provider,
    /// The stage exceeded its deadline (never retried).
    Timeout,
    /// Unrecoverable failure; terminal when it hits the mandatory stage.
    Fatal,
    /// The run was cancelled while this stage executed.
    Cancelled,
    /// Stage output violated a platform policy invariant.
    PolicyViolation,
}

impl StageErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageErrorKind::DependencyUnmet => "dependency_unmet",
            StageErrorKind::Provider => "provider",
            StageErrorKind::Timeout => "timeout",
            StageErrorKind::Fatal => "fatal",
            StageErrorKind::Cancelled => "cancelled",
            StageErrorKind::PolicyViolation => "policy_violation",
        }
    }
}

/// Error detail attached to partial/failed results and dependency skips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageError {
    pub kind: StageErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(kind: StageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn dependency_unmet(message: impl Into<String>) -> Self {
        Self::new(StageErrorKind::DependencyUnmet, message)
    }
}

// ---------------------------------------------------------------------------
// Stage payloads
// ---------------------------------------------------------------------------

/// The discriminated per-stage output shape. Each stage may only ever
/// produce its own variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StagePayload {
    Research { brief: ResearchBrief },
    Leads { leads: Vec<Lead> },
    Content { drafts: BTreeMap<Platform, ContentDraft> },
    Outreach { messages: Vec<OutreachMessage> },
}

impl StagePayload {
    /// The stage this payload belongs to.
    pub fn kind(&self) -> StageKind {
        match self {
            StagePayload::Research { .. } => StageKind::Research,
            StagePayload::Leads { .. } => StageKind::LeadGeneration,
            StagePayload::Content { .. } => StageKind::ContentCreation,
            StagePayload::Outreach { .. } => StageKind::Outreach,
        }
    }
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// The immutable outcome record of one stage. Owned by the orchestrator
/// once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub kind: StageKind,
    pub status: StageStatus,
    /// Stage output; `None` for failed and skipped stages.
    pub payload: Option<StagePayload>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Present for partial/failed results and dependency-unmet skips.
    pub error: Option<StageError>,
}

impl StageResult {
    /// A skip entry for a stage the request disabled (no timing cost).
    pub fn skipped(kind: StageKind) -> Self {
        let now = Utc::now();
        Self {
            kind,
            status: StageStatus::Skipped,
            payload: None,
            started_at: now,
            ended_at: now,
            error: None,
        }
    }

    /// A skip entry for a stage whose dependency produced no usable
    /// payload, with an explanatory detail.
    pub fn skipped_dependency(kind: StageKind, reason: impl Into<String>) -> Self {
        let mut result = Self::skipped(kind);
        result.error = Some(StageError::dependency_unmet(reason));
        result
    }

    /// Whether this result carries a payload downstream stages can use.
    pub fn has_usable_payload(&self) -> bool {
        matches!(self.status, StageStatus::Succeeded | StageStatus::Partial)
            && self.payload.is_some()
    }
}

// ---------------------------------------------------------------------------
// Execution ledger entries
// ---------------------------------------------------------------------------

/// One stage attempt, as recorded in the append-only execution ledger.
/// A retried stage appends a new entry rather than overwriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub stage: StageKind,
    /// 1-based attempt number.
    pub attempt: u32,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<StageErrorKind>,
}

// ---------------------------------------------------------------------------
// PipelineRun
// ---------------------------------------------------------------------------

/// Overall status of a pipeline run. `Running` appears only in
/// incremental persistence snapshots taken mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full record of one request's execution across all stages.
///
/// Every aggregate field is present even when its stage was disabled or
/// skipped (empty vec / empty map / `None` brief), so callers can rely
/// on a stable shape. Each field is sourced from exactly one stage's
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub request_id: RunId,
    /// The request that drove this run.
    pub request: Request,
    pub status: RunStatus,
    /// One entry per stage in execution order, including skips.
    pub stages: Vec<StageResult>,
    pub research: Option<ResearchBrief>,
    pub leads: Vec<Lead>,
    pub content: BTreeMap<Platform, ContentDraft>,
    pub outreach: Vec<OutreachMessage>,
    /// Append-only attempt audit trail.
    pub ledger: Vec<LedgerEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PipelineRun {
    /// Look up the result for a stage, if it has been recorded yet.
    pub fn stage(&self, kind: StageKind) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.kind == kind)
    }
}
