//! The pipeline orchestrator: request → research → lead-generation →
//! content-creation → outreach → aggregated [`PipelineRun`].
//!
//! Stages run in strict sequence within a run (later stages consume
//! earlier payloads); independent runs execute concurrently without
//! shared mutable state — each run owns its own result list and ledger.
//!
//! Execution policy per stage:
//! 1. disabled by the request → `skipped`, no timing cost
//! 2. dependency produced no usable payload → `skipped` with detail
//! 3. otherwise invoked under a bounded deadline; timeout is recorded
//!    `failed` and never retried within the run
//! 4. recoverable errors retry up to the configured bound, one fixed
//!    delay between attempts
//! 5. a failed research stage does not abort the run; a failed
//!    content-creation stage is terminal
//!
//! A failure in a downstream stage never discards completed upstream
//! work: every outcome is captured inside the returned run, and the only
//! error `run` itself surfaces is request validation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use creatorflow_shared::{
    PipelineConfig, PipelineRun, Request, Result, RunId, RunStatus, StageError, StageErrorKind,
    StageKind, StagePayload, StageResult, StageStatus,
};
use creatorflow_stages::provider::GenerationProvider;
use creatorflow_stages::{
    ContentCreationStage, LeadGenerationStage, OutreachStage, ResearchStage, Stage, StageContext,
    StageFailure,
};

use crate::ledger::ExecutionLedger;
use crate::persist::{NullSink, PersistenceSink};

// ---------------------------------------------------------------------------
// Stage set
// ---------------------------------------------------------------------------

/// The four stage implementations, one per [`StageKind`]. A closed set:
/// the orchestrator can never be handed a stage it does not know about.
pub struct StageSet {
    pub research: Arc<dyn Stage>,
    pub lead_generation: Arc<dyn Stage>,
    pub content_creation: Arc<dyn Stage>,
    pub outreach: Arc<dyn Stage>,
}

impl StageSet {
    /// The built-in stages wired to one shared generation provider.
    pub fn with_provider(provider: Arc<dyn GenerationProvider>, max_leads: usize) -> Self {
        Self {
            research: Arc::new(ResearchStage::new(provider.clone())),
            lead_generation: Arc::new(
                LeadGenerationStage::new(provider.clone()).with_max_leads(max_leads),
            ),
            content_creation: Arc::new(ContentCreationStage::new(provider.clone())),
            outreach: Arc::new(OutreachStage::new(provider)),
        }
    }

    fn stage_for(&self, kind: StageKind) -> &dyn Stage {
        match kind {
            StageKind::Research => self.research.as_ref(),
            StageKind::LeadGeneration => self.lead_generation.as_ref(),
            StageKind::ContentCreation => self.content_creation.as_ref(),
            StageKind::Outreach => self.outreach.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a stage is about to be invoked (not for skips).
    fn stage_started(&self, kind: StageKind);
    /// Called after each stage result is recorded, skips included.
    fn stage_finished(&self, result: &StageResult);
    /// Called when the run is finalized.
    fn done(&self, run: &PipelineRun);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _kind: StageKind) {}
    fn stage_finished(&self, _result: &StageResult) {}
    fn done(&self, _run: &PipelineRun) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Sequences stages for one request and aggregates their outcomes.
pub struct Pipeline {
    stages: StageSet,
    config: PipelineConfig,
    sink: Arc<dyn PersistenceSink>,
}

impl Pipeline {
    pub fn new(stages: StageSet, config: PipelineConfig) -> Self {
        Self {
            stages,
            config,
            sink: Arc::new(NullSink),
        }
    }

    /// Attach a persistence sink for incremental snapshot saves.
    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run the pipeline for one request. The sole entry point.
    ///
    /// Errors only on request validation; every stage-level failure is
    /// captured inside the returned run.
    pub async fn run(&self, request: Request) -> Result<PipelineRun> {
        self.run_with(request, CancellationToken::new(), &SilentProgress)
            .await
    }

    /// Run with an external cancellation token and progress reporting.
    #[instrument(skip_all, fields(topic = %request.topic))]
    pub async fn run_with(
        &self,
        request: Request,
        cancel: CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineRun> {
        request.validate()?;

        let start = Instant::now();
        let started_at = Utc::now();
        let request_id = RunId::new();

        info!(%request_id, platforms = request.platforms.len(), "starting pipeline run");

        let mut completed: Vec<StageResult> = Vec::with_capacity(StageKind::ORDER.len());
        let mut ledger = ExecutionLedger::new();
        let mut abort_detail: Option<StageError> = None;
        let mut cancelled = false;

        // Save an initial snapshot so ledger rows always have a parent
        // run row, and so an early crash still leaves a trace.
        self.save_snapshot(
            &request_id, &request, &completed, &ledger, started_at, start,
        )
        .await;

        for kind in StageKind::ORDER {
            let result = if let Some(detail) = &abort_detail {
                let mut skipped = StageResult::skipped(kind);
                skipped.error = Some(detail.clone());
                skipped
            } else if !request.stage_enabled(kind) {
                StageResult::skipped(kind)
            } else if let Some(gap) = dependency_gap(kind, &request, &completed) {
                debug!(%kind, reason = %gap, "dependency unmet, skipping stage");
                StageResult::skipped_dependency(kind, gap)
            } else {
                progress.stage_started(kind);
                self.execute_stage(kind, &request, &completed, &cancel, &mut ledger, &request_id)
                    .await
            };

            if result.status == StageStatus::Failed {
                if result
                    .error
                    .as_ref()
                    .is_some_and(|e| e.kind == StageErrorKind::Cancelled)
                {
                    cancelled = true;
                    abort_detail = Some(StageError::new(
                        StageErrorKind::Cancelled,
                        "run cancelled before this stage",
                    ));
                } else if kind == request.mandatory_stage() {
                    abort_detail = Some(StageError::dependency_unmet(format!(
                        "{kind} failed; run aborted"
                    )));
                }
            }

            progress.stage_finished(&result);
            completed.push(result);

            self.save_snapshot(
                &request_id, &request, &completed, &ledger, started_at, start,
            )
            .await;
        }

        let finished_at = Utc::now();
        let status = aggregate_status(&request, &completed, cancelled);
        let run = assemble_run(
            request_id,
            request,
            completed,
            ledger.into_entries(),
            status,
            started_at,
            finished_at,
            start.elapsed().as_millis() as u64,
        );

        if let Err(e) = self.sink.save_run(&run).await {
            warn!(error = %e, "final persistence failed");
        }

        progress.done(&run);

        info!(
            request_id = %run.request_id,
            status = %run.status,
            duration_ms = run.duration_ms,
            "pipeline run complete"
        );

        Ok(run)
    }

    /// Invoke one stage with deadline, cancellation, and retry handling.
    async fn execute_stage(
        &self,
        kind: StageKind,
        request: &Request,
        completed: &[StageResult],
        cancel: &CancellationToken,
        ledger: &mut ExecutionLedger,
        run_id: &RunId,
    ) -> StageResult {
        let stage = self.stages.stage_for(kind);
        let deadline = self.config.timeout_for(kind);
        let max_attempts = 1 + self.config.retry_limit;
        let stage_started = Utc::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let attempt_started = Utc::now();
            debug!(%kind, attempt, "invoking stage");

            let ctx = StageContext {
                request,
                completed,
                cancel: cancel.clone(),
            };

            // The deadline is enforced here, independent of the stage's
            // own cooperation; cancellation wins over everything.
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(StageError::new(
                    StageErrorKind::Cancelled,
                    "run cancelled by caller",
                )),
                invoked = tokio::time::timeout(deadline, stage.execute(&ctx)) => match invoked {
                    Err(_) => Err(StageError::new(
                        StageErrorKind::Timeout,
                        format!("{kind} exceeded its {}ms deadline", deadline.as_millis()),
                    )),
                    Ok(Ok(payload)) => Ok(payload),
                    Ok(Err(StageFailure::Recoverable(msg))) => {
                        Err(StageError::new(StageErrorKind::Provider, msg))
                    }
                    Ok(Err(StageFailure::Fatal(msg))) => {
                        Err(StageError::new(StageErrorKind::Fatal, msg))
                    }
                },
            };
            let attempt_ended = Utc::now();

            match outcome {
                Ok(payload) => {
                    let (status, payload, error) = self.gate_payload(kind, payload);
                    self.record_attempt(
                        run_id,
                        ledger,
                        kind,
                        attempt,
                        status,
                        attempt_started,
                        attempt_ended,
                        error.as_ref().map(|e| e.kind),
                    )
                    .await;
                    return StageResult {
                        kind,
                        status,
                        payload,
                        started_at: stage_started,
                        ended_at: attempt_ended,
                        error,
                    };
                }
                Err(error) => {
                    self.record_attempt(
                        run_id,
                        ledger,
                        kind,
                        attempt,
                        StageStatus::Failed,
                        attempt_started,
                        attempt_ended,
                        Some(error.kind),
                    )
                    .await;

                    // Only recoverable provider errors are retry-eligible;
                    // timeouts and fatals are recorded on the spot.
                    if error.kind == StageErrorKind::Provider && attempt < max_attempts {
                        debug!(%kind, attempt, "recoverable failure, retrying after fixed delay");
                        tokio::time::sleep(self.config.retry_delay).await;
                        continue;
                    }

                    warn!(%kind, attempt, error = %error.message, "stage failed");
                    return StageResult {
                        kind,
                        status: StageStatus::Failed,
                        payload: None,
                        started_at: stage_started,
                        ended_at: attempt_ended,
                        error: Some(error),
                    };
                }
            }
        }
    }

    /// Validate a stage's payload before accepting it.
    ///
    /// Content drafts violating their platform's max body length are
    /// rejected outright — never truncated — demoting the result to
    /// partial, or failing it when nothing deliverable remains.
    fn gate_payload(
        &self,
        kind: StageKind,
        payload: StagePayload,
    ) -> (StageStatus, Option<StagePayload>, Option<StageError>) {
        if payload.kind() != kind {
            return (
                StageStatus::Failed,
                None,
                Some(StageError::new(
                    StageErrorKind::Fatal,
                    format!("{kind} returned a {} payload", payload.kind()),
                )),
            );
        }

        let mut drafts = match payload {
            StagePayload::Content { drafts } => drafts,
            other => return (StageStatus::Succeeded, Some(other), None),
        };

        let mut rejected = Vec::new();
        drafts.retain(|platform, draft| {
            if creatorflow_policy::exceeds_max_length(draft) {
                warn!(%platform, body_chars = draft.body.chars().count(),
                      "rejecting draft over platform max length");
                rejected.push(*platform);
                false
            } else {
                true
            }
        });

        if rejected.is_empty() {
            return (
                StageStatus::Succeeded,
                Some(StagePayload::Content { drafts }),
                None,
            );
        }

        let detail = StageError::new(
            StageErrorKind::PolicyViolation,
            format!(
                "drafts exceeded platform max length: {}",
                rejected
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        );

        if drafts.is_empty() {
            (StageStatus::Failed, None, Some(detail))
        } else {
            (
                StageStatus::Partial,
                Some(StagePayload::Content { drafts }),
                Some(detail),
            )
        }
    }

    /// Append an attempt to the in-run ledger and the durable sink.
    #[allow(clippy::too_many_arguments)]
    async fn record_attempt(
        &self,
        run_id: &RunId,
        ledger: &mut ExecutionLedger,
        stage: StageKind,
        attempt: u32,
        status: StageStatus,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        error_kind: Option<StageErrorKind>,
    ) {
        let entry = creatorflow_shared::LedgerEntry {
            stage,
            attempt,
            status,
            started_at,
            ended_at,
            error_kind,
        };

        if let Err(e) = self.sink.record_attempt(run_id, &entry).await {
            warn!(%stage, attempt, error = %e, "ledger persistence failed");
        }
        ledger.append(entry);
    }

    /// Best-effort incremental snapshot save.
    async fn save_snapshot(
        &self,
        request_id: &RunId,
        request: &Request,
        completed: &[StageResult],
        ledger: &ExecutionLedger,
        started_at: DateTime<Utc>,
        start: Instant,
    ) {
        let snapshot = assemble_run(
            request_id.clone(),
            request.clone(),
            completed.to_vec(),
            ledger.entries().to_vec(),
            RunStatus::Running,
            started_at,
            Utc::now(),
            start.elapsed().as_millis() as u64,
        );
        if let Err(e) = self.sink.save_run(&snapshot).await {
            warn!(error = %e, "incremental persistence failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Dependency and aggregation rules
// ---------------------------------------------------------------------------

/// Why a stage cannot be invoked given what prior stages produced.
fn dependency_gap(
    kind: StageKind,
    request: &Request,
    completed: &[StageResult],
) -> Option<String> {
    let usable = |k: StageKind| {
        completed
            .iter()
            .find(|r| r.kind == k)
            .filter(|r| r.has_usable_payload())
    };

    match kind {
        // Research has no dependencies; content proceeds with whatever
        // research payload exists, empty included.
        StageKind::Research | StageKind::ContentCreation => None,

        StageKind::LeadGeneration => {
            if !request.research {
                Some("research stage was not enabled in this run".into())
            } else if usable(StageKind::Research).is_none() {
                Some("research produced no usable payload".into())
            } else {
                None
            }
        }

        StageKind::Outreach => match usable(StageKind::LeadGeneration) {
            None => Some("lead generation produced no usable payload".into()),
            Some(result) => match &result.payload {
                Some(StagePayload::Leads { leads }) if leads.is_empty() => {
                    Some("no leads were produced".into())
                }
                _ => None,
            },
        },
    }
}

/// Derive the overall run status from the recorded stage results.
fn aggregate_status(request: &Request, stages: &[StageResult], cancelled: bool) -> RunStatus {
    if cancelled {
        return RunStatus::Failed;
    }

    let mandatory = request.mandatory_stage();
    let Some(primary) = stages.iter().find(|s| s.kind == mandatory) else {
        return RunStatus::Failed;
    };

    match primary.status {
        StageStatus::Failed | StageStatus::Skipped => RunStatus::Failed,
        StageStatus::Partial => RunStatus::Partial,
        StageStatus::Succeeded => {
            let degraded = stages.iter().any(|s| {
                s.kind != mandatory
                    && (matches!(s.status, StageStatus::Failed | StageStatus::Partial)
                        || (s.status == StageStatus::Skipped && s.error.is_some()))
            });
            if degraded {
                RunStatus::Partial
            } else {
                RunStatus::Succeeded
            }
        }
    }
}

/// Merge stage payloads into the aggregate run. Each field is sourced
/// from exactly one stage's payload; nothing is re-derived.
#[allow(clippy::too_many_arguments)]
fn assemble_run(
    request_id: RunId,
    request: Request,
    stages: Vec<StageResult>,
    ledger: Vec<creatorflow_shared::LedgerEntry>,
    status: RunStatus,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration_ms: u64,
) -> PipelineRun {
    let mut research = None;
    let mut leads = Vec::new();
    let mut content = BTreeMap::new();
    let mut outreach = Vec::new();

    for result in &stages {
        if !result.has_usable_payload() {
            continue;
        }
        match &result.payload {
            Some(StagePayload::Research { brief }) => research = Some(brief.clone()),
            Some(StagePayload::Leads { leads: found }) => leads = found.clone(),
            Some(StagePayload::Content { drafts }) => content = drafts.clone(),
            Some(StagePayload::Outreach { messages }) => outreach = messages.clone(),
            None => {}
        }
    }

    PipelineRun {
        request_id,
        request,
        status,
        stages,
        research,
        leads,
        content,
        outreach,
        ledger,
        started_at,
        finished_at,
        duration_ms,
    }
}
