//! Persistence seam between the orchestrator and the run store.
//!
//! The orchestrator saves a run snapshot after every stage and records
//! every attempt, all best-effort: persistence failures are logged and
//! never abort the run. Durability guarantees belong to the store.

use async_trait::async_trait;

use creatorflow_shared::{LedgerEntry, PipelineRun, Result, RunId};
use creatorflow_storage::RunStore;

/// Where the orchestrator writes incremental run state.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Save (or replace) the current snapshot of a run.
    async fn save_run(&self, run: &PipelineRun) -> Result<()>;

    /// Record one stage attempt in the durable ledger.
    async fn record_attempt(&self, run_id: &RunId, entry: &LedgerEntry) -> Result<()>;
}

/// Discards everything; the default for embedded/test usage.
pub struct NullSink;

#[async_trait]
impl PersistenceSink for NullSink {
    async fn save_run(&self, _run: &PipelineRun) -> Result<()> {
        Ok(())
    }

    async fn record_attempt(&self, _run_id: &RunId, _entry: &LedgerEntry) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl PersistenceSink for RunStore {
    async fn save_run(&self, run: &PipelineRun) -> Result<()> {
        self.upsert_run(run).await
    }

    async fn record_attempt(&self, run_id: &RunId, entry: &LedgerEntry) -> Result<()> {
        self.append_ledger(run_id, entry).await
    }
}
