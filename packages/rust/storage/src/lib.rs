//! libSQL run store (embedded, local file).
//!
//! The [`RunStore`] persists pipeline run snapshots and the append-only
//! attempt ledger. The orchestrator saves a snapshot after every stage,
//! so a crash mid-run leaves the most recently completed stages durable.
//! Run rows are upserted (one row per run, latest snapshot wins); ledger
//! rows are insert-only and never updated.

mod migrations;

use std::path::Path;

use libsql::{Connection, Database, params};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use creatorflow_shared::{
    CreatorFlowError, LedgerEntry, PipelineRun, Result, RunId,
};

/// Primary storage handle wrapping a libSQL database.
pub struct RunStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

/// One row of the run listing.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub id: String,
    pub topic: String,
    pub status: String,
    pub started_at: String,
    pub duration_ms: u64,
}

impl RunStore {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CreatorFlowError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CreatorFlowError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CreatorFlowError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CreatorFlowError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Run snapshots
    // -----------------------------------------------------------------------

    /// Insert or update the snapshot for a run (latest snapshot wins).
    pub async fn upsert_run(&self, run: &PipelineRun) -> Result<()> {
        let snapshot_json = serde_json::to_string(run)
            .map_err(|e| CreatorFlowError::Storage(format!("snapshot encode: {e}")))?;
        let snapshot_hash = content_hash(&snapshot_json);

        let platforms_json = serde_json::to_string(&run.request.platforms)
            .map_err(|e| CreatorFlowError::Storage(format!("platforms encode: {e}")))?;

        self.conn
            .execute(
                "INSERT INTO runs (id, topic, tone, platforms_json, status, started_at, finished_at, duration_ms, snapshot_json, snapshot_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                   status = excluded.status,
                   finished_at = excluded.finished_at,
                   duration_ms = excluded.duration_ms,
                   snapshot_json = excluded.snapshot_json,
                   snapshot_hash = excluded.snapshot_hash",
                params![
                    run.request_id.to_string(),
                    run.request.topic.as_str(),
                    run.request.tone.as_str(),
                    platforms_json.as_str(),
                    run.status.as_str(),
                    run.started_at.to_rfc3339(),
                    run.finished_at.to_rfc3339(),
                    run.duration_ms as i64,
                    snapshot_json.as_str(),
                    snapshot_hash.as_str(),
                ],
            )
            .await
            .map_err(|e| CreatorFlowError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Load a run snapshot by ID.
    pub async fn get_run(&self, id: &RunId) -> Result<Option<PipelineRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT snapshot_json FROM runs WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| CreatorFlowError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json: String = row
                    .get(0)
                    .map_err(|e| CreatorFlowError::Storage(e.to_string()))?;
                let run = serde_json::from_str(&json)
                    .map_err(|e| CreatorFlowError::Storage(format!("snapshot decode: {e}")))?;
                Ok(Some(run))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(CreatorFlowError::Storage(e.to_string())),
        }
    }

    /// List recent runs, newest first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunSummary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, topic, status, started_at, duration_ms
                 FROM runs ORDER BY started_at DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| CreatorFlowError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(RunSummary {
                id: row
                    .get::<String>(0)
                    .map_err(|e| CreatorFlowError::Storage(e.to_string()))?,
                topic: row
                    .get::<String>(1)
                    .map_err(|e| CreatorFlowError::Storage(e.to_string()))?,
                status: row
                    .get::<String>(2)
                    .map_err(|e| CreatorFlowError::Storage(e.to_string()))?,
                started_at: row
                    .get::<String>(3)
                    .map_err(|e| CreatorFlowError::Storage(e.to_string()))?,
                duration_ms: row.get::<i64>(4).unwrap_or(0) as u64,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Ledger
    // -----------------------------------------------------------------------

    /// Append one attempt record. Rows are never updated or deleted.
    pub async fn append_ledger(&self, run_id: &RunId, entry: &LedgerEntry) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        self.conn
            .execute(
                "INSERT INTO ledger (id, run_id, stage, attempt, status, started_at, ended_at, error_kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.as_str(),
                    run_id.to_string(),
                    entry.stage.as_str(),
                    entry.attempt as i64,
                    entry.status.as_str(),
                    entry.started_at.to_rfc3339(),
                    entry.ended_at.to_rfc3339(),
                    entry.error_kind.map(|k| k.as_str()),
                ],
            )
            .await
            .map_err(|e| CreatorFlowError::Storage(e.to_string()))?;
        Ok(())
    }

    /// All ledger rows for a run, in insertion order.
    /// Returns `(stage, attempt, status, error_kind)` tuples.
    pub async fn ledger_for_run(
        &self,
        run_id: &RunId,
    ) -> Result<Vec<(String, u32, String, Option<String>)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT stage, attempt, status, error_kind FROM ledger
                 WHERE run_id = ?1 ORDER BY id",
                params![run_id.to_string()],
            )
            .await
            .map_err(|e| CreatorFlowError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push((
                row.get::<String>(0)
                    .map_err(|e| CreatorFlowError::Storage(e.to_string()))?,
                row.get::<i64>(1).unwrap_or(0) as u32,
                row.get::<String>(2)
                    .map_err(|e| CreatorFlowError::Storage(e.to_string()))?,
                row.get::<String>(3).ok(),
            ));
        }
        Ok(results)
    }
}

/// SHA-256 hash of snapshot content, for cheap change detection.
fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use creatorflow_shared::{
        Platform, Request, RunStatus, StageErrorKind, StageKind, StageStatus, Tone,
    };

    /// Create a temp file storage for testing.
    async fn test_store() -> RunStore {
        let tmp = std::env::temp_dir().join(format!("cf_test_{}.db", Uuid::now_v7()));
        RunStore::open(&tmp).await.expect("open test db")
    }

    fn sample_run(status: RunStatus) -> PipelineRun {
        let now = Utc::now();
        PipelineRun {
            request_id: RunId::new(),
            request: Request {
                topic: "AI tools".into(),
                tone: Tone::Professional,
                platforms: vec![Platform::LinkedIn],
                research: true,
                lead_gen: false,
                outreach: false,
                research_only: false,
                target_audience: None,
                custom_instructions: None,
            },
            status,
            stages: vec![],
            research: None,
            leads: vec![],
            content: Default::default(),
            outreach: vec![],
            ledger: vec![],
            started_at: now,
            finished_at: now,
            duration_ms: 1234,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("cf_test_{}.db", Uuid::now_v7()));
        let s1 = RunStore::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = RunStore::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn run_snapshot_roundtrip() {
        let store = test_store().await;
        let run = sample_run(RunStatus::Succeeded);

        store.upsert_run(&run).await.expect("upsert run");

        let loaded = store
            .get_run(&run.request_id)
            .await
            .expect("get run")
            .expect("run present");
        assert_eq!(loaded.request_id, run.request_id);
        assert_eq!(loaded.request.topic, "AI tools");
        assert_eq!(loaded.status, RunStatus::Succeeded);
        assert_eq!(loaded.duration_ms, 1234);
    }

    #[tokio::test]
    async fn upsert_replaces_snapshot() {
        let store = test_store().await;
        let mut run = sample_run(RunStatus::Running);
        store.upsert_run(&run).await.expect("first save");

        run.status = RunStatus::Partial;
        run.duration_ms = 9999;
        store.upsert_run(&run).await.expect("second save");

        let loaded = store
            .get_run(&run.request_id)
            .await
            .expect("get run")
            .expect("run present");
        assert_eq!(loaded.status, RunStatus::Partial);
        assert_eq!(loaded.duration_ms, 9999);

        let listing = store.list_runs(10).await.expect("list");
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].status, "partial");
    }

    #[tokio::test]
    async fn list_runs_respects_limit() {
        let store = test_store().await;
        for _ in 0..5 {
            store
                .upsert_run(&sample_run(RunStatus::Succeeded))
                .await
                .expect("save");
        }
        let listing = store.list_runs(3).await.expect("list");
        assert_eq!(listing.len(), 3);
    }

    #[tokio::test]
    async fn ledger_rows_accumulate_in_order() {
        let store = test_store().await;
        let run = sample_run(RunStatus::Running);
        store.upsert_run(&run).await.expect("save run");

        let now = Utc::now();
        for attempt in 1..=2u32 {
            let entry = LedgerEntry {
                stage: StageKind::Research,
                attempt,
                status: if attempt == 1 {
                    StageStatus::Failed
                } else {
                    StageStatus::Succeeded
                },
                started_at: now,
                ended_at: now,
                error_kind: (attempt == 1).then_some(StageErrorKind::Provider),
            };
            store
                .append_ledger(&run.request_id, &entry)
                .await
                .expect("append ledger");
        }

        let rows = store
            .ledger_for_run(&run.request_id)
            .await
            .expect("ledger rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("research".into(), 1, "failed".into(), Some("provider".into())));
        assert_eq!(rows[1], ("research".into(), 2, "succeeded".into(), None));
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash("snapshot"), content_hash("snapshot"));
        assert_ne!(content_hash("a"), content_hash("b"));
        assert_eq!(content_hash("x").len(), 64);
    }
}
