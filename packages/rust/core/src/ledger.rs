//! Append-only execution ledger.
//!
//! One entry per stage attempt. The orchestrator only ever appends; it
//! never reads the ledger back to make decisions (those are made from
//! stage results), keeping this a pure audit trail for observability
//! collaborators.

use creatorflow_shared::LedgerEntry;

/// Per-run attempt log. Each run owns its own instance, so no
/// synchronization is needed across concurrent runs.
#[derive(Debug, Default)]
pub struct ExecutionLedger {
    entries: Vec<LedgerEntry>,
}

impl ExecutionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one attempt record.
    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// All entries, in append order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the ledger for inclusion in the finalized run.
    pub fn into_entries(self) -> Vec<LedgerEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use creatorflow_shared::{StageErrorKind, StageKind, StageStatus};

    fn entry(attempt: u32, status: StageStatus) -> LedgerEntry {
        let now = Utc::now();
        LedgerEntry {
            stage: StageKind::Research,
            attempt,
            status,
            started_at: now,
            ended_at: now,
            error_kind: matches!(status, StageStatus::Failed)
                .then_some(StageErrorKind::Provider),
        }
    }

    #[test]
    fn retries_append_rather_than_overwrite() {
        let mut ledger = ExecutionLedger::new();
        assert!(ledger.is_empty());

        ledger.append(entry(1, StageStatus::Failed));
        ledger.append(entry(2, StageStatus::Succeeded));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[0].attempt, 1);
        assert_eq!(ledger.entries()[0].status, StageStatus::Failed);
        assert_eq!(ledger.entries()[1].attempt, 2);
        assert_eq!(ledger.entries()[1].status, StageStatus::Succeeded);

        let entries = ledger.into_entries();
        assert_eq!(entries.len(), 2);
    }
}
