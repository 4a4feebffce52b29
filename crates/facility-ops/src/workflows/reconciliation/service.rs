use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::change_log::{
    describe_cost_change, ChangeAction, ChangeLogSink, ChangeRecord, ChangeRecorder,
    RecordingOutcome, RetryPolicy, Sleeper, ThreadSleeper,
};
use super::deletion::{BatchSoftDeleter, DeletionSummary};
use super::domain::{BusinessFinancials, BusinessId, WorkItemId};
use super::grouping::{select_duplicates, sort_for_grouping, DuplicateGroup};
use super::receivables::{receivable_for, ReceivableView, ReceivablesOverview};
use super::report::DuplicatesReport;
use super::store::{CostChange, CostChangeApplied, RecordStore, SortKey, StoreError, WorkItemFilter};

/// Service composing the store, the dedup pipeline, receivables, and change recording.
pub struct ReconciliationService<S, L, Z = ThreadSleeper> {
    store: Arc<S>,
    deleter: BatchSoftDeleter<S>,
    recorder: ChangeRecorder<L, Z>,
}

impl<S, L> ReconciliationService<S, L, ThreadSleeper>
where
    S: RecordStore + 'static,
    L: ChangeLogSink + 'static,
{
    pub fn new(store: Arc<S>, change_log: Arc<L>, policy: RetryPolicy) -> Self {
        Self::with_recorder(store, ChangeRecorder::new(change_log, policy))
    }
}

impl<S, L, Z> ReconciliationService<S, L, Z>
where
    S: RecordStore + 'static,
    L: ChangeLogSink + 'static,
    Z: Sleeper + 'static,
{
    pub fn with_recorder(store: Arc<S>, recorder: ChangeRecorder<L, Z>) -> Self {
        let deleter = BatchSoftDeleter::new(store.clone());
        Self {
            store,
            deleter,
            recorder,
        }
    }

    /// Duplicate groups among the live items matching `filter`.
    pub fn duplicates(
        &self,
        filter: &WorkItemFilter,
    ) -> Result<Vec<DuplicateGroup>, ReconciliationError> {
        let mut items = self.store.select_active(filter, &SortKey::GROUPING)?;
        // Stores are not trusted to honour the ordering or the live-only contract.
        items.retain(|item| item.is_live());
        sort_for_grouping(&mut items);
        Ok(select_duplicates(items))
    }

    pub fn duplicates_report(
        &self,
        filter: &WorkItemFilter,
    ) -> Result<DuplicatesReport, ReconciliationError> {
        let groups = self.duplicates(filter)?;
        Ok(DuplicatesReport::from_groups(&groups))
    }

    /// Soft-deletes every member that is not the retained record of its group.
    pub fn resolve_duplicates(
        &self,
        filter: &WorkItemFilter,
    ) -> Result<DeletionSummary, ReconciliationError> {
        let report = self.duplicates_report(filter)?;
        let candidates = report.deletion_candidates();
        if candidates.is_empty() {
            return Ok(DeletionSummary::empty());
        }

        let summary = self.deleter.soft_delete(&candidates)?;
        info!(
            groups = report.summary.total_groups,
            deleted = summary.success_count(),
            failed = summary.failed_count(),
            "duplicate work items resolved"
        );
        Ok(summary)
    }

    pub fn soft_delete(&self, ids: &[WorkItemId]) -> Result<DeletionSummary, ReconciliationError> {
        self.deleter.soft_delete(ids)
    }

    pub fn receivable(&self, id: &BusinessId) -> Result<ReceivableView, ReconciliationError> {
        let financials = self.financials(id)?;
        Ok(receivable_for(&financials))
    }

    /// Receivables for `ids`; unknown businesses are listed under `missing`.
    pub fn receivables_overview(
        &self,
        ids: &[BusinessId],
    ) -> Result<ReceivablesOverview, ReconciliationError> {
        let mut views = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            match self.store.read_business_financials(id)? {
                Some(financials) => views.push(receivable_for(&financials)),
                None => {
                    warn!(business_id = %id, "business missing from receivables overview");
                    missing.push(id.clone());
                }
            }
        }

        Ok(ReceivablesOverview::new(views, missing))
    }

    /// Applies a cost change, then records it. Only the primary write can fail the call.
    pub fn apply_cost_change(
        &self,
        id: &BusinessId,
        change: CostChange,
        author: &str,
    ) -> Result<CostChangeReport, ReconciliationError> {
        let author = author.trim();
        if author.is_empty() {
            return Err(ReconciliationError::MissingAuthor);
        }

        self.financials(id)?;
        let applied = self.store.apply_cost_change(id, &change)?;

        let action = match change {
            CostChange::Add { .. } => ChangeAction::Added,
            CostChange::Update { .. } => ChangeAction::Updated,
            CostChange::Delete { .. } => ChangeAction::Deleted,
        };
        let record = ChangeRecord {
            business_id: id.clone(),
            change_type: change.kind(),
            action,
            before: applied.before,
            after: applied.after,
            description: describe_cost_change(
                change.kind(),
                change.label(),
                action,
                applied.before,
                applied.after,
            ),
            author_name: author.to_string(),
            recorded_at: Utc::now(),
        };

        let audit = self.recorder.record(&record);
        Ok(CostChangeReport {
            applied,
            description: record.description,
            audit,
        })
    }

    fn financials(&self, id: &BusinessId) -> Result<BusinessFinancials, ReconciliationError> {
        self.store
            .read_business_financials(id)?
            .ok_or_else(|| ReconciliationError::BusinessNotFound(id.clone()))
    }
}

/// Outcome of a cost mutation: the committed write plus the change-record status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostChangeReport {
    pub applied: CostChangeApplied,
    pub description: String,
    pub audit: RecordingOutcome,
}

/// Error raised by the reconciliation service.
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error("at least one work item id is required")]
    EmptyBatch,
    #[error("an author name is required for cost changes")]
    MissingAuthor,
    #[error("business {0} not found")]
    BusinessNotFound(BusinessId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconciliationError {
    /// Errors caused by the request itself rather than the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ReconciliationError::EmptyBatch | ReconciliationError::MissingAuthor
        )
    }
}
