//! Work-item reconciliation and receivables.
//!
//! Dedup path: the store's live items are grouped by [`DuplicateKey`], the retention policy keeps
//! the newest member of each group, and the rest go through [`BatchSoftDeleter`], which reports
//! per-item outcomes instead of failing the batch. Receivables are pure functions of a business's
//! financial record. Cost mutations are followed by best-effort change recording.

pub mod change_log;
pub mod deletion;
pub mod domain;
pub mod grouping;
pub mod payments;
pub mod receivables;
pub mod report;
pub mod retention;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use change_log::{
    ChangeAction, ChangeLogError, ChangeLogSink, ChangeRecord, ChangeRecorder, RecordingOutcome,
    RetryPolicy, Sleeper, ThreadSleeper,
};
pub use deletion::{BatchSoftDeleter, DeletionError, DeletionOutcome, DeletionSummary};
pub use domain::{
    Amount, BusinessFinancials, BusinessId, CostKind, CostLine, PaymentFields, WorkItem,
    WorkItemId,
};
pub use grouping::{group, select_duplicates, sort_for_grouping, DuplicateGroup, DuplicateKey};
pub use payments::{sum_payments, PaymentSeries};
pub use receivables::{calculate, receivable_for, ReceivableView, ReceivablesOverview};
pub use report::{DuplicateGroupView, DuplicateMemberView, DuplicatesReport, DuplicatesSummary};
pub use retention::{select_retained, RetentionPlan};
pub use router::reconciliation_router;
pub use service::{CostChangeReport, ReconciliationError, ReconciliationService};
pub use store::{
    CostChange, CostChangeApplied, RecordStore, SortKey, StoreError, WorkItemFilter,
};
