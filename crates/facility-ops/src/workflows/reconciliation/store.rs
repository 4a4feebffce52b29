use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Amount, BusinessFinancials, BusinessId, CostKind, WorkItem, WorkItemId};

/// Narrowing applied on top of the store's implicit active/non-deleted filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemFilter {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
}

impl WorkItemFilter {
    pub fn matches(&self, item: &WorkItem) -> bool {
        let business_ok = self
            .business_name
            .as_deref()
            .map_or(true, |name| item.business_name_or_empty() == name);
        let task_ok = self
            .task_type
            .as_deref()
            .map_or(true, |task_type| item.task_type == task_type);
        business_ok && task_ok
    }
}

/// Sort columns understood by [`RecordStore::select_active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    BusinessName,
    TaskType,
    Status,
    CreatedAt,
    Id,
}

impl SortKey {
    /// Ordering used before duplicate grouping so runs are reproducible.
    pub const GROUPING: [SortKey; 5] = [
        SortKey::BusinessName,
        SortKey::TaskType,
        SortKey::Status,
        SortKey::CreatedAt,
        SortKey::Id,
    ];

    fn compare(self, left: &WorkItem, right: &WorkItem) -> Ordering {
        match self {
            SortKey::BusinessName => left
                .business_name_or_empty()
                .cmp(right.business_name_or_empty()),
            SortKey::TaskType => left.task_type.cmp(&right.task_type),
            SortKey::Status => left.status.cmp(&right.status),
            SortKey::CreatedAt => left.created_at.cmp(&right.created_at),
            SortKey::Id => left.id.cmp(&right.id),
        }
    }
}

/// Stable multi-key ascending sort.
pub fn sort_by_keys(items: &mut [WorkItem], keys: &[SortKey]) {
    items.sort_by(|left, right| {
        keys.iter()
            .map(|key| key.compare(left, right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

/// Primary write applied to a business's cost lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum CostChange {
    Add {
        kind: CostKind,
        #[serde(default)]
        label: Option<String>,
        amount: Amount,
    },
    Update {
        kind: CostKind,
        #[serde(default)]
        label: Option<String>,
        amount: Amount,
    },
    Delete {
        kind: CostKind,
        #[serde(default)]
        label: Option<String>,
    },
}

impl CostChange {
    pub fn kind(&self) -> CostKind {
        match self {
            CostChange::Add { kind, .. }
            | CostChange::Update { kind, .. }
            | CostChange::Delete { kind, .. } => *kind,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            CostChange::Add { label, .. }
            | CostChange::Update { label, .. }
            | CostChange::Delete { label, .. } => label.as_deref(),
        }
    }
}

/// Before/after values reported by the store once a cost change is durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostChangeApplied {
    pub before: Option<Amount>,
    pub after: Option<Amount>,
}

/// Storage abstraction over the managed database so the engine can be exercised in isolation.
///
/// Every method is a single atomic record operation; the engine never holds a transaction
/// across calls.
pub trait RecordStore: Send + Sync {
    /// Active, non-deleted work items narrowed by `filter`, ordered by `sort_keys`.
    fn select_active(
        &self,
        filter: &WorkItemFilter,
        sort_keys: &[SortKey],
    ) -> Result<Vec<WorkItem>, StoreError>;

    /// Sets `is_deleted` and the last-modified timestamp. Already-deleted records succeed.
    fn soft_delete_by_id(&self, id: &WorkItemId, at: DateTime<Utc>) -> Result<(), StoreError>;

    fn read_business_financials(
        &self,
        id: &BusinessId,
    ) -> Result<Option<BusinessFinancials>, StoreError>;

    fn apply_cost_change(
        &self,
        id: &BusinessId,
        change: &CostChange,
    ) -> Result<CostChangeApplied, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
