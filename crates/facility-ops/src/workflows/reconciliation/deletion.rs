use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::WorkItemId;
use super::service::ReconciliationError;
use super::store::RecordStore;

/// Result of one soft-delete attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    Succeeded,
    Failed(String),
}

impl DeletionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeletionOutcome::Succeeded)
    }
}

/// Failed identifier with the store's reason, in the caller-facing shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionError {
    pub id: WorkItemId,
    pub error: String,
}

/// Aggregate of a batch. Counts are derived once from the per-item outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSummary {
    #[serde(rename = "success")]
    success_count: usize,
    #[serde(rename = "failed")]
    failed_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    errors: Vec<DeletionError>,
}

impl DeletionSummary {
    pub fn from_outcomes(outcomes: Vec<(WorkItemId, DeletionOutcome)>) -> Self {
        let mut success_count = 0;
        let mut errors = Vec::new();
        for (id, outcome) in outcomes {
            match outcome {
                DeletionOutcome::Succeeded => success_count += 1,
                DeletionOutcome::Failed(error) => errors.push(DeletionError { id, error }),
            }
        }

        Self {
            success_count,
            failed_count: errors.len(),
            errors,
        }
    }

    pub fn empty() -> Self {
        Self::from_outcomes(Vec::new())
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn errors(&self) -> &[DeletionError] {
        &self.errors
    }
}

/// Applies soft-deletes one record at a time. A failure on one id never affects another.
pub struct BatchSoftDeleter<S> {
    store: Arc<S>,
}

impl<S> BatchSoftDeleter<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn soft_delete(&self, ids: &[WorkItemId]) -> Result<DeletionSummary, ReconciliationError> {
        self.soft_delete_at(ids, Utc::now())
    }

    /// Same as [`soft_delete`](Self::soft_delete) with an explicit last-modified stamp.
    pub fn soft_delete_at(
        &self,
        ids: &[WorkItemId],
        at: DateTime<Utc>,
    ) -> Result<DeletionSummary, ReconciliationError> {
        if ids.is_empty() {
            return Err(ReconciliationError::EmptyBatch);
        }

        let outcomes = ids
            .iter()
            .map(|id| (id.clone(), self.delete_one(id, at)))
            .collect();
        let summary = DeletionSummary::from_outcomes(outcomes);

        debug!(
            requested = ids.len(),
            succeeded = summary.success_count(),
            failed = summary.failed_count(),
            "batch soft-delete finished"
        );
        Ok(summary)
    }

    fn delete_one(&self, id: &WorkItemId, at: DateTime<Utc>) -> DeletionOutcome {
        if id.0.trim().is_empty() {
            return DeletionOutcome::Failed("identifier is blank".to_string());
        }

        match self.store.soft_delete_by_id(id, at) {
            Ok(()) => DeletionOutcome::Succeeded,
            Err(err) => {
                warn!(%id, error = %err, "soft-delete failed");
                DeletionOutcome::Failed(err.to_string())
            }
        }
    }
}
