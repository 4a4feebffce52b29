use chrono::{DateTime, Utc};
use facility_ops::workflows::reconciliation::store::sort_by_keys;
use facility_ops::workflows::reconciliation::{
    BusinessFinancials, BusinessId, ChangeLogError, ChangeLogSink, ChangeRecord, CostChange,
    CostChangeApplied, CostLine, RecordStore, SortKey, StoreError, WorkItem, WorkItemFilter,
    WorkItemId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local stand-in for the managed database.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRecordStore {
    work_items: Arc<Mutex<HashMap<WorkItemId, WorkItem>>>,
    businesses: Arc<Mutex<HashMap<BusinessId, BusinessFinancials>>>,
}

impl InMemoryRecordStore {
    pub(crate) fn seeded(work_items: Vec<WorkItem>, businesses: Vec<BusinessFinancials>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.work_items.lock().expect("work item mutex poisoned");
            guard.extend(work_items.into_iter().map(|item| (item.id.clone(), item)));
        }
        {
            let mut guard = store.businesses.lock().expect("business mutex poisoned");
            guard.extend(
                businesses
                    .into_iter()
                    .map(|business| (business.business_id.clone(), business)),
            );
        }
        store
    }

    pub(crate) fn business_ids(&self) -> Vec<BusinessId> {
        let guard = self.businesses.lock().expect("business mutex poisoned");
        let mut ids: Vec<BusinessId> = guard.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl RecordStore for InMemoryRecordStore {
    fn select_active(
        &self,
        filter: &WorkItemFilter,
        sort_keys: &[SortKey],
    ) -> Result<Vec<WorkItem>, StoreError> {
        let guard = self.work_items.lock().expect("work item mutex poisoned");
        let mut items: Vec<WorkItem> = guard
            .values()
            .filter(|item| item.is_live() && filter.matches(item))
            .cloned()
            .collect();
        sort_by_keys(&mut items, sort_keys);
        Ok(items)
    }

    fn soft_delete_by_id(&self, id: &WorkItemId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut guard = self.work_items.lock().expect("work item mutex poisoned");
        let item = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        item.is_deleted = true;
        item.updated_at = Some(at);
        Ok(())
    }

    fn read_business_financials(
        &self,
        id: &BusinessId,
    ) -> Result<Option<BusinessFinancials>, StoreError> {
        let guard = self.businesses.lock().expect("business mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn apply_cost_change(
        &self,
        id: &BusinessId,
        change: &CostChange,
    ) -> Result<CostChangeApplied, StoreError> {
        let mut guard = self.businesses.lock().expect("business mutex poisoned");
        let business = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        let existing = business
            .costs
            .iter()
            .position(|line| line.matches(change.kind(), change.label()));

        match (change, existing) {
            (CostChange::Add { kind, label, amount }, None) => {
                business.costs.push(CostLine {
                    kind: *kind,
                    label: label.clone(),
                    amount: *amount,
                });
                Ok(CostChangeApplied {
                    before: None,
                    after: Some(*amount),
                })
            }
            (CostChange::Add { .. }, Some(_)) => Err(StoreError::Conflict),
            (CostChange::Update { amount, .. }, Some(index)) => {
                let line = &mut business.costs[index];
                let before = line.amount;
                line.amount = *amount;
                Ok(CostChangeApplied {
                    before: Some(before),
                    after: Some(*amount),
                })
            }
            (CostChange::Delete { .. }, Some(index)) => {
                let removed = business.costs.remove(index);
                Ok(CostChangeApplied {
                    before: Some(removed.amount),
                    after: None,
                })
            }
            (CostChange::Update { .. } | CostChange::Delete { .. }, None) => {
                Err(StoreError::NotFound)
            }
        }
    }
}

/// Keeps change records in memory and mirrors them to the log.
#[derive(Default, Clone)]
pub(crate) struct InMemoryChangeLog {
    records: Arc<Mutex<Vec<ChangeRecord>>>,
}

impl ChangeLogSink for InMemoryChangeLog {
    fn append(&self, record: &ChangeRecord) -> Result<(), ChangeLogError> {
        info!(
            business_id = %record.business_id,
            author = %record.author_name,
            "{}",
            record.description
        );
        let mut guard = self.records.lock().expect("change log mutex poisoned");
        guard.push(record.clone());
        Ok(())
    }
}

impl InMemoryChangeLog {
    pub(crate) fn records(&self) -> Vec<ChangeRecord> {
        self.records.lock().expect("change log mutex poisoned").clone()
    }
}
