use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use crate::workflows::reconciliation::change_log::{
    ChangeLogError, ChangeLogSink, ChangeRecord, ChangeRecorder, RetryPolicy, Sleeper,
};
use crate::workflows::reconciliation::domain::{
    BusinessFinancials, BusinessId, CostKind, CostLine, PaymentFields, WorkItem, WorkItemId,
};
use crate::workflows::reconciliation::store::{
    sort_by_keys, CostChange, CostChangeApplied, RecordStore, SortKey, StoreError,
    WorkItemFilter,
};
use crate::workflows::reconciliation::ReconciliationService;

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn item(
    id: &str,
    business: &str,
    task_type: &str,
    status: &str,
    created_at: DateTime<Utc>,
) -> WorkItem {
    WorkItem {
        id: WorkItemId(id.to_string()),
        business_name: Some(business.to_string()),
        task_type: task_type.to_string(),
        status: status.to_string(),
        title: format!("{task_type} follow-up"),
        created_at,
        assignee: None,
        due_date: None,
        is_active: true,
        is_deleted: false,
        updated_at: None,
    }
}

pub(super) fn installed_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

pub(super) fn subsidy_business() -> BusinessFinancials {
    BusinessFinancials {
        business_id: BusinessId("biz-subsidy".to_string()),
        business_name: "Hanbit Clinic".to_string(),
        progress_status: "보조금-series".to_string(),
        installation_date: Some(installed_on()),
        total_revenue_with_tax: 1_100_000,
        payments: PaymentFields {
            subsidy_first_installment: Some(json!(300_000)),
            subsidy_second_installment: Some(json!("200,000")),
            subsidy_additional: Some(json!(100_000)),
            self_pay_advance: Some(json!(999_999)),
            self_pay_balance: Some(json!(999_999)),
        },
        costs: vec![CostLine {
            kind: CostKind::OperatingCost,
            label: None,
            amount: 120_000,
        }],
    }
}

pub(super) fn self_pay_business() -> BusinessFinancials {
    BusinessFinancials {
        business_id: BusinessId("biz-self".to_string()),
        business_name: "Daeil Logistics".to_string(),
        progress_status: "자부담-series".to_string(),
        installation_date: None,
        total_revenue_with_tax: 500_000,
        payments: PaymentFields {
            subsidy_first_installment: Some(json!(400_000)),
            self_pay_advance: Some(json!(100_000)),
            self_pay_balance: Some(Value::Null),
            ..PaymentFields::default()
        },
        costs: Vec::new(),
    }
}

#[derive(Default)]
struct MemoryState {
    items: BTreeMap<WorkItemId, WorkItem>,
    businesses: BTreeMap<BusinessId, BusinessFinancials>,
}

/// In-memory store; ids listed in `poisoned` fail with `Unavailable`.
#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    poisoned: Arc<Mutex<HashSet<WorkItemId>>>,
}

impl MemoryStore {
    pub(super) fn with_items(items: Vec<WorkItem>) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().expect("store mutex poisoned");
            for item in items {
                state.items.insert(item.id.clone(), item);
            }
        }
        store
    }

    pub(super) fn insert_business(&self, financials: BusinessFinancials) {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .businesses
            .insert(financials.business_id.clone(), financials);
    }

    pub(super) fn poison(&self, id: &str) {
        self.poisoned
            .lock()
            .expect("poison mutex poisoned")
            .insert(WorkItemId(id.to_string()));
    }

    pub(super) fn get(&self, id: &str) -> Option<WorkItem> {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .items
            .get(&WorkItemId(id.to_string()))
            .cloned()
    }

    pub(super) fn business(&self, id: &str) -> Option<BusinessFinancials> {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .businesses
            .get(&BusinessId(id.to_string()))
            .cloned()
    }
}

impl RecordStore for MemoryStore {
    fn select_active(
        &self,
        filter: &WorkItemFilter,
        sort_keys: &[SortKey],
    ) -> Result<Vec<WorkItem>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut items: Vec<WorkItem> = state
            .items
            .values()
            .filter(|item| item.is_live() && filter.matches(item))
            .cloned()
            .collect();
        sort_by_keys(&mut items, sort_keys);
        Ok(items)
    }

    fn soft_delete_by_id(&self, id: &WorkItemId, at: DateTime<Utc>) -> Result<(), StoreError> {
        if self
            .poisoned
            .lock()
            .expect("poison mutex poisoned")
            .contains(id)
        {
            return Err(StoreError::Unavailable("row locked".to_string()));
        }

        let mut state = self.state.lock().expect("store mutex poisoned");
        let item = state.items.get_mut(id).ok_or(StoreError::NotFound)?;
        item.is_deleted = true;
        item.updated_at = Some(at);
        Ok(())
    }

    fn read_business_financials(
        &self,
        id: &BusinessId,
    ) -> Result<Option<BusinessFinancials>, StoreError> {
        Ok(self
            .state
            .lock()
            .expect("store mutex poisoned")
            .businesses
            .get(id)
            .cloned())
    }

    fn apply_cost_change(
        &self,
        id: &BusinessId,
        change: &CostChange,
    ) -> Result<CostChangeApplied, StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let business = state.businesses.get_mut(id).ok_or(StoreError::NotFound)?;
        let position = business
            .costs
            .iter()
            .position(|line| line.matches(change.kind(), change.label()));

        match (change, position) {
            (CostChange::Add { .. }, Some(_)) => Err(StoreError::Conflict),
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
            (CostChange::Update { amount, .. }, Some(index)) => {
                let before = business.costs[index].amount;
                business.costs[index].amount = *amount;
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
            (_, None) => Err(StoreError::NotFound),
        }
    }
}

/// Store whose every call fails, for whole-request error paths.
pub(super) struct UnavailableStore;

impl RecordStore for UnavailableStore {
    fn select_active(
        &self,
        _filter: &WorkItemFilter,
        _sort_keys: &[SortKey],
    ) -> Result<Vec<WorkItem>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn soft_delete_by_id(&self, _id: &WorkItemId, _at: DateTime<Utc>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn read_business_financials(
        &self,
        _id: &BusinessId,
    ) -> Result<Option<BusinessFinancials>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn apply_cost_change(
        &self,
        _id: &BusinessId,
        _change: &CostChange,
    ) -> Result<CostChangeApplied, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Sink that fails the first `failures` appends, then accepts.
#[derive(Default)]
pub(super) struct FlakySink {
    failures: Mutex<u32>,
    attempts: Mutex<u32>,
    records: Mutex<Vec<ChangeRecord>>,
}

impl FlakySink {
    pub(super) fn failing(failures: u32) -> Self {
        Self {
            failures: Mutex::new(failures),
            ..Self::default()
        }
    }

    pub(super) fn attempts(&self) -> u32 {
        *self.attempts.lock().expect("sink mutex poisoned")
    }

    pub(super) fn records(&self) -> Vec<ChangeRecord> {
        self.records.lock().expect("sink mutex poisoned").clone()
    }
}

impl ChangeLogSink for FlakySink {
    fn append(&self, record: &ChangeRecord) -> Result<(), ChangeLogError> {
        *self.attempts.lock().expect("sink mutex poisoned") += 1;

        let mut failures = self.failures.lock().expect("sink mutex poisoned");
        if *failures > 0 {
            *failures -= 1;
            return Err(ChangeLogError::Unavailable("audit table locked".to_string()));
        }

        self.records
            .lock()
            .expect("sink mutex poisoned")
            .push(record.clone());
        Ok(())
    }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub(super) struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(super) fn delays(&self) -> Vec<Duration> {
        self.delays.lock().expect("sleeper mutex poisoned").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays
            .lock()
            .expect("sleeper mutex poisoned")
            .push(duration);
    }
}

pub(super) fn retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(250),
    }
}

pub(super) type TestService = ReconciliationService<MemoryStore, FlakySink, RecordingSleeper>;

pub(super) fn build_service(
    store: MemoryStore,
    sink_failures: u32,
) -> (TestService, Arc<MemoryStore>, Arc<FlakySink>) {
    let store = Arc::new(store);
    let sink = Arc::new(FlakySink::failing(sink_failures));
    let recorder = ChangeRecorder::with_sleeper(
        sink.clone(),
        Arc::new(RecordingSleeper::default()),
        retry_policy(),
    );
    let service = ReconciliationService::with_recorder(store.clone(), recorder);
    (service, store, sink)
}

pub(super) fn ids(values: &[&str]) -> Vec<WorkItemId> {
    values
        .iter()
        .map(|value| WorkItemId(value.to_string()))
        .collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
