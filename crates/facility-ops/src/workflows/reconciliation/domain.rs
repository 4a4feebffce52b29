use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::payments::coerce_amount;

/// Whole currency units. KRW carries no minor unit.
pub type Amount = i64;

/// Identifier wrapper for work-item records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub String);

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier wrapper for business records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessId(pub String);

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A trackable unit of operational work tied to a business and a task type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: WorkItemId,
    /// Legacy rows may carry no business name; grouping treats that as `""`.
    #[serde(default)]
    pub business_name: Option<String>,
    pub task_type: String,
    pub status: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub is_active: bool,
    pub is_deleted: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    pub fn business_name_or_empty(&self) -> &str {
        self.business_name.as_deref().unwrap_or("")
    }

    pub fn is_live(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}

/// Payment columns as stored on legacy business rows. Values are kept raw because
/// older records mix numbers, formatted strings, and nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFields {
    #[serde(default)]
    pub subsidy_first_installment: Option<Value>,
    #[serde(default)]
    pub subsidy_second_installment: Option<Value>,
    #[serde(default)]
    pub subsidy_additional: Option<Value>,
    #[serde(default)]
    pub self_pay_advance: Option<Value>,
    #[serde(default)]
    pub self_pay_balance: Option<Value>,
}

/// Cost categories that trigger change recording when mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostKind {
    OperatingCost,
    SurveyFee,
    AsCost,
    CustomCost,
}

impl CostKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OperatingCost => "operating cost",
            Self::SurveyFee => "survey fee",
            Self::AsCost => "A/S cost",
            Self::CustomCost => "custom cost",
        }
    }
}

/// A single cost line on a business record. Custom costs are distinguished by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLine {
    pub kind: CostKind,
    #[serde(default)]
    pub label: Option<String>,
    pub amount: Amount,
}

impl CostLine {
    pub fn matches(&self, kind: CostKind, label: Option<&str>) -> bool {
        self.kind == kind && self.label.as_deref() == label
    }
}

/// Financial view of a business as read from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessFinancials {
    pub business_id: BusinessId,
    #[serde(default)]
    pub business_name: String,
    pub progress_status: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub installation_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_revenue_with_tax: Amount,
    #[serde(default)]
    pub payments: PaymentFields,
    #[serde(default)]
    pub costs: Vec<CostLine>,
}

impl BusinessFinancials {
    pub fn total_costs(&self) -> Amount {
        self.costs
            .iter()
            .fold(0, |total: Amount, line| total.saturating_add(line.amount))
    }
}

/// Legacy revenue cells may be formatted text, floats or null; all of them read as an amount.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(coerce_amount(raw.as_ref()))
}

/// Blank or unreadable installation dates mean "not installed". Timestamps keep their date part.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::String(text)) = raw else {
        return Ok(None);
    };

    let text = text.trim();
    let parsed = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|timestamp| timestamp.date_naive())
    });
    Ok(parsed)
}
