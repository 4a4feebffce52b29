use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Amount, BusinessFinancials, BusinessId};
use super::payments::{sum_payments, PaymentSeries};

/// Outstanding amount for one business.
///
/// Revenue is recognized at installation, so nothing is receivable before an installation date
/// exists, whatever the revenue and payment figures say. Overpayment clamps to zero.
pub fn calculate(
    installation_date: Option<NaiveDate>,
    total_revenue_with_tax: Amount,
    total_payments: Amount,
) -> Amount {
    if installation_date.is_none() {
        return 0;
    }

    total_revenue_with_tax
        .saturating_sub(total_payments)
        .max(0)
}

/// Receivable breakdown exposed to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivableView {
    pub business_id: BusinessId,
    pub business_name: String,
    pub progress_status: String,
    pub payment_series: PaymentSeries,
    pub installation_date: Option<NaiveDate>,
    pub total_revenue_with_tax: Amount,
    pub total_payments: Amount,
    pub receivable: Amount,
}

pub fn receivable_for(financials: &BusinessFinancials) -> ReceivableView {
    let total_payments = sum_payments(&financials.progress_status, &financials.payments);
    let receivable = calculate(
        financials.installation_date,
        financials.total_revenue_with_tax,
        total_payments,
    );

    ReceivableView {
        business_id: financials.business_id.clone(),
        business_name: financials.business_name.clone(),
        progress_status: financials.progress_status.clone(),
        payment_series: PaymentSeries::classify(&financials.progress_status),
        installation_date: financials.installation_date,
        total_revenue_with_tax: financials.total_revenue_with_tax,
        total_payments,
        receivable,
    }
}

/// Receivables across several businesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivablesOverview {
    pub businesses: Vec<ReceivableView>,
    pub total_receivable: Amount,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<BusinessId>,
}

impl ReceivablesOverview {
    pub fn new(businesses: Vec<ReceivableView>, missing: Vec<BusinessId>) -> Self {
        let total_receivable = businesses
            .iter()
            .fold(0, |total: Amount, view| total.saturating_add(view.receivable));
        Self {
            businesses,
            total_receivable,
            missing,
        }
    }
}
