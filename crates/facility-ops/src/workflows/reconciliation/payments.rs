use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{Amount, PaymentFields};

/// Progress-status substring that selects the subsidy payment schedule.
pub const SUBSIDY_MARKER: &str = "보조금";

/// Mutually exclusive payment schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSeries {
    /// First installment, second installment, additional.
    Subsidy,
    /// Advance and balance.
    SelfPay,
}

impl PaymentSeries {
    pub fn classify(progress_status: &str) -> Self {
        if progress_status.contains(SUBSIDY_MARKER) {
            Self::Subsidy
        } else {
            Self::SelfPay
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Subsidy => "subsidy",
            Self::SelfPay => "self-pay",
        }
    }
}

/// Total received under the schedule the progress status selects.
pub fn sum_payments(progress_status: &str, fields: &PaymentFields) -> Amount {
    let applicable: Vec<&Option<Value>> = match PaymentSeries::classify(progress_status) {
        PaymentSeries::Subsidy => vec![
            &fields.subsidy_first_installment,
            &fields.subsidy_second_installment,
            &fields.subsidy_additional,
        ],
        PaymentSeries::SelfPay => vec![&fields.self_pay_advance, &fields.self_pay_balance],
    };

    applicable
        .into_iter()
        .map(|value| coerce_amount(value.as_ref()))
        .fold(0, Amount::saturating_add)
}

/// Reads a legacy payment cell. Anything that is not a finite number or a numeric string is 0.
pub fn coerce_amount(value: Option<&Value>) -> Amount {
    match value {
        Some(Value::Number(number)) => {
            if let Some(whole) = number.as_i64() {
                whole
            } else {
                number.as_f64().map_or(0, float_to_amount)
            }
        }
        Some(Value::String(raw)) => parse_amount_text(raw),
        _ => 0,
    }
}

fn parse_amount_text(raw: &str) -> Amount {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('원')
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return 0;
    }

    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().map(float_to_amount))
        .unwrap_or(0)
}

fn float_to_amount(value: f64) -> Amount {
    if value.is_finite() {
        // `as` saturates at the i64 bounds.
        value.round() as Amount
    } else {
        0
    }
}
