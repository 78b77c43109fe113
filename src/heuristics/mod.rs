// src/heuristics/mod.rs

mod generic;

use serde::Deserialize;
use serde::Serialize;

/// Policy metadata pulled from an insurance letter with fixed keyword
/// patterns, no rule sheet needed. Dates are normalised to ISO `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyData {
    pub policy_no: Option<String>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub vehicle_no: Option<String>,
}

impl PolicyData {
    /// How many fields were successfully extracted (out of the scalar ones).
    pub fn coverage(&self) -> (usize, usize) {
        let total = 4;
        let filled = [
            self.policy_no.is_some(),
            self.period_start.is_some(),
            self.period_end.is_some(),
            self.vehicle_no.is_some(),
        ]
        .iter()
        .filter(|&&v| v)
        .count();
        (filled, total)
    }
}

/// Outcome of comparing a receipt total against its payment-proof total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Reconciliation {
    /// Both sides parsed and agree; carries the agreed amount.
    Matched(f64),
    /// Both sides parsed but disagree.
    Mismatch { receipt: f64, payment: f64 },
    /// One or both totals were missing or non-numeric.
    Incomparable,
}

/// Extract policy metadata from raw OCR text.
pub fn extract_policy(text: &str) -> PolicyData {
    generic::extract(text)
}

/// Clean a printed amount ("RM 1,234.50") down to a number, if it is one.
pub fn parse_amount(raw: &str) -> Option<f64> {
    generic::parse_amount(raw)
}

/// Compare the totals of a receipt/payment-proof pair.
pub fn reconcile_pair(receipt_total: &str, payment_total: &str) -> Reconciliation {
    let (Some(r), Some(p)) = (parse_amount(receipt_total), parse_amount(payment_total)) else {
        return Reconciliation::Incomparable;
    };
    if (r - p).abs() < 0.005 {
        Reconciliation::Matched(r)
    } else {
        Reconciliation::Mismatch {
            receipt: r,
            payment: p,
        }
    }
}
