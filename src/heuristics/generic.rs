use super::PolicyData;
use chrono::NaiveDate;
use regex::Regex;

/// Main extraction entry point — uses keyword-anchored regex patterns.
pub fn extract(text: &str) -> PolicyData {
    PolicyData {
        policy_no: extract_policy_no(text),
        period_start: extract_period_start(text),
        period_end: extract_period_end(text),
        vehicle_no: extract_vehicle_no(text),
    }
}

// ---------------------------------------------------------------------------
// Scalar field extractors
// ---------------------------------------------------------------------------

fn extract_policy_no(text: &str) -> Option<String> {
    // Matches "Policy No" followed by optional punctuation then the value
    let re = Regex::new(r"(?i)Policy\s*No[:\s]*([A-Z0-9]+)").ok()?;
    re.captures(text).map(|c| c[1].trim().to_string())
}

fn extract_period_start(text: &str) -> Option<String> {
    // "from 12 Mar 2025" — cover letters print the period in prose
    let re = Regex::new(r"(?i)from\s*(\d{1,2}\s*\w+\s*\d{4})").ok()?;
    let cap = re.captures(text)?;
    normalise_date(cap[1].trim())
}

fn extract_period_end(text: &str) -> Option<String> {
    let re = Regex::new(r"(?i)to\s*(\d{1,2}\s*\w+\s*\d{4})").ok()?;
    let cap = re.captures(text)?;
    normalise_date(cap[1].trim())
}

fn extract_vehicle_no(text: &str) -> Option<String> {
    let re = Regex::new(r"(?i)Vehicle\s*No[:\s]*([A-Z0-9]+)").ok()?;
    re.captures(text).map(|c| c[1].trim().to_string())
}

/// Parse "12 Mar 2025" into ISO form. Unparseable dates are dropped rather
/// than passed along half-cleaned.
fn normalise_date(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw, "%d %b %Y")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

// ---------------------------------------------------------------------------
// Amount cleanup
// ---------------------------------------------------------------------------

/// Strip the currency marker and thousands separators, then parse.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "").replace("RM", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::{Reconciliation, reconcile_pair};

    const LETTER: &str = "\
COLES CAR INSURANCE
Policy No: CX99821A
Cover runs from 12 Mar 2025 to 11 Mar 2026.
Vehicle No: XYZ123
";

    #[test]
    fn extracts_all_policy_fields() {
        let data = extract(LETTER);
        assert_eq!(data.policy_no.as_deref(), Some("CX99821A"));
        assert_eq!(data.period_start.as_deref(), Some("2025-03-12"));
        assert_eq!(data.period_end.as_deref(), Some("2026-03-11"));
        assert_eq!(data.vehicle_no.as_deref(), Some("XYZ123"));
        assert_eq!(data.coverage(), (4, 4));
    }

    #[test]
    fn garbled_dates_are_dropped() {
        let data = extract("Policy No: AB1\nfrom 99 Xxx 2025 to 11 Mar 2026");
        assert_eq!(data.period_start, None);
        assert_eq!(data.period_end.as_deref(), Some("2026-03-11"));
        assert_eq!(data.coverage(), (2, 4));
    }

    #[test]
    fn amount_cleanup() {
        assert_eq!(parse_amount("RM 1,234.50"), Some(1234.5));
        assert_eq!(parse_amount("45.99"), Some(45.99));
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn reconciliation_outcomes() {
        assert_eq!(
            reconcile_pair("RM 120.00", "120.00"),
            Reconciliation::Matched(120.0)
        );
        assert_eq!(
            reconcile_pair("RM 120.00", "RM 95.50"),
            Reconciliation::Mismatch {
                receipt: 120.0,
                payment: 95.5
            }
        );
        assert_eq!(
            reconcile_pair("pending", "120.00"),
            Reconciliation::Incomparable
        );
    }
}
