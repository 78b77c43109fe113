use crate::entities::SummaryField;
use crate::heuristics;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::info;

/// One row of the expense inventory. Header names match the sheet the
/// finance side already imports, so changing them breaks their workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Amount (MYR)")]
    pub amount_myr: f64,
    #[serde(rename = "Payment Method")]
    pub payment_method: String,
    #[serde(rename = "Tax Code")]
    pub tax_code: String,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl ExpenseRecord {
    /// Build an inventory row from a vendor entity summary. Anything the
    /// summary could not supply gets the placeholder the sheet expects.
    pub fn from_summary(summary: &BTreeMap<String, SummaryField>) -> Self {
        let field = |name: &str| summary.get(name).map(|f| f.value.clone()).unwrap_or_default();

        let date = {
            let d = field("invoice_date");
            if d.is_empty() {
                Utc::now().format("%Y-%m-%d").to_string()
            } else {
                d
            }
        };

        Self {
            date,
            vendor: field("brand_name"),
            description: "Parsed from receipt".to_string(),
            category: "Uncategorized".to_string(),
            amount_myr: heuristics::parse_amount(&field("invoice_total")).unwrap_or(0.0),
            payment_method: "Unknown".to_string(),
            tax_code: "Unknown".to_string(),
            notes: "Auto-parsed".to_string(),
        }
    }
}

/// Append one record to the inventory CSV, writing the header row only when
/// the file does not exist yet. Last writer wins; there is no locking.
pub fn append(path: impl AsRef<Path>, record: &ExpenseRecord) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.as_ref();
    let exists = path.exists();

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;

    info!(path = %path.display(), vendor = %record.vendor, "Inventory row appended");
    Ok(())
}

/// Read the whole inventory back. No inventory file yet means no rows.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<ExpenseRecord>, Box<dyn std::error::Error>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in rdr.deserialize::<ExpenseRecord>() {
        records.push(row?);
    }
    Ok(records)
}

/// Pretty JSON of the full inventory, for download/export.
pub fn export_json(records: &[ExpenseRecord]) -> Result<String, Box<dyn std::error::Error>> {
    Ok(serde_json::to_string_pretty(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SummaryField;

    fn record(vendor: &str, amount: f64) -> ExpenseRecord {
        ExpenseRecord {
            date: "2025-09-20".to_string(),
            vendor: vendor.to_string(),
            description: "Client transport".to_string(),
            category: "Travel".to_string(),
            amount_myr: amount,
            payment_method: "Credit Card".to_string(),
            tax_code: "SST".to_string(),
            notes: "Meeting".to_string(),
        }
    }

    fn temp_csv(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("inventory_{tag}_{}.csv", std::process::id()))
    }

    #[test]
    fn append_writes_header_once() {
        let path = temp_csv("header");
        let _ = std::fs::remove_file(&path);

        append(&path, &record("Grab", 45.0)).unwrap();
        append(&path, &record("Shopee", 120.0)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Amount (MYR)").count(), 1);

        let records = read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].vendor, "Shopee");
        assert_eq!(records[1].amount_myr, 120.0);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn summary_row_fills_placeholders() {
        let mut summary = BTreeMap::new();
        summary.insert(
            "invoice_date".to_string(),
            SummaryField {
                value: "2025-09-20".to_string(),
                source: "receipt_date".to_string(),
            },
        );
        summary.insert(
            "brand_name".to_string(),
            SummaryField {
                value: "Starbucks".to_string(),
                source: "brand_name".to_string(),
            },
        );
        summary.insert(
            "invoice_total".to_string(),
            SummaryField {
                value: "RM 18.50".to_string(),
                source: "receipt_total".to_string(),
            },
        );

        let rec = ExpenseRecord::from_summary(&summary);
        assert_eq!(rec.date, "2025-09-20");
        assert_eq!(rec.vendor, "Starbucks");
        assert_eq!(rec.amount_myr, 18.5);
        assert_eq!(rec.category, "Uncategorized");
        assert_eq!(rec.notes, "Auto-parsed");
    }

    #[test]
    fn missing_inventory_reads_as_empty() {
        let path = temp_csv("missing");
        let _ = std::fs::remove_file(&path);

        let records = read_all(&path).unwrap();
        assert!(records.is_empty());
        assert_eq!(export_json(&records).unwrap(), "[]");
    }

    #[test]
    fn json_export_round_trips() {
        let json = export_json(&[record("Grab", 45.0)]).unwrap();
        let back: Vec<ExpenseRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0].vendor, "Grab");
    }
}
