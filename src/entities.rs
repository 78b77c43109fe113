use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// One typed entity from the document-understanding vendor's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub mention_text: String,
    #[serde(default)]
    pub confidence: f64,
}

/// The vendor's parse of one document: full OCR text plus typed entities.
/// This is the JSON artifact the upstream service hands back; the service
/// itself is out of scope here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl ParsedDocument {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let doc: ParsedDocument = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            text_len = doc.text.len(),
            entities = doc.entities.len(),
            "Vendor document loaded"
        );
        Ok(doc)
    }
}

/// Vendor processors label the same field inconsistently across versions.
/// Everything here folds down to the canonical summary field names.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("purchase_date", "invoice_date"),
    ("receipt_date", "invoice_date"),
    ("date_of_receipt", "invoice_date"),
    ("transaction_date", "invoice_date"),
    ("date", "invoice_date"),
    ("receipt_total", "invoice_total"),
    ("total_amount", "invoice_total"),
    ("amount_due", "invoice_total"),
    ("grand_total", "invoice_total"),
    ("final_amount", "invoice_total"),
];

/// Lower-case, hyphens to underscores, then through the alias table.
fn canonical_field(raw: &str) -> String {
    let normalized = raw.replace('-', "_").to_lowercase();
    for (alias, canonical) in FIELD_ALIASES {
        if *alias == normalized {
            return canonical.to_string();
        }
    }
    normalized
}

/// The chosen value for one summary field, plus which raw entity type won.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryField {
    pub value: String,
    pub source: String,
}

/// One competing value for a summary field, kept for the audit trace.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub alias: String,
    pub value: String,
    pub confidence: f64,
}

/// Pick the highest-confidence candidate for each desired field. Fields with
/// no candidates come back empty with source "N/A" so the summary always has
/// a stable shape.
pub fn extract_summary(doc: &ParsedDocument, desired: &[String]) -> BTreeMap<String, SummaryField> {
    let mut summary = BTreeMap::new();
    for field in desired {
        let best = candidates_for(doc, field)
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence));
        let entry = match best {
            Some(c) => SummaryField {
                value: c.value,
                source: c.alias,
            },
            None => SummaryField {
                value: String::new(),
                source: "N/A".to_string(),
            },
        };
        summary.insert(field.clone(), entry);
    }
    summary
}

/// Every non-blank entity whose canonical type resolves to `field`.
pub fn candidates_for(doc: &ParsedDocument, field: &str) -> Vec<Candidate> {
    doc.entities
        .iter()
        .filter(|e| canonical_field(&e.entity_type) == field && !e.mention_text.trim().is_empty())
        .map(|e| Candidate {
            alias: e.entity_type.clone(),
            value: e.mention_text.clone(),
            confidence: e.confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(entity_type: &str, text: &str, confidence: f64) -> Entity {
        Entity {
            entity_type: entity_type.to_string(),
            mention_text: text.to_string(),
            confidence,
        }
    }

    fn desired() -> Vec<String> {
        vec![
            "invoice_date".to_string(),
            "brand_name".to_string(),
            "invoice_total".to_string(),
        ]
    }

    #[test]
    fn aliases_fold_into_canonical_fields() {
        assert_eq!(canonical_field("Receipt-Date"), "invoice_date");
        assert_eq!(canonical_field("grand_total"), "invoice_total");
        assert_eq!(canonical_field("brand_name"), "brand_name");
    }

    #[test]
    fn highest_confidence_candidate_wins() {
        let doc = ParsedDocument {
            text: String::new(),
            entities: vec![
                entity("purchase_date", "2025-09-20", 0.61),
                entity("receipt_date", "20/09/2025", 0.93),
                entity("brand_name", "Grab", 0.88),
                entity("total_amount", "45.00", 0.85),
            ],
        };
        let summary = extract_summary(&doc, &desired());
        assert_eq!(summary["invoice_date"].value, "20/09/2025");
        assert_eq!(summary["invoice_date"].source, "receipt_date");
        assert_eq!(summary["brand_name"].value, "Grab");
    }

    #[test]
    fn blank_mentions_are_not_candidates() {
        let doc = ParsedDocument {
            text: String::new(),
            entities: vec![entity("receipt_total", "   ", 0.99)],
        };
        let summary = extract_summary(&doc, &desired());
        assert_eq!(summary["invoice_total"].value, "");
        assert_eq!(summary["invoice_total"].source, "N/A");
    }

    #[test]
    fn candidate_trace_keeps_every_alias() {
        let doc = ParsedDocument {
            text: String::new(),
            entities: vec![
                entity("receipt_total", "45.00", 0.70),
                entity("grand_total", "45.00", 0.65),
                entity("brand_name", "Grab", 0.88),
            ],
        };
        let candidates = candidates_for(&doc, "invoice_total");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].alias, "receipt_total");
        assert_eq!(candidates[1].alias, "grand_total");
    }
}
