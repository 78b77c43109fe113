use crate::rules::{Rule, RuleLoader};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// One extracted field: the value (None when the anchor never appeared),
/// the anchor phrase that located it, and the rule author's notes.
#[derive(Debug, Clone, Serialize)]
pub struct FieldResult {
    pub value: Option<String>,
    pub source: String,
    pub notes: String,
}

/// Single-pass line scanner driven by the insurer's configured rules.
///
/// For each field: find the first line containing the anchor phrase
/// (case-insensitive substring), then apply the rule's regex to that line.
/// A regex hit yields the match text; a miss falls back to the whole line.
pub struct GuidedParser {
    lines: Vec<String>,
    insurer: String,
    rules: Option<Vec<Rule>>,
}

impl GuidedParser {
    pub fn new(ocr_text: &str, insurer: &str, loader: &RuleLoader) -> Self {
        let lines = ocr_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            lines,
            insurer: insurer.to_string(),
            rules: loader.rules_for_insurer(insurer),
        }
    }

    /// Run every configured rule over the OCR lines, keyed by field name.
    ///
    /// An insurer with no configured rules is an error, not a panic. An
    /// invalid regex in the rule sheet surfaces as an error naming the field.
    pub fn extract_fields(
        &self,
    ) -> Result<BTreeMap<String, FieldResult>, Box<dyn std::error::Error>> {
        let Some(rules) = &self.rules else {
            return Err(format!("insurer '{}' not supported", self.insurer).into());
        };

        let mut results = BTreeMap::new();
        for rule in rules {
            let re = Regex::new(&rule.pattern)
                .map_err(|e| format!("invalid pattern for field '{}': {e}", rule.field))?;
            let value = self.extract_from_lines(&rule.anchor, &re);
            results.insert(
                rule.field.clone(),
                FieldResult {
                    value,
                    source: rule.anchor.clone(),
                    notes: rule.notes.clone(),
                },
            );
        }
        Ok(results)
    }

    fn extract_from_lines(&self, anchor: &str, re: &Regex) -> Option<String> {
        let anchor = anchor.to_lowercase();
        for line in &self.lines {
            if line.to_lowercase().contains(&anchor) {
                return Some(match re.find(line) {
                    Some(m) => m.as_str().to_string(),
                    None => line.clone(),
                });
            }
        }
        None
    }
}
