use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// One row of the parsing rule table: which insurer it belongs to, the field
/// it extracts, the anchor phrase that locates the line, and the regex that
/// pulls the value out of it.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    #[serde(rename = "Insurer")]
    pub insurer: String,
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "Anchor Phrase")]
    pub anchor: String,
    #[serde(rename = "Regex Pattern")]
    pub pattern: String,
    #[serde(rename = "Notes", default)]
    pub notes: String,
}

/// Loads the admin-maintained rule table (CSV) and answers two queries:
/// "is this insurer supported?" and "give me all rules for this insurer."
pub struct RuleLoader {
    rules: Vec<Rule>,
}

impl RuleLoader {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let rdr = csv::Reader::from_path(path)
            .map_err(|e| format!("failed to load parsing rules from {}: {e}", path.display()))?;
        let loader = Self::from_reader(rdr)?;
        info!(
            path = %path.display(),
            rules = loader.rules.len(),
            insurers = loader.supported_insurers().len(),
            "Parsing rules loaded"
        );
        Ok(loader)
    }

    pub(crate) fn from_reader<R: Read>(
        mut rdr: csv::Reader<R>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut rules = Vec::new();
        for row in rdr.deserialize::<Rule>() {
            let rule = row.map_err(|e| format!("failed to load parsing rules: {e}"))?;
            // Rows without an insurer are placeholders in the sheet
            if rule.insurer.trim().is_empty() {
                continue;
            }
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    /// All supported insurers, sorted, with case-variant duplicates collapsed
    /// to their first spelling.
    pub fn supported_insurers(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        for rule in &self.rules {
            let key = rule.insurer.to_lowercase();
            if !seen.contains(&key) {
                seen.push(key);
                names.push(rule.insurer.clone());
            }
        }
        names.sort();
        names
    }

    /// Case-insensitive check whether any rules exist for the insurer.
    pub fn validate_insurer(&self, insurer: &str) -> bool {
        let wanted = insurer.to_lowercase();
        self.rules.iter().any(|r| r.insurer.to_lowercase() == wanted)
    }

    /// All rules for an insurer (case-insensitive), `None` when unsupported.
    pub fn rules_for_insurer(&self, insurer: &str) -> Option<Vec<Rule>> {
        let wanted = insurer.to_lowercase();
        let matched: Vec<Rule> = self
            .rules
            .iter()
            .filter(|r| r.insurer.to_lowercase() == wanted)
            .cloned()
            .collect();
        if matched.is_empty() { None } else { Some(matched) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
Insurer,Field,Anchor Phrase,Regex Pattern,Notes
Zurich,Policy No,Policy No,[A-Z0-9]+,primary key
Zurich,Premium,Total Premium,\\d+\\.\\d{2},
coles,Policy No,Your policy,[A-Z0-9]+,
,Orphan,Orphan,.*,row without insurer
";

    fn loader() -> RuleLoader {
        let rdr = csv::Reader::from_reader(SHEET.as_bytes());
        RuleLoader::from_reader(rdr).unwrap()
    }

    #[test]
    fn skips_rows_without_insurer() {
        let l = loader();
        assert_eq!(l.supported_insurers(), vec!["Zurich", "coles"]);
    }

    #[test]
    fn validate_is_case_insensitive() {
        let l = loader();
        assert!(l.validate_insurer("zurich"));
        assert!(l.validate_insurer("COLES"));
        assert!(!l.validate_insurer("Allianz"));
    }

    #[test]
    fn rules_for_insurer_matches_case_insensitively() {
        let l = loader();
        let rules = l.rules_for_insurer("ZURICH").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].field, "Policy No");
        assert_eq!(rules[0].notes, "primary key");
        assert!(l.rules_for_insurer("Allianz").is_none());
    }
}
