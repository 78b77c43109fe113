use serde::Deserialize;
use std::{fs, path::Path};
use toml_edit::{DocumentMut, value};

#[derive(Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub parser: ParserSection,
}

#[derive(Deserialize)]
pub struct Paths {
    #[serde(default = "default_rules_path")]
    pub rules_path: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_inventory_path")]
    pub inventory_path: String,
    #[serde(default = "default_data_root")]
    pub data_root: String,
}

#[derive(Deserialize)]
pub struct ParserSection {
    #[serde(default)]
    pub default_insurer: String,
    #[serde(default = "default_summary_fields")]
    pub summary_fields: Vec<String>,
}

fn default_rules_path() -> String {
    "parsing_rules.csv".to_string()
}

fn default_db_path() -> String {
    "docstore/documents.db".to_string()
}

fn default_inventory_path() -> String {
    "inventory.csv".to_string()
}

fn default_data_root() -> String {
    "data".to_string()
}

fn default_summary_fields() -> Vec<String> {
    vec![
        "invoice_date".to_string(),
        "brand_name".to_string(),
        "invoice_total".to_string(),
    ]
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            db_path: default_db_path(),
            inventory_path: default_inventory_path(),
            data_root: default_data_root(),
        }
    }
}

impl Default for ParserSection {
    fn default() -> Self {
        Self {
            default_insurer: String::new(),
            summary_fields: default_summary_fields(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Missing config file is fine; everything has a default.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(toml::from_str("")?)
        }
    }

    pub fn set_default_insurer(
        path: impl AsRef<Path>,
        insurer: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // No config yet is fine; start from an empty document, like load_or_default
        let content = if path.as_ref().exists() {
            fs::read_to_string(&path)?
        } else {
            if let Some(parent) = path.as_ref().parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            String::new()
        };
        let mut doc = content.parse::<DocumentMut>()?;

        doc["parser"]["default_insurer"] = value(insurer);

        fs::write(&path, doc.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.paths.rules_path, "parsing_rules.csv");
        assert_eq!(cfg.paths.db_path, "docstore/documents.db");
        assert_eq!(cfg.parser.default_insurer, "");
        assert_eq!(cfg.parser.summary_fields.len(), 3);
    }

    #[test]
    fn partial_config_overrides_only_what_it_names() {
        let cfg: Config = toml::from_str(
            "[paths]\nrules_path = \"rules/my_rules.csv\"\n\n[parser]\ndefault_insurer = \"Zurich\"\n",
        )
        .unwrap();
        assert_eq!(cfg.paths.rules_path, "rules/my_rules.csv");
        assert_eq!(cfg.paths.inventory_path, "inventory.csv");
        assert_eq!(cfg.parser.default_insurer, "Zurich");
    }

    #[test]
    fn set_default_insurer_creates_missing_config() {
        let path = std::env::temp_dir()
            .join(format!("receipt_cfg_new_{}", std::process::id()))
            .join("config.toml");
        let _ = fs::remove_file(&path);

        Config::set_default_insurer(&path, "Zurich").unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.parser.default_insurer, "Zurich");
        assert_eq!(cfg.paths.rules_path, "parsing_rules.csv");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn set_default_insurer_preserves_other_keys() {
        let path =
            std::env::temp_dir().join(format!("receipt_cfg_{}.toml", std::process::id()));
        fs::write(
            &path,
            "# local overrides\n[paths]\ndb_path = \"x.db\"\n\n[parser]\ndefault_insurer = \"Coles\"\n",
        )
        .unwrap();

        Config::set_default_insurer(&path, "Zurich").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# local overrides"));
        assert!(content.contains("db_path = \"x.db\""));

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.parser.default_insurer, "Zurich");

        fs::remove_file(&path).unwrap();
    }
}
