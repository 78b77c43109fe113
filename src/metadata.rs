use crate::guided::FieldResult;
use crate::heuristics::PolicyData;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

fn asset_dir(root: &Path, contributor: &str, asset_type: &str, asset_id: &str) -> PathBuf {
    root.join(contributor).join(asset_type).join(asset_id)
}

/// Write the guided extraction result as this asset's metadata.json,
/// replacing whatever was there.
pub fn save_parsed_fields(
    root: &Path,
    contributor: &str,
    asset_type: &str,
    asset_id: &str,
    fields: &BTreeMap<String, FieldResult>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = asset_dir(root, contributor, asset_type, asset_id);
    fs::create_dir_all(&dir)?;

    let path = dir.join("metadata.json");
    fs::write(&path, serde_json::to_string_pretty(fields)?)?;

    info!(path = %path.display(), fields = fields.len(), "Metadata saved");
    Ok(path)
}

/// Merge policy fields into the asset's metadata.json under the "insurance"
/// key, keeping any other keys already present. Missing fields are recorded
/// as "Unknown"; a missing vehicle number falls back to the asset id.
pub fn merge_insurance(
    root: &Path,
    contributor: &str,
    asset_type: &str,
    asset_id: &str,
    policy: &PolicyData,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = asset_dir(root, contributor, asset_type, asset_id);
    fs::create_dir_all(&dir)?;
    let path = dir.join("metadata.json");

    let mut metadata: Value = if path.exists() {
        serde_json::from_str(&fs::read_to_string(&path)?)?
    } else {
        json!({})
    };

    let unknown = || "Unknown".to_string();
    metadata["insurance"] = json!({
        "policy_no": policy.policy_no.clone().unwrap_or_else(unknown),
        "start": policy.period_start.clone().unwrap_or_else(unknown),
        "end": policy.period_end.clone().unwrap_or_else(unknown),
        "vehicle_no": policy.vehicle_no.clone().unwrap_or_else(|| asset_id.to_string()),
        "reminder_set": true,
    });

    fs::write(&path, serde_json::to_string_pretty(&metadata)?)?;
    info!(path = %path.display(), "Insurance metadata merged");
    Ok(path)
}
