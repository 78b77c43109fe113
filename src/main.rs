mod config;
mod document_db;
mod entities;
mod guided;
mod heuristics;
mod inventory;
mod metadata;
mod rules;

use chrono::Utc;
use config::Config;
use document_db::{DocumentStore, StoredDocument, StoredExtraction};
use entities::ParsedDocument;
use guided::GuidedParser;
use heuristics::Reconciliation;
use rules::RuleLoader;
use std::path::Path;
use tracing::{info, warn};

const CONFIG_PATH: &str = ".config/receipt_extract.toml";

const USAGE: &str = "\
usage: receipt-extract <command>

  insurers                                        list insurers in the rule table
  parse <ocr.txt> <insurer> <contributor> <type> <asset_id>
                                                  guided extraction, store + metadata
  track <ocr.txt> <contributor> <asset_id>        policy heuristics, merge metadata
  summary <entities.json> <contributor>           vendor entity summary + inventory row
  reconcile <receipt.json> <payment.json>         compare receipt vs payment totals
  export                                          dump the inventory as JSON
  use-insurer <insurer>                           set the default insurer in config
  stats                                           database statistics";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter("info")
        .init();

    let cfg = Config::load_or_default(CONFIG_PATH)?;
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("insurers") => cmd_insurers(&cfg),
        Some("parse") => {
            let [ocr_path, insurer, contributor, asset_type, asset_id] = take_args::<5>(&args)?;
            cmd_parse(&cfg, ocr_path, insurer, contributor, asset_type, asset_id)
        }
        Some("track") => {
            let [ocr_path, contributor, asset_id] = take_args::<3>(&args)?;
            cmd_track(&cfg, ocr_path, contributor, asset_id)
        }
        Some("summary") => {
            let [entities_path, contributor] = take_args::<2>(&args)?;
            cmd_summary(&cfg, entities_path, contributor)
        }
        Some("reconcile") => {
            let [receipt_path, payment_path] = take_args::<2>(&args)?;
            cmd_reconcile(&cfg, receipt_path, payment_path)
        }
        Some("export") => cmd_export(&cfg),
        Some("use-insurer") => {
            let [insurer] = take_args::<1>(&args)?;
            Config::set_default_insurer(CONFIG_PATH, insurer)?;
            info!(insurer = %insurer, "Default insurer updated");
            Ok(())
        }
        Some("stats") | None => cmd_stats(&cfg),
        Some(_) => Err(USAGE.into()),
    }
}

/// Pull exactly N positional arguments after the subcommand.
fn take_args<const N: usize>(args: &[String]) -> Result<[&str; N], Box<dyn std::error::Error>> {
    let rest: Vec<&str> = args.iter().skip(2).map(String::as_str).collect();
    <[&str; N]>::try_from(rest).map_err(|_| USAGE.into())
}

fn open_store(cfg: &Config) -> Result<DocumentStore, Box<dyn std::error::Error>> {
    if let Some(parent) = Path::new(&cfg.paths.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(DocumentStore::new(&cfg.paths.db_path)?)
}

fn cmd_insurers(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let loader = RuleLoader::load(&cfg.paths.rules_path)?;
    for insurer in loader.supported_insurers() {
        println!("{insurer}");
    }
    Ok(())
}

fn cmd_parse(
    cfg: &Config,
    ocr_path: &str,
    insurer: &str,
    contributor: &str,
    asset_type: &str,
    asset_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_store(cfg)?;
    let loader = RuleLoader::load(&cfg.paths.rules_path)?;

    // "-" means use the configured default
    let insurer = if insurer == "-" {
        if cfg.parser.default_insurer.is_empty() {
            return Err("no default insurer configured; run use-insurer first".into());
        }
        cfg.parser.default_insurer.as_str()
    } else {
        insurer
    };

    let ocr_text = std::fs::read_to_string(ocr_path)?;
    let parser = GuidedParser::new(&ocr_text, insurer, &loader);
    let fields = parser.extract_fields()?;

    let filename = file_name(ocr_path);
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let uid = DocumentStore::generate_uid(&filename, &today, contributor);

    db.upsert_document(&StoredDocument {
        uid: uid.clone(),
        contributor: contributor.to_string(),
        filename,
        insurer: Some(insurer.to_string()),
        asset_type: Some(asset_type.to_string()),
        ocr_text: Some(ocr_text),
        has_entities: false,
        is_processed: false,
    })?;
    db.clear_extractions_for_document(&uid)?;

    for (field, result) in &fields {
        db.insert_extraction(&StoredExtraction {
            id: None,
            document_uid: uid.clone(),
            field: field.clone(),
            value: result.value.clone(),
            source_anchor: result.source.clone(),
            notes: result.notes.clone(),
        })?;
        info!(
            field = %field,
            value = result.value.as_deref().unwrap_or("-"),
            anchor = %result.source,
            "FIELD"
        );
    }
    db.mark_document_as_processed(&uid)?;

    let path = metadata::save_parsed_fields(
        Path::new(&cfg.paths.data_root),
        contributor,
        asset_type,
        asset_id,
        &fields,
    )?;
    info!(uid = %uid, metadata = %path.display(), fields = fields.len(), "PARSED");

    log_stats(&db)
}

fn cmd_track(
    cfg: &Config,
    ocr_path: &str,
    contributor: &str,
    asset_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_store(cfg)?;

    let ocr_text = std::fs::read_to_string(ocr_path)?;
    let policy = heuristics::extract_policy(&ocr_text);
    let (filled, total) = policy.coverage();

    let filename = file_name(ocr_path);
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let uid = DocumentStore::generate_uid(&filename, &today, contributor);

    db.upsert_document(&StoredDocument {
        uid: uid.clone(),
        contributor: contributor.to_string(),
        filename,
        insurer: None,
        asset_type: Some("Car".to_string()),
        ocr_text: Some(ocr_text),
        has_entities: false,
        is_processed: false,
    })?;
    db.clear_extractions_for_document(&uid)?;

    for (field, anchor, value) in [
        ("policy_no", "Policy No", &policy.policy_no),
        ("start", "from", &policy.period_start),
        ("end", "to", &policy.period_end),
        ("vehicle_no", "Vehicle No", &policy.vehicle_no),
    ] {
        db.insert_extraction(&StoredExtraction {
            id: None,
            document_uid: uid.clone(),
            field: field.to_string(),
            value: value.clone(),
            source_anchor: anchor.to_string(),
            notes: String::new(),
        })?;
    }
    db.mark_document_as_processed(&uid)?;

    let path = metadata::merge_insurance(
        Path::new(&cfg.paths.data_root),
        contributor,
        "Car",
        asset_id,
        &policy,
    )?;
    info!(
        uid = %uid,
        metadata = %path.display(),
        fields_found = filled,
        fields_total = total,
        "TRACKED"
    );

    log_stats(&db)
}

fn cmd_summary(
    cfg: &Config,
    entities_path: &str,
    contributor: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_store(cfg)?;

    let doc = ParsedDocument::from_json_file(entities_path)?;
    let summary = entities::extract_summary(&doc, &cfg.parser.summary_fields);

    for (field, entry) in &summary {
        info!(field = %field, value = %entry.value, from = %entry.source, "SUMMARY");
        for c in entities::candidates_for(&doc, field) {
            info!(
                field = %field,
                alias = %c.alias,
                value = %c.value,
                confidence = c.confidence,
                "candidate"
            );
        }
    }

    let filename = file_name(entities_path);
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let uid = DocumentStore::generate_uid(&filename, &today, contributor);

    db.upsert_document(&StoredDocument {
        uid: uid.clone(),
        contributor: contributor.to_string(),
        filename,
        insurer: None,
        asset_type: None,
        ocr_text: Some(doc.text.clone()),
        has_entities: !doc.entities.is_empty(),
        is_processed: false,
    })?;
    db.mark_document_as_processed(&uid)?;

    // The document is already stored; a failed inventory append must not
    // undo that, so log and keep going.
    let record = inventory::ExpenseRecord::from_summary(&summary);
    if let Err(e) = inventory::append(&cfg.paths.inventory_path, &record) {
        warn!(error = %e, path = %cfg.paths.inventory_path, "Inventory append failed");
    }

    log_stats(&db)
}

fn cmd_reconcile(
    cfg: &Config,
    receipt_path: &str,
    payment_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let receipt = ParsedDocument::from_json_file(receipt_path)?;
    let payment = ParsedDocument::from_json_file(payment_path)?;

    let receipt_summary = entities::extract_summary(&receipt, &cfg.parser.summary_fields);
    let payment_summary = entities::extract_summary(&payment, &cfg.parser.summary_fields);

    let receipt_total = receipt_summary
        .get("invoice_total")
        .map(|f| f.value.as_str())
        .unwrap_or("");
    let payment_total = payment_summary
        .get("invoice_total")
        .map(|f| f.value.as_str())
        .unwrap_or("");

    match heuristics::reconcile_pair(receipt_total, payment_total) {
        Reconciliation::Matched(amount) => {
            info!(amount = amount, "Amounts match");
        }
        Reconciliation::Mismatch { receipt, payment } => {
            warn!(
                receipt = receipt,
                payment = payment,
                "Amount mismatch between receipt and payment proof"
            );
        }
        Reconciliation::Incomparable => {
            info!("Unable to compare amounts: missing or non-numeric values");
        }
    }
    Ok(())
}

fn cmd_export(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let records = inventory::read_all(&cfg.paths.inventory_path)?;
    println!("{}", inventory::export_json(&records)?);
    Ok(())
}

fn cmd_stats(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_store(cfg)?;
    log_stats(&db)
}

fn log_stats(db: &DocumentStore) -> Result<(), Box<dyn std::error::Error>> {
    let (total_docs, processed_docs, total_extractions) = db.get_counts()?;
    info!(
        documents_total = total_docs,
        documents_processed = processed_docs,
        extractions_total = total_extractions,
        "Database statistics"
    );
    Ok(())
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
