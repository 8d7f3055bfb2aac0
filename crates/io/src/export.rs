// Execution summary export (CSV, JSON)

use std::path::Path;

use serde::Serialize;
use stockrecon_recon::{CanonicalUpdate, ExecutionResult};

pub const SUMMARY_HEADERS: [&str; 8] = [
    "product_id",
    "product_name",
    "old_stock",
    "new_stock",
    "difference",
    "manual",
    "status",
    "error",
];

fn status(result: &ExecutionResult, update: &CanonicalUpdate) -> (&'static str, String) {
    match result.error_for(update.product_id) {
        Some(e) => ("failed", e.error.clone()),
        None if result.dry_run => ("ok", String::new()),
        None => ("applied", String::new()),
    }
}

/// One line per canonical update with its outcome in `result`.
pub fn write_summary_csv(path: &Path, updates: &[CanonicalUpdate], result: &ExecutionResult) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
    writer.write_record(SUMMARY_HEADERS).map_err(|e| e.to_string())?;

    for u in updates {
        let (status, error) = status(result, u);
        writer
            .write_record([
                u.product_id.to_string(),
                u.product_name.clone(),
                u.old_stock.to_string(),
                u.new_stock.to_string(),
                u.difference.to_string(),
                u.is_manual_match.to_string(),
                status.to_string(),
                error,
            ])
            .map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct Summary<'a> {
    result: &'a ExecutionResult,
    updates: &'a [CanonicalUpdate],
}

/// `{ "result": ..., "updates": [...] }` as pretty JSON.
pub fn summary_json(updates: &[CanonicalUpdate], result: &ExecutionResult) -> Result<String, String> {
    serde_json::to_string_pretty(&Summary { result, updates }).map_err(|e| e.to_string())
}

pub fn write_summary_json(path: &Path, updates: &[CanonicalUpdate], result: &ExecutionResult) -> Result<(), String> {
    let json = summary_json(updates, result)?;
    std::fs::write(path, json + "\n").map_err(|e| format!("cannot write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockrecon_recon::model::ItemError;
    use tempfile::tempdir;

    fn update(product_id: i64, manual: bool) -> CanonicalUpdate {
        CanonicalUpdate {
            product_id,
            product_name: format!("Wheel, {product_id}"),
            old_stock: 10,
            new_stock: 15,
            difference: 5,
            is_manual_match: manual,
            expected_version: Some(1),
            entry_ids: vec!["row-2".into()],
        }
    }

    fn result(dry_run: bool) -> ExecutionResult {
        ExecutionResult {
            batch_id: "recon-abc".into(),
            dry_run,
            success_count: 1,
            error_count: 1,
            total_processed: 2,
            errors: vec![ItemError {
                product_id: 99,
                product_name: "Wheel, 99".into(),
                error: "not found".into(),
            }],
            executed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn csv_has_one_line_per_update() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        write_summary_csv(&path, &[update(42, false), update(99, true)], &result(false)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, SUMMARY_HEADERS.to_vec());

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(1), Some("Wheel, 42"));
        assert_eq!(records[0].get(6), Some("applied"));
        assert_eq!(records[1].get(5), Some("true"));
        assert_eq!(records[1].get(6), Some("failed"));
        assert_eq!(records[1].get(7), Some("not found"));
    }

    #[test]
    fn dry_run_status_is_ok() {
        let r = result(true);
        assert_eq!(status(&r, &update(42, false)).0, "ok");
    }

    #[test]
    fn json_wraps_result_and_updates() {
        let json = summary_json(&[update(42, false)], &result(false)).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["result"]["batch_id"], "recon-abc");
        assert_eq!(v["result"]["error_count"], 1);
        assert_eq!(v["updates"][0]["product_id"], 42);
        assert_eq!(v["updates"][0]["new_stock"], 15);
    }
}
