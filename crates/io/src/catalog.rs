// Catalog JSON load/save

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use stockrecon_core::Catalog;

pub fn load(path: &Path) -> Result<Catalog, String> {
    let data = std::fs::read_to_string(path).map_err(|e| format!("cannot read catalog {}: {}", path.display(), e))?;
    serde_json::from_str(&data).map_err(|e| format!("invalid catalog {}: {}", path.display(), e))
}

/// Write pretty JSON to a sibling temp file, then rename it over `path`.
pub fn save(path: &Path, catalog: &Catalog) -> Result<(), String> {
    let tmp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp_path).map_err(|e| format!("failed to create {}: {}", tmp_path.display(), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, catalog).map_err(|e| e.to_string())?;
        writer.write_all(b"\n").map_err(|e| e.to_string())?;
        writer.flush().map_err(|e| e.to_string())?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| format!("failed to rename tmp to {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockrecon_core::{Product, StockMovement};
    use tempfile::tempdir;

    fn catalog() -> Catalog {
        Catalog {
            products: vec![Product {
                id: 42,
                name: "RS-7 Chrome".into(),
                model: "RS-7".into(),
                finish: "Chrome Glossy".into(),
                width: "8.5".into(),
                pcd: "5x112".into(),
                holes: "5".into(),
                inch: "18".into(),
                in_house_stock: 15,
                version: 2,
            }],
            movements: vec![StockMovement {
                product_id: 42,
                quantity_change: 5,
                batch_ref: "recon-1".into(),
                recorded_at: chrono::Utc::now(),
            }],
            ..Catalog::default()
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let cat = catalog();
        save(&path, &cat).unwrap();
        assert!(!dir.path().join("catalog.json.tmp").exists());
        assert_eq!(load(&path).unwrap(), cat);
    }

    #[test]
    fn minimal_catalog_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"{"products": []}"#).unwrap();
        let cat = load(&path).unwrap();
        assert!(cat.products.is_empty());
        assert!(cat.finishes.is_empty());
    }

    #[test]
    fn load_errors_name_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();
        assert!(load(&path).unwrap_err().contains("broken.json"));
        assert!(load(&dir.path().join("missing.json")).unwrap_err().contains("cannot read"));
    }
}
