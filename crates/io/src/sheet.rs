//! Count sheet loading: spreadsheet cells to `StockRow`s.
//!
//! The first non-blank row is the header. Every column of the layout must be
//! present; extra columns are ignored. Blank rows are skipped and each data
//! row is identified by its 1-based sheet row number.

use std::path::Path;

use stockrecon_core::{entry_id_for_row, Attribute, Column, ColumnLayout, SourceFile, StockRow};

/// One raw spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Display text; integral numbers print without decimals.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    /// 1-based row number in the source sheet.
    pub sheet_row: usize,
    pub cells: Vec<Cell>,
}

impl GridRow {
    fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }

    fn get(&self, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.cells.get(col).unwrap_or(&EMPTY)
    }
}

/// Load a count sheet from `.xlsx`/`.xls` (first worksheet) or `.csv`.
pub fn load(path: &Path, layout: &ColumnLayout) -> Result<SourceFile, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let grid = match ext.as_str() {
        "xlsx" | "xls" => crate::xlsx::read_grid(path)?,
        "csv" => crate::csv::read_grid(path)?,
        _ => {
            return Err(format!(
                "unsupported file type '{}' (expected .xlsx, .xls or .csv)",
                path.display()
            ))
        }
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    rows_from_grid(&name, &grid, layout)
}

fn parse_qty(cell: &Cell, sheet_row: usize) -> Result<i64, String> {
    let invalid = || format!("row {sheet_row}: quantity '{}' is not a whole number", cell.text());
    match cell {
        Cell::Empty => Ok(0),
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Ok(*n as i64),
        Cell::Number(_) => Err(invalid()),
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0);
            }
            if let Ok(n) = s.parse::<i64>() {
                return Ok(n);
            }
            match s.parse::<f64>() {
                Ok(n) if n.fract() == 0.0 && n.abs() < 1e15 => Ok(n as i64),
                _ => Err(invalid()),
            }
        }
    }
}

/// Turn a cell grid into rows using `layout` to find the columns.
pub fn rows_from_grid(name: &str, grid: &[GridRow], layout: &ColumnLayout) -> Result<SourceFile, String> {
    let mut rows = grid.iter().filter(|r| !r.is_blank());
    let header = rows
        .next()
        .ok_or_else(|| format!("'{name}' is empty: no header row found"))?;

    let mut positions = [0usize; 7];
    for (slot, column) in positions.iter_mut().zip(ColumnLayout::COLUMNS) {
        *slot = header
            .cells
            .iter()
            .position(|c| layout.matches(column, &c.text()))
            .ok_or_else(|| format!("'{name}': missing column '{}' in header row {}", layout.header(column), header.sheet_row))?;
    }
    let col = |column: Column| -> usize {
        ColumnLayout::COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| positions[i])
            .unwrap_or(0)
    };
    let attr = |r: &GridRow, a: Attribute| r.get(col(Column::Attr(a))).text();

    let mut out = Vec::new();
    for r in rows {
        out.push(StockRow {
            entry_id: entry_id_for_row(r.sheet_row),
            model: attr(r, Attribute::Model),
            finish: attr(r, Attribute::Finish),
            width: attr(r, Attribute::Width),
            pcd: attr(r, Attribute::Pcd),
            holes: attr(r, Attribute::Holes),
            inch: attr(r, Attribute::Inch),
            qty: parse_qty(r.get(col(Column::Qty)), r.sheet_row)?,
        });
    }

    Ok(SourceFile::new(name, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::fs;
    use tempfile::tempdir;

    fn text(s: &str) -> Cell {
        Cell::Text(s.into())
    }

    fn grid_row(sheet_row: usize, cells: Vec<Cell>) -> GridRow {
        GridRow { sheet_row, cells }
    }

    fn header() -> Vec<Cell> {
        ["Model", "Finish", "Width", "PCD", "Holes", "Inch", "Qty"]
            .iter()
            .map(|h| text(h))
            .collect()
    }

    #[test]
    fn header_found_after_blank_rows() {
        let grid = vec![
            grid_row(1, vec![Cell::Empty, text("  ")]),
            grid_row(2, header()),
            grid_row(
                3,
                vec![
                    text(" RS-7 "),
                    text("Chrome"),
                    Cell::Number(8.5),
                    text("5x112"),
                    Cell::Number(5.0),
                    Cell::Number(18.0),
                    Cell::Number(15.0),
                ],
            ),
            grid_row(4, vec![]),
        ];
        let file = rows_from_grid("counts.xlsx", &grid, &ColumnLayout::default()).unwrap();
        assert_eq!(file.rows.len(), 1);
        let r = &file.rows[0];
        assert_eq!(r.entry_id, "row-3");
        assert_eq!(r.model, "RS-7");
        assert_eq!(r.width, "8.5");
        assert_eq!(r.holes, "5");
        assert_eq!(r.inch, "18");
        assert_eq!(r.qty, 15);
    }

    #[test]
    fn columns_located_by_name_in_any_order() {
        let grid = vec![
            grid_row(
                1,
                ["quantity", "notes", "inches", "holes", "pcd", "width", "finish", "model"]
                    .iter()
                    .map(|h| text(h))
                    .collect(),
            ),
            grid_row(
                2,
                ["3", "x", "17", "4", "4x100", "7", "Silver", "GT-2"]
                    .iter()
                    .map(|h| text(h))
                    .collect(),
            ),
        ];
        let file = rows_from_grid("counts.csv", &grid, &ColumnLayout::default()).unwrap();
        let r = &file.rows[0];
        assert_eq!((r.model.as_str(), r.finish.as_str(), r.inch.as_str(), r.qty), ("GT-2", "Silver", "17", 3));
    }

    #[test]
    fn custom_layout_header() {
        let layout = ColumnLayout {
            qty: "Counted".into(),
            ..ColumnLayout::default()
        };
        let mut h = header();
        h[6] = text("counted");
        let grid = vec![grid_row(1, h)];
        assert!(rows_from_grid("a.csv", &grid, &layout).unwrap().is_empty());

        // "Qty" is no longer accepted once the header is customized.
        let grid = vec![grid_row(1, header())];
        let err = rows_from_grid("a.csv", &grid, &layout).unwrap_err();
        assert!(err.contains("missing column 'Counted'"), "{err}");
    }

    #[test]
    fn missing_column_is_an_error() {
        let mut h = header();
        h.remove(3);
        let err = rows_from_grid("a.csv", &[grid_row(1, h)], &ColumnLayout::default()).unwrap_err();
        assert!(err.contains("'PCD'"), "{err}");
    }

    #[test]
    fn empty_grid_is_an_error() {
        let err = rows_from_grid("a.csv", &[], &ColumnLayout::default()).unwrap_err();
        assert!(err.contains("no header row"));
    }

    #[test]
    fn quantity_rules() {
        assert_eq!(parse_qty(&Cell::Empty, 2), Ok(0));
        assert_eq!(parse_qty(&text(" "), 2), Ok(0));
        assert_eq!(parse_qty(&text("-4"), 2), Ok(-4));
        assert_eq!(parse_qty(&text("12.0"), 2), Ok(12));
        assert_eq!(parse_qty(&Cell::Number(7.0), 2), Ok(7));
        let err = parse_qty(&Cell::Number(2.5), 9).unwrap_err();
        assert_eq!(err, "row 9: quantity '2.5' is not a whole number");
        assert!(parse_qty(&text("ten"), 3).unwrap_err().contains("'ten'"));
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let err = load(Path::new("counts.ods"), &ColumnLayout::default()).unwrap_err();
        assert!(err.contains("unsupported file type"));
    }

    #[test]
    fn load_csv_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.csv");
        fs::write(
            &path,
            "Model;Finish;Width;PCD;Holes;Inch;Qty\nRS-7;Chrome Glossy;8,5;5x112;5;18;15\n;;;;;;\nGT-2;Silver;7;4x100;4;17;\n",
        )
        .unwrap();
        let file = load(&path, &ColumnLayout::default()).unwrap();
        assert_eq!(file.name, "counts.csv");
        assert_eq!(file.rows.len(), 2);
        assert_eq!(file.rows[0].width, "8,5");
        assert_eq!(file.rows[1].entry_id, "row-4");
        assert_eq!(file.rows[1].qty, 0);
    }

    #[test]
    fn csv_entry_ids_follow_physical_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.csv");
        fs::write(
            &path,
            "Model,Finish,Width,PCD,Holes,Inch,Qty\n\nRS-7,Chrome Glossy,8.5,5x112,5,18,15\n\n\nGT-2,Silver,7,4x100,4,17,x\n",
        )
        .unwrap();
        let err = load(&path, &ColumnLayout::default()).unwrap_err();
        assert!(err.starts_with("row 6:"), "{err}");

        fs::write(
            &path,
            "Model,Finish,Width,PCD,Holes,Inch,Qty\n\nRS-7,Chrome Glossy,8.5,5x112,5,18,15\n\n\nGT-2,Silver,7,4x100,4,17,2\n",
        )
        .unwrap();
        let file = load(&path, &ColumnLayout::default()).unwrap();
        let ids: Vec<&str> = file.rows.iter().map(|r| r.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["row-3", "row-6"]);
    }

    #[test]
    fn load_xlsx_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, h) in ["Model", "Finish", "Width", "PCD", "Holes", "Inch", "Qty"].iter().enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        sheet.write_string(1, 0, "RS-7").unwrap();
        sheet.write_string(1, 1, "CHROME-X").unwrap();
        sheet.write_number(1, 2, 8.5).unwrap();
        sheet.write_string(1, 3, "5x112").unwrap();
        sheet.write_number(1, 4, 5).unwrap();
        sheet.write_number(1, 5, 18).unwrap();
        sheet.write_number(1, 6, 3).unwrap();
        workbook.save(&path).unwrap();

        let file = load(&path, &ColumnLayout::default()).unwrap();
        assert_eq!(file.rows.len(), 1);
        let r = &file.rows[0];
        assert_eq!(r.entry_id, "row-2");
        assert_eq!(r.finish, "CHROME-X");
        assert_eq!(r.width, "8.5");
        assert_eq!(r.qty, 3);
    }
}
