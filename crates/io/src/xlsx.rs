// Excel count sheet import (xlsx, xls)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use crate::sheet::{Cell, GridRow};

/// Read the first worksheet. Row numbers are 1-based sheet rows, so a range
/// that does not start at A1 keeps its real row numbers.
pub fn read_grid(path: &Path) -> Result<Vec<GridRow>, String> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "Excel file contains no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    let grid = range
        .rows()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = vec![Cell::Empty; start_col as usize];
            cells.extend(row.iter().map(cell));
            GridRow {
                sheet_row: start_row as usize + i + 1,
                cells,
            }
        })
        .collect();
    Ok(grid)
}

fn cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    #[test]
    fn reads_first_sheet_with_offsets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offset.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        // Data starts at B3.
        sheet.write_string(2, 1, "Model").unwrap();
        sheet.write_string(2, 2, "Qty").unwrap();
        sheet.write_string(3, 1, "RS-7").unwrap();
        sheet.write_number(3, 2, 15).unwrap();
        let other = workbook.add_worksheet();
        other.write_string(0, 0, "ignored").unwrap();
        workbook.save(&path).unwrap();

        let grid = read_grid(&path).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0].sheet_row, 3);
        assert_eq!(grid[0].cells[0], Cell::Empty);
        assert_eq!(grid[0].cells[1], Cell::Text("Model".into()));
        assert_eq!(grid[1].sheet_row, 4);
        assert_eq!(grid[1].cells[2], Cell::Number(15.0));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = read_grid(&dir.path().join("nope.xlsx")).unwrap_err();
        assert!(err.contains("Failed to open Excel file"));
    }
}
