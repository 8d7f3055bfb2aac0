// CSV count sheet import

use std::io::Read;
use std::path::Path;

use crate::sheet::{Cell, GridRow};

pub fn read_grid(path: &Path) -> Result<Vec<GridRow>, String> {
    let content = read_file_as_utf8(path)?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let delimiter = sniff_delimiter(content);
    grid_from_string(content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel-exported CSVs are often Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn grid_from_string(content: &str, delimiter: u8) -> Result<Vec<GridRow>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    // Sheet rows are physical line numbers. The reader skips blank lines
    // without counting them, and a record's position may point at the
    // skipped terminators, so lines are counted from the bytes themselves.
    let bytes = content.as_bytes();
    let mut grid = Vec::new();
    let (mut offset, mut line) = (0usize, 1usize);
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        if let Some(pos) = record.position() {
            let mut start = (pos.byte() as usize).min(bytes.len());
            while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
                start += 1;
            }
            if start > offset {
                line += bytes[offset..start].iter().filter(|&&b| b == b'\n').count();
                offset = start;
            }
        }
        let cells = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        grid.push(GridRow { sheet_row: line, cells });
    }
    Ok(grid)
}
