//! `stockrecon-core`: plain data types shared by the engine, I/O and CLI.

pub mod attribute;
pub mod catalog;
pub mod row;

pub use attribute::{Attribute, Dimension};
pub use catalog::{CanonicalFinish, Catalog, Product, SpecVocabulary, StockMovement};
pub use row::{Column, ColumnLayout, SourceFile, StockRow};

/// Identifies one spreadsheet row (`row-<n>`, 1-based sheet row number).
pub type EntryId = String;

/// Identifies one canonical product in the catalog.
pub type ProductId = i64;

/// Build the entry id for a 1-based sheet row number.
pub fn entry_id_for_row(sheet_row: usize) -> EntryId {
    format!("row-{sheet_row}")
}
