use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, Dimension};
use crate::EntryId;

/// One physical stock count read from the uploaded spreadsheet.
///
/// Attribute values are raw cell text (trimmed); nothing is normalized here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRow {
    pub entry_id: EntryId,
    pub model: String,
    pub finish: String,
    pub width: String,
    pub pcd: String,
    pub holes: String,
    pub inch: String,
    pub qty: i64,
}

impl StockRow {
    pub fn value(&self, attr: Attribute) -> &str {
        match attr {
            Attribute::Model => &self.model,
            Attribute::Inch => &self.inch,
            Attribute::Finish => &self.finish,
            Attribute::Width => &self.width,
            Attribute::Pcd => &self.pcd,
            Attribute::Holes => &self.holes,
        }
    }

    pub fn dimension_value(&self, dim: Dimension) -> &str {
        self.value(dim.into())
    }
}

/// An uploaded spreadsheet, already split into rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub rows: Vec<StockRow>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, rows: Vec<StockRow>) -> Self {
        Self { name: name.into(), rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

/// Header names used to locate each column of the count sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub model: String,
    pub finish: String,
    pub width: String,
    pub pcd: String,
    pub holes: String,
    pub inch: String,
    pub qty: String,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            model: "Model".into(),
            finish: "Finish".into(),
            width: "Width".into(),
            pcd: "PCD".into(),
            holes: "Holes".into(),
            inch: "Inch".into(),
            qty: "Qty".into(),
        }
    }
}

/// A column the sheet must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Attr(Attribute),
    Qty,
}

impl ColumnLayout {
    pub const COLUMNS: [Column; 7] = [
        Column::Attr(Attribute::Model),
        Column::Attr(Attribute::Finish),
        Column::Attr(Attribute::Width),
        Column::Attr(Attribute::Pcd),
        Column::Attr(Attribute::Holes),
        Column::Attr(Attribute::Inch),
        Column::Qty,
    ];

    pub fn header(&self, column: Column) -> &str {
        match column {
            Column::Attr(Attribute::Model) => &self.model,
            Column::Attr(Attribute::Finish) => &self.finish,
            Column::Attr(Attribute::Width) => &self.width,
            Column::Attr(Attribute::Pcd) => &self.pcd,
            Column::Attr(Attribute::Holes) => &self.holes,
            Column::Attr(Attribute::Inch) => &self.inch,
            Column::Qty => &self.qty,
        }
    }

    /// Does `header` (as read from the sheet) name `column`?
    ///
    /// Comparison is trimmed and case-insensitive. Well-known aliases are
    /// accepted only while the configured name is still the default.
    pub fn matches(&self, column: Column, header: &str) -> bool {
        let header = header.trim();
        if header.eq_ignore_ascii_case(self.header(column).trim()) {
            return true;
        }
        let default = Self::default();
        if self.header(column) != default.header(column) {
            return false;
        }
        let aliases: &[&str] = match column {
            Column::Attr(Attribute::Inch) => &["inches", "size"],
            Column::Attr(Attribute::Holes) => &["hole", "holes count"],
            Column::Qty => &["quantity", "stock", "count"],
            _ => &[],
        };
        aliases.iter().any(|a| header.eq_ignore_ascii_case(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_headers_match_case_insensitively() {
        let layout = ColumnLayout::default();
        assert!(layout.matches(Column::Attr(Attribute::Pcd), "pcd"));
        assert!(layout.matches(Column::Attr(Attribute::Model), "  MODEL "));
        assert!(!layout.matches(Column::Attr(Attribute::Model), "Finish"));
    }

    #[test]
    fn aliases_accepted_for_default_layout() {
        let layout = ColumnLayout::default();
        assert!(layout.matches(Column::Qty, "Quantity"));
        assert!(layout.matches(Column::Attr(Attribute::Inch), "Size"));
        assert!(layout.matches(Column::Attr(Attribute::Holes), "Holes Count"));
    }

    #[test]
    fn custom_header_disables_aliases() {
        let layout = ColumnLayout {
            qty: "Counted".into(),
            ..ColumnLayout::default()
        };
        assert!(layout.matches(Column::Qty, "counted"));
        assert!(!layout.matches(Column::Qty, "Quantity"));
    }

    #[test]
    fn partial_layout_deserializes_with_defaults() {
        let layout: ColumnLayout = serde_json::from_str(r#"{"qty": "Counted"}"#).unwrap();
        assert_eq!(layout.qty, "Counted");
        assert_eq!(layout.model, "Model");
    }

    #[test]
    fn row_value_by_attribute() {
        let row = StockRow {
            entry_id: "row-2".into(),
            model: "M1".into(),
            finish: "Black".into(),
            width: "8.5".into(),
            pcd: "5x112".into(),
            holes: "5".into(),
            inch: "18".into(),
            qty: 4,
        };
        assert_eq!(row.value(Attribute::Inch), "18");
        assert_eq!(row.dimension_value(Dimension::Pcd), "5x112");
    }
}
