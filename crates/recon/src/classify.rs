//! Reference classifier: resolves count-sheet rows against a catalog.
//!
//! Per row, every attribute is resolved (mappable dimensions through the
//! mapping store first), failures are collected, and the row is filed under
//! exactly one bucket chosen by the first failing attribute in `Attribute`
//! order. Rows with no failures match when exactly one product carries the
//! resolved combination.

use std::collections::{BTreeMap, HashSet};

use stockrecon_core::{Attribute, Catalog, Dimension, Product, SourceFile, StockRow};

use crate::aggregate::aggregate_by_product;
use crate::collab::Classifier;
use crate::error::ReconError;
use crate::mapping::MappingStore;
use crate::model::{MatchedEntry, MissingValue, ParseResult, UnmatchedEntry, UnmatchedReason};

// ---------------------------------------------------------------------------
// Value normalization
// ---------------------------------------------------------------------------

/// Canonical comparison form of an attribute value.
///
/// Whitespace is removed and case folded. Inch values also drop a leading
/// `R` and a trailing `"`, `in` or `inch` (`R18`, `18"`, `18 in` all read 18).
pub fn normalize(attr: Attribute, value: &str) -> String {
    let s: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if attr != Attribute::Inch {
        return s;
    }

    let s = s.as_str();
    let s = s.strip_prefix('r').unwrap_or(s);
    let s = s
        .strip_suffix('"')
        .or_else(|| s.strip_suffix("inch"))
        .or_else(|| s.strip_suffix("in"))
        .unwrap_or(s);
    s.to_string()
}

/// Equality on normalized values; numeric-looking values compare as numbers.
pub fn values_equal(attr: Attribute, a: &str, b: &str) -> bool {
    let (a, b) = (normalize(attr, a), normalize(attr, b));
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => (x - y).abs() < 1e-9,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Catalog classifier
// ---------------------------------------------------------------------------

/// Vocabulary and product list, normalized once per parse.
struct Index<'a> {
    products: &'a [Product],
    models: Vec<String>,
    inches: Vec<String>,
    /// (id, name) of every canonical finish.
    finishes: Vec<(String, String)>,
    widths: Vec<String>,
    pcds: Vec<String>,
    holes: Vec<String>,
}

impl<'a> Index<'a> {
    fn build(catalog: &'a Catalog) -> Self {
        let specs = catalog.effective_specs();
        Self {
            products: &catalog.products,
            models: catalog.models().into_iter().map(|m| m.to_string()).collect(),
            inches: specs.inches,
            finishes: catalog
                .effective_finishes()
                .into_iter()
                .map(|f| (f.id, f.name))
                .collect(),
            widths: specs.widths,
            pcds: specs.pcds,
            holes: specs.holes,
        }
    }

    fn contains(list: &[String], attr: Attribute, value: &str) -> bool {
        list.iter().any(|v| values_equal(attr, v, value))
    }

    /// Resolve a finish given by name or id to its canonical name.
    fn finish_name(&self, value: &str) -> Option<&str> {
        self.finishes
            .iter()
            .find(|(id, name)| id == value.trim() || values_equal(Attribute::Finish, name, value))
            .map(|(_, name)| name.as_str())
    }

    fn knows(&self, attr: Attribute, value: &str) -> bool {
        match attr {
            Attribute::Model => Self::contains(&self.models, attr, value),
            Attribute::Inch => Self::contains(&self.inches, attr, value),
            Attribute::Finish => self.finish_name(value).is_some(),
            Attribute::Width => Self::contains(&self.widths, attr, value),
            Attribute::Pcd => Self::contains(&self.pcds, attr, value),
            Attribute::Holes => Self::contains(&self.holes, attr, value),
        }
    }
}

/// Attribute values of one row after mapping overrides.
struct Resolved<'r> {
    model: &'r str,
    inch: &'r str,
    finish: String,
    width: &'r str,
    pcd: &'r str,
    holes: &'r str,
}

impl Resolved<'_> {
    /// Product finishes may hold a finish id or a name; both sides are
    /// compared by canonical name.
    fn fits(&self, index: &Index<'_>, p: &Product) -> bool {
        let finish = index.finish_name(&p.finish).unwrap_or(&p.finish);
        values_equal(Attribute::Model, &p.model, self.model)
            && values_equal(Attribute::Inch, &p.inch, self.inch)
            && values_equal(Attribute::Finish, finish, &self.finish)
            && values_equal(Attribute::Width, &p.width, self.width)
            && values_equal(Attribute::Pcd, &p.pcd, self.pcd)
            && values_equal(Attribute::Holes, &p.holes, self.holes)
    }
}

enum Filing {
    Matched(MatchedEntry),
    Unmatched(UnmatchedEntry),
}

pub struct CatalogClassifier<'a> {
    catalog: &'a Catalog,
}

impl<'a> CatalogClassifier<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    fn classify_row(&self, index: &Index<'_>, row: &StockRow, mappings: &MappingStore) -> Filing {
        let mut missing = Vec::new();
        for attr in [Attribute::Model, Attribute::Inch] {
            if !index.knows(attr, row.value(attr)) {
                missing.push(attr);
            }
        }
        for dim in Dimension::ALL {
            let value = mappings.resolve(dim, row.dimension_value(dim));
            if !index.knows(dim.into(), value) {
                missing.push(dim.into());
            }
        }
        missing.sort();

        if let Some(&first) = missing.first() {
            return Filing::Unmatched(UnmatchedEntry {
                entry_id: row.entry_id.clone(),
                row: row.clone(),
                reason: UnmatchedReason::Missing { attribute: first },
                missing,
            });
        }

        let finish_value = mappings.resolve(Dimension::Finish, &row.finish);
        let resolved = Resolved {
            model: &row.model,
            inch: &row.inch,
            finish: index.finish_name(finish_value).unwrap_or(finish_value).to_string(),
            width: mappings.resolve(Dimension::Width, &row.width),
            pcd: mappings.resolve(Dimension::Pcd, &row.pcd),
            holes: mappings.resolve(Dimension::Holes, &row.holes),
        };

        let candidates: Vec<&Product> = index.products.iter().filter(|p| resolved.fits(index, p)).collect();
        match candidates.as_slice() {
            [product] => Filing::Matched(MatchedEntry {
                entry_id: row.entry_id.clone(),
                row: row.clone(),
                product_id: product.id,
                product_name: product.name.clone(),
                in_house_stock: product.in_house_stock,
            }),
            [] => Filing::Unmatched(UnmatchedEntry {
                entry_id: row.entry_id.clone(),
                row: row.clone(),
                reason: UnmatchedReason::NoProduct,
                missing,
            }),
            many => Filing::Unmatched(UnmatchedEntry {
                entry_id: row.entry_id.clone(),
                row: row.clone(),
                reason: UnmatchedReason::Ambiguous {
                    candidates: many.iter().map(|p| p.id).collect(),
                },
                missing,
            }),
        }
    }
}

impl Classifier for CatalogClassifier<'_> {
    fn parse(&self, file: &SourceFile, mappings: &MappingStore) -> Result<ParseResult, ReconError> {
        if file.is_empty() {
            return Err(ReconError::ParseFailure(format!("'{}' contains no data rows", file.name)));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = file.rows.iter().find(|r| !seen.insert(r.entry_id.as_str())) {
            return Err(ReconError::ParseFailure(format!(
                "'{}' has duplicate entry id '{}'",
                file.name, dup.entry_id
            )));
        }

        let index = Index::build(self.catalog);
        let mut result = ParseResult {
            total_rows: file.rows.len(),
            ..ParseResult::default()
        };
        let mut by_dimension: BTreeMap<Dimension, BTreeMap<String, Vec<UnmatchedEntry>>> = BTreeMap::new();

        for row in &file.rows {
            match self.classify_row(&index, row, mappings) {
                Filing::Matched(entry) => result.matched.push(entry),
                Filing::Unmatched(entry) => match entry.reason {
                    UnmatchedReason::Missing { attribute: Attribute::Model } => {
                        result.missing_models.push(entry)
                    }
                    UnmatchedReason::Missing { attribute: Attribute::Inch } => {
                        result.missing_inches.push(entry)
                    }
                    UnmatchedReason::Missing { attribute } => {
                        // Model and Inch are handled above, so a dimension always exists.
                        if let Some(dim) = attribute.dimension() {
                            by_dimension
                                .entry(dim)
                                .or_default()
                                .entry(entry.row.dimension_value(dim).to_string())
                                .or_default()
                                .push(entry);
                        }
                    }
                    UnmatchedReason::NoProduct | UnmatchedReason::Ambiguous { .. } => {
                        result.not_matched.push(entry)
                    }
                },
            }
        }

        for (dim, values) in by_dimension {
            *result.missing_mut(dim) = values
                .into_iter()
                .map(|(excel_value, entries)| MissingValue {
                    excel_value,
                    count: entries.len(),
                    entries,
                })
                .collect();
        }

        for count in aggregate_by_product(&result.matched)? {
            if count.has_change() {
                let version = self.catalog.product(count.product_id).map(|p| p.version);
                result.updates.push(count.into_update(version));
            } else {
                let ids: HashSet<&str> = count.entry_ids.iter().map(|s| s.as_str()).collect();
                result
                    .no_change
                    .extend(result.matched.iter().filter(|m| ids.contains(m.entry_id.as_str())).cloned());
            }
        }

        log::debug!(
            "classified '{}': {} rows, {} matched, {} not matched, {} missing model, {} missing inch, {} missing dimension, {} updates",
            file.name,
            result.total_rows,
            result.matched.len(),
            result.not_matched.len(),
            result.missing_models.len(),
            result.missing_inches.len(),
            result.dimension_row_count(),
            result.updates.len(),
        );

        Ok(result)
    }
}
