use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stockrecon_core::Dimension;

/// User-declared overrides from raw spreadsheet values to canonical values.
///
/// Keys are stored verbatim: case-sensitive, untrimmed. Nothing here checks
/// a canonical value against the catalog; that happens on the next parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingStore {
    pub finish: BTreeMap<String, String>,
    pub width: BTreeMap<String, String>,
    pub pcd: BTreeMap<String, String>,
    pub holes: BTreeMap<String, String>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, dim: Dimension) -> &BTreeMap<String, String> {
        match dim {
            Dimension::Finish => &self.finish,
            Dimension::Width => &self.width,
            Dimension::Pcd => &self.pcd,
            Dimension::Holes => &self.holes,
        }
    }

    fn table_mut(&mut self, dim: Dimension) -> &mut BTreeMap<String, String> {
        match dim {
            Dimension::Finish => &mut self.finish,
            Dimension::Width => &mut self.width,
            Dimension::Pcd => &mut self.pcd,
            Dimension::Holes => &mut self.holes,
        }
    }

    /// Insert or overwrite one override. Returns the previous value, if any.
    pub fn set_mapping(
        &mut self,
        dim: Dimension,
        excel_value: impl Into<String>,
        db_value: impl Into<String>,
    ) -> Option<String> {
        let excel_value = excel_value.into();
        let db_value = db_value.into();
        log::debug!("mapping {dim}: {excel_value:?} -> {db_value:?}");
        self.table_mut(dim).insert(excel_value, db_value)
    }

    pub fn get_mapping(&self, dim: Dimension, excel_value: &str) -> Option<&str> {
        self.table(dim).get(excel_value).map(|s| s.as_str())
    }

    pub fn remove_mapping(&mut self, dim: Dimension, excel_value: &str) -> Option<String> {
        self.table_mut(dim).remove(excel_value)
    }

    pub fn has_any_mapping(&self) -> bool {
        Dimension::ALL.iter().any(|d| !self.table(*d).is_empty())
    }

    pub fn len(&self) -> usize {
        Dimension::ALL.iter().map(|d| self.table(*d).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_any_mapping()
    }

    pub fn iter(&self, dim: Dimension) -> impl Iterator<Item = (&str, &str)> {
        self.table(dim).iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        for dim in Dimension::ALL {
            self.table_mut(dim).clear();
        }
    }

    /// Apply the override for `raw`, or return `raw` unchanged.
    pub fn resolve<'a>(&'a self, dim: Dimension, raw: &'a str) -> &'a str {
        self.get_mapping(dim, raw).unwrap_or(raw)
    }
}
