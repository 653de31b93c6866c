use crate::data_loader::{read_frame, string_column};
use crate::error::Result;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Lookup from transmission constraint id to its human-readable name.
#[derive(Debug, Clone, Default)]
pub struct ConstraintCatalog {
    names: HashMap<String, String>,
}

impl ConstraintCatalog {
    /// Load names from a `constraint_id,constraint_name` CSV or Parquet export.
    pub fn from_file(path: &Path) -> Result<Self> {
        let df = read_frame(path, "constraint names")?;
        let ids = string_column(&df, "constraint_id", "constraint names")?;
        let names = string_column(&df, "constraint_name", "constraint names")?;

        let mut catalog = Self::default();
        for (id, name) in ids.into_iter().zip(names) {
            if let (Some(id), Some(name)) = (id, name) {
                catalog.insert(id, name);
            }
        }

        log::info!("Loaded {} constraint names from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(id, name)| (id.into(), name.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Name for display; unknown ids fall back to a generic label.
    ///
    /// Called once per record, so it does not log. Use [`Self::unnamed_ids`]
    /// to report the gaps.
    pub fn display_name(&self, id: &str) -> String {
        match self.get(id) {
            Some(name) => name.to_string(),
            None => format!("Constraint {id}"),
        }
    }

    /// Distinct ids among `ids` that have no name, in sorted order.
    pub fn unnamed_ids<'a, I>(&self, ids: I) -> BTreeSet<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().filter(|id| !self.names.contains_key(*id)).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup_and_fallback() {
        let mut catalog = ConstraintCatalog::from_pairs([("101", "North-South Interface")]);
        catalog.insert("202", "Valley 345kV");

        assert_eq!(catalog.get("101"), Some("North-South Interface"));
        assert_eq!(catalog.display_name("202"), "Valley 345kV");
        assert_eq!(catalog.display_name("999"), "Constraint 999");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_unnamed_ids_are_distinct() {
        let catalog = ConstraintCatalog::from_pairs([("101", "North-South Interface")]);
        let hourly = ["999", "101", "999", "404", "999"];

        let unnamed = catalog.unnamed_ids(hourly);
        assert_eq!(unnamed.into_iter().collect::<Vec<_>>(), vec!["404", "999"]);
        assert!(catalog.unnamed_ids(["101"]).is_empty());
    }

    #[test]
    fn test_load_from_csv_with_numeric_ids() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "constraint_id,constraint_name").unwrap();
        writeln!(file, "101,North-South Interface").unwrap();
        writeln!(file, "202,Valley 345kV").unwrap();
        file.flush().unwrap();

        let catalog = ConstraintCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("202"), Some("Valley 345kV"));
    }
}
