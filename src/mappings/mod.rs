pub mod matcher;
pub mod normalize;

pub use matcher::{
    DEFAULT_FUZZY_THRESHOLD, DEFAULT_MAX_RESULTS, is_generic_base_image, lookup,
    lookup_catalog_image, similarity_score,
};
pub use normalize::normalize_image_name;

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

const IMAGE_ALIASES_YAML: &str = include_str!("../../data/image_aliases.yaml");
const GENERIC_BASE_IMAGES_YAML: &str = include_str!("../../data/generic_base_images.yaml");

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to parse mapping table: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    alias: String,
    images: Vec<String>,
}

/// Alias table mapping known image names to catalog images.
///
/// Many-to-many: one alias may name several catalog images, one catalog image
/// has many aliases. Loaded once at process start, immutable afterwards.
/// Entries keep their file order so fuzzy-tier deduplication is
/// deterministic.
#[derive(Debug, Default)]
pub struct AliasTable {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl AliasTable {
    /// Parse the table embedded at compile time.
    pub fn builtin() -> Self {
        Self::from_yaml(IMAGE_ALIASES_YAML).expect("builtin alias table parses")
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, MappingError> {
        let rows: Vec<AliasRow> = serde_yaml::from_str(yaml)?;
        Ok(Self::from_entries(
            rows.into_iter().map(|r| (r.alias, r.images)).collect(),
        ))
    }

    pub fn from_entries(entries: Vec<(String, Vec<String>)>) -> Self {
        let mut table = AliasTable {
            entries: Vec::with_capacity(entries.len()),
            index: HashMap::with_capacity(entries.len()),
        };
        for (alias, images) in entries {
            match table.index.get(&alias) {
                Some(&i) => table.entries[i].1.extend(images),
                None => {
                    table.index.insert(alias.clone(), table.entries.len());
                    table.entries.push((alias, images));
                }
            }
        }
        table
    }

    /// Catalog images for an exact alias, or None.
    pub fn get(&self, alias: &str) -> Option<&[String]> {
        self.index
            .get(alias)
            .map(|&i| self.entries[i].1.as_slice())
    }

    /// All (alias, catalog images) pairs in table order.
    pub fn entries(&self) -> impl Iterator<Item = &(String, Vec<String>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names of generic OS base images for which 1:1 mapping is discouraged.
#[derive(Debug, Default)]
pub struct GenericBaseSet {
    names: HashSet<String>,
}

impl GenericBaseSet {
    pub fn builtin() -> Self {
        Self::from_yaml(GENERIC_BASE_IMAGES_YAML).expect("builtin generic base set parses")
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, MappingError> {
        let names: Vec<String> = serde_yaml::from_str(yaml)?;
        Ok(Self::from_names(names))
    }

    pub fn from_names(names: Vec<String>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_parse() {
        let table = AliasTable::builtin();
        assert!(!table.is_empty());
        assert!(table.get("python").is_some());
        assert!(table.get("node").is_some());

        let generic = GenericBaseSet::builtin();
        assert!(generic.contains("ubuntu"));
        assert!(generic.contains("alpine"));
    }

    #[test]
    fn test_duplicate_alias_rows_merge() {
        let table = AliasTable::from_entries(vec![
            ("java".to_string(), vec!["jdk".to_string()]),
            ("java".to_string(), vec!["jre".to_string()]),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("java").unwrap(), &["jdk", "jre"]);
    }

    #[test]
    fn test_generic_bases_also_have_alias_entries() {
        // Generic bases still match an alias so the resolver can name the
        // fallback image in its redirect guidance.
        let table = AliasTable::builtin();
        let generic = GenericBaseSet::builtin();
        for base in ["ubuntu", "debian", "alpine"] {
            assert!(generic.contains(base), "{base} missing from generic set");
            assert!(table.get(base).is_some(), "{base} missing from aliases");
        }
    }
}
