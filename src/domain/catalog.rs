//! Customer-facing catalog views derived from a product snapshot.
//!
//! Raw SKUs are grouped per developer (brand) using externally maintained
//! developer metadata. Everything here is pure: callers pass the records and
//! the metadata they already loaded.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::products::ProductRecord;

/// Display metadata for one developer, keyed by developer name in [`DeveloperDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeveloperMetadata {
    pub name: String,
    /// Catalog key used in product detail URLs.
    pub key: String,
    pub image: String,
    pub category: String,
}

/// Developer metadata in file order; lookups by catalog key take the first match.
pub type DeveloperDirectory = IndexMap<String, DeveloperMetadata>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub developer: String,
    pub key: String,
    pub image: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetail {
    pub name: String,
    pub developer: String,
    pub image: String,
    pub nominals: Vec<ProductRecord>,
}

/// One entry per developer that has at least one active record and metadata,
/// in order of first appearance in `records`.
pub fn grouped_catalog(
    records: &[ProductRecord],
    directory: &DeveloperDirectory,
) -> Vec<CatalogEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for record in records.iter().filter(|record| record.is_active()) {
        let Some(metadata) = directory.get(&record.developer) else {
            continue;
        };
        if !seen.insert(record.developer.as_str()) {
            continue;
        }
        entries.push(CatalogEntry {
            name: display_name(metadata, &record.developer),
            developer: record.developer.clone(),
            key: metadata.key.clone(),
            image: metadata.image.clone(),
            category: metadata.category.clone(),
        });
    }

    entries
}

/// Distinct categories across every record, sorted.
pub fn categories(records: &[ProductRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Detail view for the developer whose metadata carries `key`.
///
/// Records match the metadata entry either by the directory key (the developer
/// name used by [`grouped_catalog`]) or by the entry's display name. Returns
/// `None` when the key is unknown or the developer has no active record.
pub fn product_detail(
    records: &[ProductRecord],
    directory: &DeveloperDirectory,
    key: &str,
) -> Option<ProductDetail> {
    let (developer_key, metadata) = directory.iter().find(|(_, meta)| meta.key == key)?;

    let first = records.iter().find(|record| {
        record.is_active()
            && (record.developer == *developer_key
                || (!metadata.name.is_empty() && record.developer == metadata.name))
    })?;
    let developer = first.developer.clone();

    let mut nominals: Vec<ProductRecord> = records
        .iter()
        .filter(|record| record.is_active() && record.developer == developer)
        .cloned()
        .collect();
    nominals.sort_by_key(|record| record.price);

    let own = directory.get(&developer);
    let name = own
        .map(|meta| display_name(meta, &developer))
        .unwrap_or_else(|| developer.clone());
    let image = own
        .map(|meta| meta.image.clone())
        .filter(|image| !image.is_empty())
        .unwrap_or_else(|| format!("{}.webp", key.to_lowercase()));

    Some(ProductDetail {
        name,
        developer,
        image,
        nominals,
    })
}

fn display_name(metadata: &DeveloperMetadata, developer: &str) -> String {
    if metadata.name.is_empty() {
        developer.to_string()
    } else {
        metadata.name.clone()
    }
}
