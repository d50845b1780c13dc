use super::{AliasTable, GenericBaseSet};
use crate::models::ImageMatch;
use super::normalize::normalize_image_name;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Minimum similarity for a fuzzy match to be considered at all.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;
/// How many fuzzy matches to return at most.
pub const DEFAULT_MAX_RESULTS: usize = 5;

fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Remove hyphens and underscores so spellings like `amazoncorretto` and
/// `amazon-corretto` compare equal.
fn normalize_for_comparison(name: &str) -> String {
    name.chars().filter(|c| *c != '-' && *c != '_').collect()
}

/// Similarity between a query and a candidate alias, in [0, 1].
///
/// A strict priority cascade: the first rule that applies decides the score,
/// signals are never averaged. Not symmetric (the substring rule scales by
/// length ratio).
pub fn similarity_score(query: &str, candidate: &str) -> f64 {
    if query == candidate {
        return 1.0;
    }

    // Compare last path components (e.g. "bitnami/python" vs "python")
    let query_base = base_name(query);
    let candidate_base = base_name(candidate);

    if query_base == candidate_base {
        return 0.95;
    }

    let query_normalized = normalize_for_comparison(query_base);
    let candidate_normalized = normalize_for_comparison(candidate_base);

    if query_normalized == candidate_normalized {
        return 0.98;
    }

    // One contains the other after normalization: score by length ratio
    if query_normalized.contains(&candidate_normalized)
        || candidate_normalized.contains(&query_normalized)
    {
        let shorter = query_normalized.len().min(candidate_normalized.len());
        let longer = query_normalized.len().max(candidate_normalized.len());
        return 0.8 + (0.15 * shorter as f64 / longer as f64);
    }

    let max_len = query_normalized.len().max(candidate_normalized.len());
    if max_len == 0 {
        return 0.0;
    }

    let distance = strsim::levenshtein(&query_normalized, &candidate_normalized);
    1.0 - (distance as f64 / max_len as f64)
}

/// Look up catalog equivalents for a source image reference.
///
/// Tiered: exact alias match, then last-path-segment match, then a fuzzy scan
/// over every alias. Each tier short-circuits on any hit. Returns matches
/// sorted by score (highest first), empty if nothing clears the threshold.
pub fn lookup_catalog_image(
    table: &AliasTable,
    source_image: &str,
    fuzzy_threshold: f64,
    max_results: usize,
) -> Vec<ImageMatch> {
    let image_name = normalize_image_name(source_image);

    // Exact match
    if let Some(catalog_images) = table.get(&image_name) {
        return catalog_images
            .iter()
            .map(|cg| ImageMatch {
                catalog_image: cg.clone(),
                matched_alias: image_name.clone(),
                score: 1.0,
            })
            .collect();
    }

    // Without the leading path component (e.g. "bitnami/python" -> "python")
    if image_name.contains('/') {
        let base = base_name(&image_name);
        if let Some(catalog_images) = table.get(base) {
            return catalog_images
                .iter()
                .map(|cg| ImageMatch {
                    catalog_image: cg.clone(),
                    matched_alias: base.to_string(),
                    score: 0.95,
                })
                .collect();
        }
    }

    // Fuzzy search across all aliases, deduplicated by catalog image
    let mut scored: Vec<ImageMatch> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (alias, catalog_images) in table.entries() {
        let score = similarity_score(&image_name, alias);
        if score >= fuzzy_threshold {
            for cg in catalog_images {
                if seen.insert(cg.as_str()) {
                    scored.push(ImageMatch {
                        catalog_image: cg.clone(),
                        matched_alias: alias.clone(),
                        score,
                    });
                }
            }
        }
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(max_results);

    debug!(
        "Fuzzy lookup for '{}' produced {} match(es)",
        image_name,
        scored.len()
    );
    scored
}

/// Convenience wrapper with the default threshold and result cap.
pub fn lookup(table: &AliasTable, source_image: &str) -> Vec<ImageMatch> {
    lookup_catalog_image(table, source_image, DEFAULT_FUZZY_THRESHOLD, DEFAULT_MAX_RESULTS)
}

/// Check whether the source is a generic OS base image (Ubuntu, Alpine, UBI,
/// ...). For these, a workload-specific catalog image is the better target,
/// so callers redirect instead of mapping 1:1.
pub fn is_generic_base_image(generic: &GenericBaseSet, source_image: &str) -> bool {
    let image_name = normalize_image_name(source_image);

    if generic.contains(&image_name) {
        return true;
    }

    if image_name.contains('/') && generic.contains(base_name(&image_name)) {
        return true;
    }

    false
}
