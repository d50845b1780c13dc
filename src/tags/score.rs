use super::{parse_version, extract_jdk_version, tag_variant};
use crate::models::Variant;
use std::cmp::Ordering;

/// Minimum score for a tag match to be accepted. Below this the caller must
/// report "no suitable match" rather than pick a poor candidate.
pub const MATCH_THRESHOLD: f64 = 0.3;

/// How many tags the relevance-sorted display list carries.
pub const DISPLAY_TAG_LIMIT: usize = 20;

/// Score how well a candidate catalog tag matches the original tag, in
/// [0, 1]. 1.0 is a perfect match.
///
/// The rules run in a fixed order; the constants are calibration values, not
/// derived from any model.
pub fn score_tag_match(original_tag: &str, candidate_tag: &str, preferred_variant: Variant) -> f64 {
    let orig_lower = original_tag.to_lowercase();
    let cand_lower = candidate_tag.to_lowercase();

    let candidate_variant = tag_variant(candidate_tag);
    let variant_matches = candidate_variant == preferred_variant;

    // "latest" is handled up front, before the exact-match checks
    if orig_lower == "latest" {
        let latest_for_variant = format!("latest-{preferred_variant}");
        if cand_lower == latest_for_variant
            || (preferred_variant == Variant::Distroless && cand_lower == "latest")
        {
            return 1.0;
        }
        if cand_lower.starts_with("latest") {
            return if variant_matches { 0.7 } else { 0.4 };
        }
        // Any other tag is a fallback
        return 0.3;
    }

    // Candidate is the preferred-variant spelling of the original tag,
    // e.g. original "18", candidate "18-dev" with preferred dev
    if preferred_variant != Variant::Distroless
        && cand_lower == format!("{orig_lower}-{preferred_variant}")
    {
        return 1.0;
    }

    // Exact match (for distroless this is the base tag without suffix)
    if original_tag == candidate_tag {
        return if variant_matches { 1.0 } else { 0.5 };
    }

    // Case-insensitive exact match
    if orig_lower == cand_lower {
        return if variant_matches { 0.99 } else { 0.49 };
    }

    let orig = parse_version(&orig_lower);
    let cand = parse_version(&cand_lower);

    let mut score: f64 = 0.0;

    // Compare version numbers when both have them
    if !orig.version_parts.is_empty() && !cand.version_parts.is_empty() {
        if orig.version_parts[0] == cand.version_parts[0] {
            score = 0.6;

            if orig.version_parts.len() > 1 && cand.version_parts.len() > 1 {
                if orig.version_parts[1] == cand.version_parts[1] {
                    score = 0.8;

                    if orig.version_parts.len() > 2
                        && cand.version_parts.len() > 2
                        && orig.version_parts[2] == cand.version_parts[2]
                    {
                        score = 0.9;
                    }
                }
            } else if orig.version_parts.len() == 1 {
                // Original only specified major, candidate has more detail
                score = 0.7;
            }
        }

        // Penalize extra version specificity we did not ask for
        if cand.version_parts.len() > orig.version_parts.len() {
            score *= 0.95;
        }
    }

    // JDK version matching (important for Java-based images like maven, gradle)
    let orig_jdk = extract_jdk_version(&orig_lower);
    let cand_jdk = extract_jdk_version(&cand_lower);

    match (orig_jdk, cand_jdk) {
        (Some(o), Some(c)) if o == c => score += 0.15,
        // A JDK mismatch is functionally breaking
        (Some(_), Some(_)) => score *= 0.3,
        // Original specifies a JDK but the candidate does not
        (Some(_), None) => score *= 0.8,
        _ => {}
    }

    // Variant preference
    if variant_matches {
        score += 0.1;
    } else {
        score *= 0.5;
    }

    // Suffix reconciliation, ignoring the variant markers themselves
    let orig_suffix = orig.suffix.replace("-dev", "").replace("-slim", "");
    let cand_suffix = cand.suffix.replace("-dev", "").replace("-slim", "");

    if !orig_suffix.is_empty() && !cand_suffix.is_empty() {
        if orig_suffix == cand_suffix {
            score += 0.05;
        }
    }
    // An original OS-flavor suffix (like "-alpine") the candidate lacks is
    // expected for catalog images and carries no penalty.

    score.clamp(0.0, 1.0)
}

/// Find the best matching tag from the candidates. Ties keep the first
/// candidate seen. Returns `(None, 0.0)` when candidates is empty.
pub fn find_best_tag<'a>(
    original_tag: &str,
    available_tags: &'a [String],
    preferred_variant: Variant,
) -> (Option<&'a str>, f64) {
    let mut best_tag = None;
    let mut best_score = 0.0;

    for tag in available_tags {
        let score = score_tag_match(original_tag, tag, preferred_variant);
        if score > best_score {
            best_score = score;
            best_tag = Some(tag.as_str());
        }
    }

    (best_tag, best_score)
}

/// Sort tags by relevance to the original tag and return the top `limit`.
/// Display only; selection goes through [`find_best_tag`].
pub fn sorted_tags(
    original_tag: &str,
    all_tags: &[String],
    preferred_variant: Variant,
    limit: usize,
) -> Vec<String> {
    let mut scored: Vec<(&String, f64)> = all_tags
        .iter()
        .map(|tag| (tag, score_tag_match(original_tag, tag, preferred_variant)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored
        .into_iter()
        .take(limit)
        .map(|(tag, _)| tag.clone())
        .collect()
}

/// Check if any tags have the `-slim` variant.
pub fn has_slim_tags(tags: &[String]) -> bool {
    tags.iter().any(|t| t.to_lowercase().contains("-slim"))
}
