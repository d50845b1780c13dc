// Integration tests for tag parsing, variant inference, and scoring
//
// These exercise the public matching API with real-world tag shapes across
// language runtimes and the Java vendor ecosystem.

use fairlead::best_tag_for;
use fairlead::models::Variant;
use fairlead::tags::{
    MATCH_THRESHOLD, extract_jdk_version, find_best_tag, parse_version, score_tag_match,
    sorted_tags, tag_variant,
};

#[test]
fn test_parse_version_shapes() {
    let parsed = parse_version("3.12-dev");
    assert_eq!(parsed.version_parts, vec![3, 12]);
    assert_eq!(parsed.suffix, "-dev");
    assert_eq!(parsed.prefix, "");

    let parsed = parse_version("latest");
    assert_eq!(parsed.version_parts, Vec::<u64>::new());
    assert_eq!(parsed.suffix, "latest");
    assert_eq!(parsed.prefix, "");

    let parsed = parse_version("adoptium-openjdk-17.0.13-dev");
    assert_eq!(parsed.version_parts, vec![17, 0, 13]);
    assert_eq!(parsed.suffix, "-dev");
    assert_eq!(parsed.prefix, "adoptium-openjdk-");
}

#[test]
fn test_variant_is_total_and_case_insensitive() {
    for tag in [
        "3.12",
        "3.12-dev",
        "3.12-slim",
        "latest",
        "LATEST-DEV",
        "18-Alpine",
        "weird!!tag",
        "",
    ] {
        let variant = tag_variant(tag);
        assert!(Variant::ALL.contains(&variant));
        assert_eq!(variant, tag_variant(&tag.to_uppercase()));
    }
}

#[test]
fn test_identity_scores_perfect_when_variant_agrees() {
    for (tag, variant) in [
        ("3.12", Variant::Distroless),
        ("18-alpine", Variant::Distroless),
        ("20-dev", Variant::Dev),
        ("1.21-slim", Variant::Slim),
        ("adoptium-openjdk-17-dev", Variant::Dev),
    ] {
        assert_eq!(
            score_tag_match(tag, tag, variant),
            1.0,
            "score({tag}, {tag}, {variant}) should be 1.0"
        );
    }
}

#[test]
fn test_version_match_depth_monotonicity() {
    // A full major.minor.patch agreement never scores below a major-only one
    let major_only = score_tag_match("1.25.3", "1.24.0", Variant::Distroless);
    let exact_patch = score_tag_match("1.25.3", "1.25.3", Variant::Distroless);
    assert!(exact_patch >= major_only);

    let minor = score_tag_match("1.25.3", "1.25.9", Variant::Distroless);
    assert!(minor >= major_only);
    assert!(exact_patch >= minor);
}

#[test]
fn test_jdk_mismatch_outweighs_variant_bonus() {
    let wrong_jdk = score_tag_match("corretto-11", "corretto-17", Variant::Distroless);
    let right_jdk = score_tag_match("corretto-17", "corretto-17", Variant::Distroless);
    // More separation than the 0.1 variant bonus could ever produce
    assert!(right_jdk - wrong_jdk > 0.1);
}

#[test]
fn test_jdk_extraction_across_vendors() {
    assert_eq!(extract_jdk_version("maven-3.9-eclipse-temurin-17"), Some(17));
    assert_eq!(extract_jdk_version("gradle-8-jdk21"), Some(21));
    assert_eq!(extract_jdk_version("openjdk-11-jre"), Some(11));
    assert_eq!(extract_jdk_version("nginx-1.25"), None);
}

#[test]
fn test_find_best_tag_empty_candidates() {
    assert_eq!(find_best_tag("3.12", &[], Variant::Distroless), (None, 0.0));
}

#[test]
fn test_threshold_gate_surfaces_unsuitable_best() {
    let candidates: Vec<String> = ["1.0", "2.0"].iter().map(|s| s.to_string()).collect();
    let (best, score) = find_best_tag("99.0", &candidates, Variant::Distroless);
    // A best candidate exists internally but must be reported as unresolved
    assert!(best.is_some());
    assert!(score < MATCH_THRESHOLD);
}

#[test]
fn test_latest_family_resolution() {
    let candidates: Vec<String> = ["latest", "latest-dev", "1.2.3"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let (best, score) = find_best_tag("latest", &candidates, Variant::Distroless);
    assert_eq!(best, Some("latest"));
    assert_eq!(score, 1.0);

    let (best, score) = find_best_tag("latest", &candidates, Variant::Dev);
    assert_eq!(best, Some("latest-dev"));
    assert_eq!(score, 1.0);

    // Slim requested but only dev/distroless latest tags exist
    let (best, score) = find_best_tag("latest", &candidates, Variant::Slim);
    assert_eq!(best, Some("latest"));
    assert_eq!(score, 0.4);
}

#[test]
fn test_sorted_tags_is_display_ranking() {
    let candidates: Vec<String> = ["latest", "17", "17-dev", "21", "21-dev", "11"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let ranked = sorted_tags("21", &candidates, Variant::Dev, 3);
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0], "21-dev");
}

#[test]
fn test_best_tag_helper_owns_results() {
    let (best, score) = best_tag_for("20-alpine", &["20", "20-dev", "latest"], Variant::Distroless);
    assert_eq!(best.as_deref(), Some("20"));
    assert!(score >= MATCH_THRESHOLD);
}

#[test]
fn test_python_upgrade_scenario() {
    // A typical conversion: python:3.11-slim-bookworm against a catalog
    // carrying versioned tags
    let candidates: Vec<String> = ["3.11", "3.11-dev", "3.12", "3.12-dev", "latest", "latest-dev"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let (best, _) = find_best_tag("3.11-slim-bookworm", &candidates, Variant::Distroless);
    assert_eq!(best, Some("3.11"));
}
