// Integration tests for package-name mapping against an in-memory APK index

use fairlead::apkindex::ApkIndex;
use fairlead::models::{ApkPackage, SourceDistro};
use fairlead::packages::{BuiltinMappings, map_packages_against_index, map_single_package};

fn sample_index() -> ApkIndex {
    let packages = [
        ("build-base", "Meta package for build tools"),
        ("openssl-dev", "OpenSSL development headers"),
        ("openssl", "TLS toolkit"),
        ("curl", "URL retrieval utility"),
        ("curl-dev", "curl development headers"),
        ("libffi-dev", "FFI development headers"),
        ("zlib-dev", "zlib development headers"),
        ("libpq-dev", "PostgreSQL client library headers"),
        ("py3-pip", "Python package installer"),
        ("git", "Distributed version control system"),
    ]
    .iter()
    .map(|(name, description)| ApkPackage {
        name: name.to_string(),
        version: "1.0.0-r0".to_string(),
        description: description.to_string(),
        architecture: "x86_64".to_string(),
        ..Default::default()
    })
    .collect();
    ApkIndex::from_packages(packages, "x86_64")
}

#[test]
fn test_builtin_mappings_take_priority() {
    let mappings = BuiltinMappings::builtin();
    let index = sample_index();

    let result = map_single_package("build-essential", SourceDistro::Apt, &mappings, &index);
    assert_eq!(result.best_match.as_deref(), Some("build-base"));
    assert_eq!(result.matches[0].score, 1.0);
    assert!(result.message.unwrap().starts_with("Builtin mapping"));
}

#[test]
fn test_dropped_package_has_no_match_but_explains() {
    let mappings = BuiltinMappings::builtin();
    let index = sample_index();

    let result = map_single_package("locales", SourceDistro::Apt, &mappings, &index);
    assert!(result.best_match.is_none());
    assert!(result.message.unwrap().contains("safely removed"));
}

#[test]
fn test_fedora_devel_names_resolve() {
    let mappings = BuiltinMappings::builtin();
    let index = sample_index();

    let result = map_single_package("openssl-devel", SourceDistro::Dnf, &mappings, &index);
    assert_eq!(result.best_match.as_deref(), Some("openssl-dev"));
}

#[test]
fn test_fuzzy_fallback_for_unknown_names() {
    let mappings = BuiltinMappings::builtin();
    let index = sample_index();

    // Not in the curated table; fuzzy matching should still land on the
    // postgres client headers.
    let result = map_single_package("libpq5-dev", SourceDistro::Apt, &mappings, &index);
    assert_eq!(result.best_match.as_deref(), Some("libpq-dev"));
}

#[test]
fn test_unmatchable_package_reports_nothing() {
    let mappings = BuiltinMappings::builtin();
    let index = sample_index();

    let result = map_single_package(
        "entirely-imaginary-package-xyz",
        SourceDistro::Auto,
        &mappings,
        &index,
    );
    assert!(result.best_match.is_none());
    assert!(result.matches.is_empty());
}

#[test]
fn test_batch_summary_is_dockerfile_ready() {
    let mappings = BuiltinMappings::builtin();
    let index = sample_index();
    let packages: Vec<String> = ["build-essential", "libssl-dev", "git", "no-such-pkg-xyz"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let batch = map_packages_against_index(&index, &mappings, &packages, SourceDistro::Apt);

    assert_eq!(batch.results.len(), 4);
    assert!(batch.summary.contains("APK packages:"));
    assert!(batch.summary.contains("build-base"));
    assert!(batch.summary.contains("openssl-dev"));
    assert!(batch.summary.contains("No matches found for: no-such-pkg-xyz"));
}

#[test]
fn test_batch_preserves_input_order() {
    let mappings = BuiltinMappings::builtin();
    let index = sample_index();
    let packages: Vec<String> = ["git", "curl"].iter().map(|s| s.to_string()).collect();

    let batch = map_packages_against_index(&index, &mappings, &packages, SourceDistro::Auto);
    assert_eq!(batch.results[0].source_package, "git");
    assert_eq!(batch.results[1].source_package, "curl");
}
