use crate::apkindex::{ApkIndex, ApkIndexLoader};
use crate::models::{
    PackageMappingBatchResult, PackageMappingResult, PackageMatch, SourceDistro,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

const BUILTIN_MAPPINGS_YAML: &str = include_str!("../../data/builtin-mappings.yaml");

/// Minimum similarity for a fuzzy package match.
const PACKAGE_FUZZY_THRESHOLD: f64 = 0.5;
/// At most this many candidates get the full similarity treatment.
const CANDIDATE_CAP: usize = 100;
/// How many matches a single package mapping returns.
const MAX_PACKAGE_MATCHES: usize = 5;

static VERSION_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(-|$)").expect("version digits pattern"));

/// Curated distro package -> APK package mappings.
///
/// An empty replacement list means the package has no APK equivalent and can
/// be dropped from the install line.
#[derive(Debug, Default, Deserialize)]
pub struct BuiltinMappings {
    #[serde(default)]
    packages: HashMap<String, HashMap<String, Option<Vec<String>>>>,
}

impl BuiltinMappings {
    pub fn builtin() -> Self {
        serde_yaml::from_str(BUILTIN_MAPPINGS_YAML).expect("builtin package mappings parse")
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Look up a package. `Some(vec![])` means "drop this package"; `None`
    /// means the mappings have no opinion.
    pub fn lookup(&self, package: &str, source_distro: SourceDistro) -> Option<Vec<String>> {
        let distros: &[&str] = match source_distro {
            SourceDistro::Apt => &["debian"],
            SourceDistro::Yum | SourceDistro::Dnf => &["fedora"],
            SourceDistro::Auto => &["debian", "fedora"],
        };

        for distro in distros {
            if let Some(entry) = self.packages.get(*distro).and_then(|m| m.get(package)) {
                return Some(entry.clone().unwrap_or_default());
            }
        }
        None
    }
}

/// Similarity between a source package name and an APK candidate, in [0, 1].
///
/// The same priority-cascade shape as the image matcher, with package-naming
/// normalizations instead of path handling.
pub fn package_similarity(query: &str, candidate: &str) -> f64 {
    if query == candidate {
        return 1.0;
    }

    // apt says -dev, yum says -devel; APK uses -dev
    let query_normalized = query.replace("-devel", "-dev");
    let candidate_normalized = candidate.replace("-devel", "-dev");

    if query_normalized == candidate_normalized {
        return 0.99;
    }

    // The lib prefix is often optional
    let query_no_lib = query_normalized.strip_prefix("lib").unwrap_or(&query_normalized);
    let candidate_no_lib = candidate_normalized
        .strip_prefix("lib")
        .unwrap_or(&candidate_normalized);

    if query_no_lib == candidate_no_lib {
        return 0.95;
    }

    let max_len = query_normalized.len().max(candidate_normalized.len());
    if max_len == 0 {
        return 0.0;
    }

    let distance = strsim::levenshtein(&query_normalized, &candidate_normalized);
    1.0 - (distance as f64 / max_len as f64)
}

fn normalize_package_name(package: &str, source_distro: SourceDistro) -> String {
    let name = package.to_lowercase().trim().to_string();

    match source_distro {
        // YUM/DNF uses -devel, APK uses -dev
        SourceDistro::Yum | SourceDistro::Dnf | SourceDistro::Auto => {
            name.replace("-devel", "-dev")
        }
        SourceDistro::Apt => name,
    }
}

/// Collect candidate packages worth scoring, cheapest checks first, so the
/// Levenshtein pass never walks the whole index.
fn candidates<'a>(normalized: &str, index: &'a ApkIndex) -> Vec<(&'a str, &'a str)> {
    // Exact match short-circuits
    if let Some(pkg) = index.get(normalized) {
        return vec![(pkg.name.as_str(), pkg.description.as_str())];
    }

    let mut found: Vec<(&str, &str)> = Vec::new();

    // Common transformations: strip embedded version digits
    // ("libjpeg62-turbo-dev" -> "libjpeg-turbo-dev")
    let base_name = VERSION_DIGITS.replace_all(normalized, "$1");
    let base_name = base_name.trim_end_matches('-');
    if base_name != normalized {
        if let Some(pkg) = index.get(base_name) {
            found.push((pkg.name.as_str(), pkg.description.as_str()));
        }
    }

    // Toggle the lib prefix
    if let Some(no_lib) = normalized.strip_prefix("lib") {
        if let Some(pkg) = index.get(no_lib) {
            found.push((pkg.name.as_str(), pkg.description.as_str()));
        }
    } else {
        if let Some(pkg) = index.get(&format!("lib{normalized}")) {
            found.push((pkg.name.as_str(), pkg.description.as_str()));
        }
    }

    // Prefix / substring sweep, capped to bound the scoring pass
    let normalized_no_dev = normalized.strip_suffix("-dev").unwrap_or(normalized);
    let query_head = &normalized[..normalized.len().min(4)];

    for pkg in index.packages() {
        let name = pkg.name.as_str();
        if found.iter().any(|(n, _)| *n == name) {
            continue;
        }

        let name_no_dev = name.strip_suffix("-dev").unwrap_or(name);
        let name_head = &name[..name.len().min(4)];

        if name.starts_with(query_head) || normalized.starts_with(name_head) {
            found.push((name, pkg.description.as_str()));
        } else if name_no_dev.contains(normalized_no_dev)
            || normalized_no_dev.contains(name_no_dev)
        {
            found.push((name, pkg.description.as_str()));
        }

        if found.len() >= CANDIDATE_CAP {
            break;
        }
    }

    found
}

/// Map a single source package name to its APK equivalent: curated mappings
/// first, fuzzy search against the index as fallback.
pub fn map_single_package(
    package: &str,
    source_distro: SourceDistro,
    mappings: &BuiltinMappings,
    index: &ApkIndex,
) -> PackageMappingResult {
    if let Some(builtin) = mappings.lookup(package, source_distro) {
        if builtin.is_empty() {
            return PackageMappingResult {
                source_package: package.to_string(),
                source_distro,
                matches: Vec::new(),
                best_match: None,
                message: Some(format!(
                    "Package '{package}' has no APK equivalent (can be safely removed)."
                )),
            };
        }

        let matches: Vec<PackageMatch> = builtin
            .iter()
            .map(|apk| PackageMatch {
                apk_package: apk.clone(),
                matched_name: apk.clone(),
                score: 1.0,
                description: format!("Builtin mapping from {package}"),
            })
            .collect();
        let apk_list = builtin.join(" ");
        return PackageMappingResult {
            source_package: package.to_string(),
            source_distro,
            best_match: Some(builtin[0].clone()),
            matches,
            message: Some(format!("Builtin mapping: {package} -> {apk_list}")),
        };
    }

    let normalized = normalize_package_name(package, source_distro);
    let candidate_list = candidates(&normalized, index);
    debug!(
        "Scoring {} candidate(s) for package '{}'",
        candidate_list.len(),
        package
    );

    let mut scored: Vec<(f64, &str, &str)> = Vec::new();
    for (name, description) in candidate_list {
        let mut score = package_similarity(&normalized, name);

        // A description naming the query is a good sign
        if description.to_lowercase().contains(&normalized) {
            score = (score + 0.1).min(1.0);
        }

        if score >= PACKAGE_FUZZY_THRESHOLD {
            scored.push((score, name, description));
        }
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut matches: Vec<PackageMatch> = Vec::new();
    for (score, name, description) in scored {
        if matches.iter().any(|m| m.apk_package == name) {
            continue;
        }
        matches.push(PackageMatch {
            apk_package: name.to_string(),
            matched_name: name.to_string(),
            score,
            description: description.to_string(),
        });
        if matches.len() >= MAX_PACKAGE_MATCHES {
            break;
        }
    }

    if matches.is_empty() {
        return PackageMappingResult {
            source_package: package.to_string(),
            source_distro,
            matches: Vec::new(),
            best_match: None,
            message: Some(format!(
                "No matching packages found for '{package}' in the APK index."
            )),
        };
    }

    let best = &matches[0];
    let message = if best.score == 1.0 {
        format!("Exact match found: {package} -> {}", best.apk_package)
    } else if best.score >= 0.9 {
        format!(
            "Close match found: {package} -> {} (score: {:.0}%)",
            best.apk_package,
            best.score * 100.0
        )
    } else {
        let mut message = format!(
            "Best fuzzy match: {package} -> {} (score: {:.0}%)",
            best.apk_package,
            best.score * 100.0
        );
        if matches.len() > 1 {
            let others: Vec<&str> = matches[1..].iter().map(|m| m.apk_package.as_str()).collect();
            message.push_str(&format!(". Other candidates: {}", others.join(", ")));
        }
        message
    };

    PackageMappingResult {
        source_package: package.to_string(),
        source_distro,
        best_match: Some(best.apk_package.clone()),
        matches,
        message: Some(message),
    }
}

/// Map a batch of package names, producing a Dockerfile-ready summary.
pub async fn find_equivalent_apk_packages(
    loader: &ApkIndexLoader,
    mappings: &BuiltinMappings,
    packages: &[String],
    source_distro: SourceDistro,
) -> PackageMappingBatchResult {
    let index = match loader.load("x86_64").await {
        Ok(index) => index,
        Err(e) => {
            let message = format!("Failed to load APK index: {e}");
            return PackageMappingBatchResult {
                source_distro,
                results: packages
                    .iter()
                    .map(|pkg| PackageMappingResult {
                        source_package: pkg.clone(),
                        source_distro,
                        matches: Vec::new(),
                        best_match: None,
                        message: Some(message.clone()),
                    })
                    .collect(),
                summary: message,
            };
        }
    };

    map_packages_against_index(&index, mappings, packages, source_distro)
}

/// Map a batch of package names against an already-loaded index.
pub fn map_packages_against_index(
    index: &ApkIndex,
    mappings: &BuiltinMappings,
    packages: &[String],
    source_distro: SourceDistro,
) -> PackageMappingBatchResult {
    let results: Vec<PackageMappingResult> = packages
        .iter()
        .map(|pkg| map_single_package(pkg, source_distro, mappings, index))
        .collect();

    let mapped: Vec<&str> = results
        .iter()
        .filter_map(|r| r.best_match.as_deref())
        .collect();
    let unmapped: Vec<&str> = results
        .iter()
        .filter(|r| r.best_match.is_none())
        .map(|r| r.source_package.as_str())
        .collect();

    let mut summary_parts = Vec::new();
    if !mapped.is_empty() {
        summary_parts.push(format!("APK packages: {}", mapped.join(" ")));
    }
    if !unmapped.is_empty() {
        summary_parts.push(format!("No matches found for: {}", unmapped.join(", ")));
    }

    PackageMappingBatchResult {
        source_distro,
        results,
        summary: if summary_parts.is_empty() {
            "No packages processed".to_string()
        } else {
            summary_parts.join("\n")
        },
    }
}
