use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An APK package record from the Wolfi index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApkPackage {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub installed_size: u64,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub provides: Vec<String>,
    pub origin: Option<String>,
    pub maintainer: Option<String>,
}

/// Distribution family the source package name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceDistro {
    Apt,
    Yum,
    Dnf,
    Auto,
}

impl SourceDistro {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDistro::Apt => "apt",
            SourceDistro::Yum => "yum",
            SourceDistro::Dnf => "dnf",
            SourceDistro::Auto => "auto",
        }
    }
}

impl fmt::Display for SourceDistro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Invalid source distro '{0}'. Must be 'apt', 'yum', 'dnf', or 'auto'.")]
pub struct SourceDistroError(pub String);

impl FromStr for SourceDistro {
    type Err = SourceDistroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apt" => Ok(SourceDistro::Apt),
            "yum" => Ok(SourceDistro::Yum),
            "dnf" => Ok(SourceDistro::Dnf),
            "auto" => Ok(SourceDistro::Auto),
            _ => Err(SourceDistroError(s.to_string())),
        }
    }
}

/// A matched APK package with similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMatch {
    pub apk_package: String,
    pub matched_name: String,
    /// 1.0 = exact match, lower = fuzzy match.
    pub score: f64,
    #[serde(default)]
    pub description: String,
}

/// Mapping result for a single source package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMappingResult {
    pub source_package: String,
    pub source_distro: SourceDistro,
    #[serde(default)]
    pub matches: Vec<PackageMatch>,
    /// The recommended APK package name (highest scoring match).
    pub best_match: Option<String>,
    pub message: Option<String>,
}

/// Batch mapping result with a Dockerfile-ready summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMappingBatchResult {
    pub source_distro: SourceDistro,
    pub results: Vec<PackageMappingResult>,
    pub summary: String,
}

/// Result of an APK package search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSearchResult {
    pub query: String,
    pub arch: String,
    pub packages: Vec<ApkPackage>,
    pub total_count: usize,
    pub warning: Option<String>,
}
