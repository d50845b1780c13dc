use crate::config::Settings;
use crate::models::ApkPackage;
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Where the Wolfi package indexes live.
pub const WOLFI_BASE_URL: &str = "https://packages.wolfi.dev/os";

/// Architectures the index is published for.
pub const SUPPORTED_ARCHES: [&str; 2] = ["x86_64", "aarch64"];

#[derive(Debug, Error)]
pub enum ApkIndexError {
    #[error("unsupported architecture '{0}'. Use 'x86_64' or 'aarch64'.")]
    UnsupportedArch(String),
    #[error("failed to download APK index: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to read APK index archive: {0}")]
    Archive(#[from] std::io::Error),
    #[error("APKINDEX file not found in archive")]
    MissingIndex,
}

/// Parsed, searchable APK package index for one architecture.
#[derive(Debug)]
pub struct ApkIndex {
    packages: Vec<ApkPackage>,
    arch: String,
    name_index: HashMap<String, usize>,
    provides_index: HashMap<String, Vec<usize>>,
}

impl ApkIndex {
    pub fn from_packages(packages: Vec<ApkPackage>, arch: &str) -> Self {
        let mut name_index = HashMap::with_capacity(packages.len());
        let mut provides_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, pkg) in packages.iter().enumerate() {
            name_index.insert(pkg.name.clone(), i);
            for provides in &pkg.provides {
                provides_index.entry(provides.clone()).or_default().push(i);
            }
        }
        Self {
            packages,
            arch: arch.to_string(),
            name_index,
            provides_index,
        }
    }

    /// Parse a raw APKINDEX.tar.gz archive.
    pub fn parse(data: &[u8], arch: &str) -> Result<Self, ApkIndexError> {
        let decoder = GzDecoder::new(data);
        let mut archive = tar::Archive::new(decoder);

        let mut content = None;
        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.path()?.to_str() == Some("APKINDEX") {
                let mut text = String::new();
                entry.read_to_string(&mut text)?;
                content = Some(text);
                break;
            }
        }
        let content = content.ok_or(ApkIndexError::MissingIndex)?;

        Ok(Self::from_packages(parse_index_text(&content, arch), arch))
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn packages(&self) -> &[ApkPackage] {
        &self.packages
    }

    /// Get a package by exact name.
    pub fn get(&self, name: &str) -> Option<&ApkPackage> {
        self.name_index.get(name).map(|&i| &self.packages[i])
    }

    /// Search packages by name or description, ordered by relevance: exact
    /// name matches first, then name prefix, then name substring, then
    /// description substring.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&ApkPackage> {
        let query_lower = query.to_lowercase();
        let mut exact = Vec::new();
        let mut prefix = Vec::new();
        let mut contains = Vec::new();
        let mut description = Vec::new();

        for pkg in &self.packages {
            let name_lower = pkg.name.to_lowercase();
            if name_lower == query_lower {
                exact.push(pkg);
            } else if name_lower.starts_with(&query_lower) {
                prefix.push(pkg);
            } else if name_lower.contains(&query_lower) {
                contains.push(pkg);
            } else if pkg.description.to_lowercase().contains(&query_lower) {
                description.push(pkg);
            }
        }

        exact
            .into_iter()
            .chain(prefix)
            .chain(contains)
            .chain(description)
            .take(limit)
            .collect()
    }

    /// Search packages by what they provide (commands, shared libraries).
    ///
    /// `prefix` filters provides entries, e.g. `cmd` finds `cmd:useradd`,
    /// `so` finds `so:libxml2.so.2`.
    pub fn search_provides(
        &self,
        query: &str,
        prefix: Option<&str>,
        limit: usize,
    ) -> Vec<&ApkPackage> {
        let query_lower = query.to_lowercase();
        let search_prefix = prefix.map(|p| format!("{p}:")).unwrap_or_default();

        let mut exact: Vec<&ApkPackage> = Vec::new();
        let mut prefix_matches: Vec<&ApkPackage> = Vec::new();
        let mut contains: Vec<&ApkPackage> = Vec::new();
        let mut seen: Vec<&str> = Vec::new();

        // Exact provides entry first
        let exact_key = format!("{search_prefix}{query}");
        if let Some(indices) = self.provides_index.get(&exact_key) {
            for &i in indices {
                let pkg = &self.packages[i];
                if !seen.contains(&pkg.name.as_str()) {
                    seen.push(&pkg.name);
                    exact.push(pkg);
                }
            }
        }

        // Sorted scan of the remaining entries keeps results deterministic
        let mut entries: Vec<(&String, &Vec<usize>)> = self.provides_index.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (entry, indices) in entries {
            if !search_prefix.is_empty() && !entry.starts_with(&search_prefix) {
                continue;
            }

            let value = match entry.split_once(':') {
                Some((_, v)) => v.to_lowercase(),
                None => entry.to_lowercase(),
            };

            // Exact matches were already collected
            if value == query_lower {
                continue;
            }

            for &i in indices {
                let pkg = &self.packages[i];
                if seen.contains(&pkg.name.as_str()) {
                    continue;
                }
                if value.starts_with(&query_lower) {
                    seen.push(&pkg.name);
                    prefix_matches.push(pkg);
                } else if value.contains(&query_lower) {
                    seen.push(&pkg.name);
                    contains.push(pkg);
                }
            }
        }

        exact
            .into_iter()
            .chain(prefix_matches)
            .chain(contains)
            .take(limit)
            .collect()
    }

    /// All package names.
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|p| p.name.as_str())
    }
}

/// Split APKINDEX text into records and parse each.
fn parse_index_text(content: &str, arch: &str) -> Vec<ApkPackage> {
    content
        .split("\n\n")
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| parse_record(record, arch))
        .collect()
}

/// Parse a single package record.
///
/// The index format uses single-letter prefixes:
/// P: name, V: version, T: description, A: architecture, S: size,
/// I: installed size, D: dependencies, p: provides, o: origin, m: maintainer.
fn parse_record(record: &str, arch: &str) -> Option<ApkPackage> {
    let mut fields: HashMap<char, &str> = HashMap::new();
    for line in record.trim().lines() {
        let mut chars = line.chars();
        let (Some(key), Some(':')) = (chars.next(), chars.next()) else {
            continue;
        };
        fields.insert(key, chars.as_str());
    }

    let name = fields.get(&'P')?;

    let split_list = |key: char| -> Vec<String> {
        fields
            .get(&key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    };

    Some(ApkPackage {
        name: name.to_string(),
        version: fields.get(&'V').unwrap_or(&"").to_string(),
        description: fields.get(&'T').unwrap_or(&"").to_string(),
        architecture: fields.get(&'A').unwrap_or(&arch).to_string(),
        size: fields.get(&'S').and_then(|v| v.parse().ok()).unwrap_or(0),
        installed_size: fields.get(&'I').and_then(|v| v.parse().ok()).unwrap_or(0),
        dependencies: split_list('D'),
        provides: split_list('p'),
        origin: fields.get(&'o').map(|v| v.to_string()),
        maintainer: fields.get(&'m').map(|v| v.to_string()),
    })
}

/// Downloads and caches APK indexes per architecture with a TTL.
pub struct ApkIndexLoader {
    http: reqwest::Client,
    ttl: Duration,
    cache: Mutex<HashMap<String, (Instant, Arc<ApkIndex>)>>,
}

impl ApkIndexLoader {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            ttl: settings.apk_cache_ttl_duration(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Download and parse the index for an architecture, or return the
    /// cached copy while it is fresh.
    pub async fn load(&self, arch: &str) -> Result<Arc<ApkIndex>, ApkIndexError> {
        if !SUPPORTED_ARCHES.contains(&arch) {
            return Err(ApkIndexError::UnsupportedArch(arch.to_string()));
        }

        if let Some(cached) = self.cached(arch) {
            debug!("APK index cache hit for {}", arch);
            return Ok(cached);
        }

        let url = format!("{WOLFI_BASE_URL}/{arch}/APKINDEX.tar.gz");
        info!("Downloading APK index from {}", url);

        let response = self.http.get(&url).send().await?.error_for_status()?;
        let data = response.bytes().await?;

        let index = Arc::new(ApkIndex::parse(&data, arch)?);
        info!(
            "Parsed APK index for {}: {} packages",
            arch,
            index.packages().len()
        );

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(arch.to_string(), (Instant::now(), Arc::clone(&index)));
        }
        Ok(index)
    }

    fn cached(&self, arch: &str) -> Option<Arc<ApkIndex>> {
        let cache = self.cache.lock().ok()?;
        let (loaded_at, index) = cache.get(arch)?;
        if loaded_at.elapsed() < self.ttl {
            Some(Arc::clone(index))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
C:Q1abcdef
P:curl
V:8.11.0-r0
A:x86_64
S:12345
I:67890
T:URL retrieval utility and library
D:libcurl-openssl4 so:libc.so.6
p:cmd:curl=8.11.0-r0
o:curl

C:Q1ghijkl
P:curl-dev
V:8.11.0-r0
A:x86_64
T:curl development headers
D:curl

P:busybox
V:1.37.0-r0
A:x86_64
T:Size optimized toolbox of many common UNIX utilities
p:cmd:sh=1.37.0-r0 cmd:ash=1.37.0-r0
";

    fn index() -> ApkIndex {
        ApkIndex::from_packages(parse_index_text(SAMPLE, "x86_64"), "x86_64")
    }

    #[test]
    fn test_parse_records() {
        let index = index();
        assert_eq!(index.packages().len(), 3);

        let curl = index.get("curl").unwrap();
        assert_eq!(curl.version, "8.11.0-r0");
        assert_eq!(curl.size, 12345);
        assert_eq!(curl.installed_size, 67890);
        assert_eq!(curl.dependencies.len(), 2);
        assert_eq!(curl.provides, vec!["cmd:curl=8.11.0-r0"]);
        assert_eq!(curl.origin.as_deref(), Some("curl"));
    }

    #[test]
    fn test_record_without_name_is_skipped() {
        let packages = parse_index_text("V:1.0\nT:nameless\n", "x86_64");
        assert!(packages.is_empty());
    }

    #[test]
    fn test_search_priority_order() {
        let index = index();
        let results = index.search("curl", 10);
        // Exact name first, then prefix match
        assert_eq!(results[0].name, "curl");
        assert_eq!(results[1].name, "curl-dev");
    }

    #[test]
    fn test_search_description_fallback() {
        let index = index();
        let results = index.search("toolbox", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "busybox");
    }

    #[test]
    fn test_search_limit() {
        let index = index();
        assert_eq!(index.search("curl", 1).len(), 1);
    }

    #[test]
    fn test_search_provides_by_command() {
        let index = index();
        let results = index.search_provides("sh", Some("cmd"), 10);
        assert_eq!(results[0].name, "busybox");

        let results = index.search_provides("curl", Some("cmd"), 10);
        assert_eq!(results[0].name, "curl");
    }

    #[test]
    fn test_parse_roundtrip_through_archive() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(SAMPLE.len() as u64);
        header.set_cksum();
        builder
            .append_data(&mut header, "APKINDEX", SAMPLE.as_bytes())
            .unwrap();
        let data = builder.into_inner().unwrap().finish().unwrap();

        let index = ApkIndex::parse(&data, "x86_64").unwrap();
        assert_eq!(index.packages().len(), 3);
        assert!(index.get("busybox").is_some());
    }

    #[test]
    fn test_missing_index_member() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_cksum();
        builder
            .append_data(&mut header, "OTHER", "data".as_bytes())
            .unwrap();
        let data = builder.into_inner().unwrap().finish().unwrap();

        assert!(matches!(
            ApkIndex::parse(&data, "x86_64"),
            Err(ApkIndexError::MissingIndex)
        ));
    }
}
