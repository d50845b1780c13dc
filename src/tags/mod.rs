pub mod score;

pub use score::{
    DISPLAY_TAG_LIMIT, MATCH_THRESHOLD, find_best_tag, has_slim_tags, score_tag_match, sorted_tags,
};

use crate::models::Variant;
use once_cell::sync::Lazy;
use regex::Regex;

/// A tag decomposed into literal prefix, numeric version components, and
/// trailing suffix.
///
/// Reassembly is not guaranteed to reproduce the original string verbatim;
/// the numeric components carry left-to-right significance (major, minor,
/// patch, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedTag {
    pub prefix: String,
    pub version_parts: Vec<u64>,
    pub suffix: String,
}

// Version numbers at the start of the tag (standard format)
static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)*)(.*)$").expect("version pattern"));

// Version numbers after a literal prefix ending in '-'
static PREFIXED_VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?-)(\d+(?:\.\d+)*)(.*)$").expect("prefixed version pattern"));

/// Vendor spellings a JDK major version can hide in, tried in order. The
/// order matters: some vendor names contain generic substrings ("openjdk"
/// contains "jdk"), so more specific patterns come first.
static JDK_VENDOR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:eclipse-)?temurin-(\d+)",  // temurin-17, eclipse-temurin-17
        r"(?:amazon-)?corretto-?(\d+)", // corretto-17, amazon-corretto-17
        r"openjdk-?(\d+)",              // openjdk-17, openjdk17
        r"jdk-?(\d+)",                  // jdk17, jdk-17
        r"jre-?(\d+)",                  // jre17, jre-17
        r"java-?(\d+)",                 // java17, java-17
    ]
    .iter()
    .map(|p| Regex::new(p).expect("jdk vendor pattern"))
    .collect()
});

fn parse_parts(version: &str) -> Option<Vec<u64>> {
    version.split('.').map(|p| p.parse().ok()).collect()
}

/// Parse a version tag into numeric components, suffix, and prefix.
///
/// Total: a tag with no recognizable version becomes all-suffix.
///
/// Examples:
///   "3.12"                         -> [3, 12] / "" / ""
///   "3.12-dev"                     -> [3, 12] / "-dev" / ""
///   "latest"                       -> [] / "latest" / ""
///   "18-alpine"                    -> [18] / "-alpine" / ""
///   "adoptium-openjdk-17.0.13-dev" -> [17, 0, 13] / "-dev" / "adoptium-openjdk-"
pub fn parse_version(tag: &str) -> ParsedTag {
    if let Some(caps) = VERSION_PATTERN.captures(tag) {
        if let Some(parts) = parse_parts(&caps[1]) {
            return ParsedTag {
                prefix: String::new(),
                version_parts: parts,
                suffix: caps[2].to_string(),
            };
        }
    }

    if let Some(caps) = PREFIXED_VERSION_PATTERN.captures(tag) {
        if let Some(parts) = parse_parts(&caps[2]) {
            return ParsedTag {
                prefix: caps[1].to_string(),
                version_parts: parts,
                suffix: caps[3].to_string(),
            };
        }
    }

    ParsedTag {
        prefix: String::new(),
        version_parts: Vec::new(),
        suffix: tag.to_string(),
    }
}

/// Extract a JDK/Java major version from vendor-specific tag spellings.
pub fn extract_jdk_version(tag: &str) -> Option<u64> {
    let tag_lower = tag.to_lowercase();
    for pattern in JDK_VENDOR_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(&tag_lower) {
            if let Ok(version) = caps[1].parse() {
                return Some(version);
            }
        }
    }
    None
}

/// Infer the variant of a tag from its suffix markers. No marker means
/// distroless.
pub fn tag_variant(tag: &str) -> Variant {
    let tag_lower = tag.to_lowercase();
    if tag_lower.contains("-dev") {
        Variant::Dev
    } else if tag_lower.contains("-slim") {
        Variant::Slim
    } else {
        Variant::Distroless
    }
}
