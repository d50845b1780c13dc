use once_cell::sync::Lazy;
use regex::Regex;

/// Static registry prefixes to strip (order matters - more specific first).
pub const STATIC_REGISTRY_PREFIXES: [&str; 14] = [
    "docker.io/library/",
    "docker.io/",
    "index.docker.io/library/",
    "index.docker.io/",
    "library/",
    "registry.access.redhat.com/",
    "registry.redhat.io/",
    "quay.io/",
    "gcr.io/",
    "ghcr.io/",
    "public.ecr.aws/",
    "mcr.microsoft.com/",
    "cgr.dev/chainguard/",
    "cgr.dev/",
];

/// Patterns for registries where the hostname varies (ECR, GCR with project,
/// ACR, Harbor, generic internal registries). Tried in order, only after no
/// static prefix matched.
pub static DYNAMIC_REGISTRY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // AWS ECR: 123456789012.dkr.ecr.us-east-1.amazonaws.com/image
        r"^\d+\.dkr\.ecr\.[a-z0-9-]+\.amazonaws\.com/",
        // GCR with project: gcr.io/project-name/image or us.gcr.io/project/image
        r"^(us\.|eu\.|asia\.)?gcr\.io/[^/]+/",
        // Google Artifact Registry: us-docker.pkg.dev/project/repo/image
        r"^[a-z0-9-]+-docker\.pkg\.dev/[^/]+/[^/]+/",
        // Azure ACR: myregistry.azurecr.io/image
        r"^[a-z0-9]+\.azurecr\.io/",
        // Harbor or generic registry with port: registry.example.com:5000/image
        r"^[a-z0-9.-]+:\d+/",
        // Generic internal registry with path: registry.example.com/org/image
        r"^[a-z0-9.-]+\.[a-z]{2,}/[^/]+/",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static registry pattern"))
    .collect()
});

/// Strip a known registry prefix from an already-lowercased image name.
///
/// Static prefixes win over dynamic patterns; the two tiers are mutually
/// exclusive per call.
fn strip_registry_prefix(image: &str) -> &str {
    for prefix in STATIC_REGISTRY_PREFIXES {
        if let Some(rest) = image.strip_prefix(prefix) {
            return rest;
        }
    }

    for pattern in DYNAMIC_REGISTRY_PATTERNS.iter() {
        if let Some(m) = pattern.find(image) {
            return &image[m.end()..];
        }
    }

    image
}

/// Normalize an image reference to a canonical lowercase name for lookup.
///
/// Strips digests, tags, and registry prefixes. Total: any input yields some
/// string, at worst the lowercased input unchanged.
pub fn normalize_image_name(source_image: &str) -> String {
    let mut image_name = source_image.to_lowercase();

    // Remove a digest suffix if present
    if let Some(at) = image_name.find('@') {
        image_name.truncate(at);
    }

    // Remove the tag, careful with registry ports like :5000. A colon only
    // separates the tag when it appears after the last slash.
    if let Some(last_slash) = image_name.rfind('/') {
        if let Some(colon) = image_name[last_slash..].find(':') {
            image_name.truncate(last_slash + colon);
        }
    } else if let Some(colon) = image_name.find(':') {
        image_name.truncate(colon);
    }

    strip_registry_prefix(&image_name).to_string()
}
