pub mod crane;

pub use crane::CraneProber;

use crate::config::CATALOG_REGISTRY;
use crate::models::{ImageConfig, Recommendation, Variant, VariantCapabilities};
use crate::session::SelectionSession;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Inspects image filesystems and configuration.
///
/// `None` means the probe could not run (tool missing, timeout, non-zero
/// exit) - absence of data, never to be confused with absent capabilities.
#[async_trait]
pub trait ImageProber: Send + Sync {
    /// Report (has_shell, has_apk) for a fully-qualified reference.
    async fn probe_capabilities(&self, image_ref: &str) -> Option<(bool, bool)>;

    /// Structured container configuration for a reference.
    async fn get_config(&self, image_ref: &str) -> Option<ImageConfig>;
}

/// Find the representative tag to probe for each variant, given a base
/// version already chosen for the image.
///
/// For a base like "23" the candidates are "23", "23-slim", "23-dev". Any
/// variant not present falls back to its "latest" family tag. A slim variant
/// that is still unresolved picks the lexicographically smallest `-slim` tag
/// in the set, since slim tags are not guaranteed to exist per version.
pub fn representative_tags(
    tags: &[String],
    base_version: &str,
) -> BTreeMap<Variant, Option<String>> {
    let tags_lower: HashMap<String, &String> =
        tags.iter().map(|t| (t.to_lowercase(), t)).collect();

    let mut base = base_version.to_lowercase();
    for suffix in ["-dev", "-slim"] {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped.to_string();
            break;
        }
    }

    let mut result: BTreeMap<Variant, Option<String>> = Variant::ALL
        .iter()
        .map(|v| {
            let wanted = match v.tag_suffix() {
                Some(suffix) => format!("{base}{suffix}"),
                None => base.clone(),
            };
            (*v, tags_lower.get(&wanted).map(|t| (*t).clone()))
        })
        .collect();

    // Fall back to the latest family for anything missing
    if base != "latest" {
        for variant in Variant::ALL {
            if result[&variant].is_none() {
                let wanted = match variant.tag_suffix() {
                    Some(suffix) => format!("latest{suffix}"),
                    None => "latest".to_string(),
                };
                if let Some(tag) = tags_lower.get(&wanted) {
                    result.insert(variant, Some((*tag).clone()));
                }
            }
        }
    }

    // Last resort for slim: any -slim tag, smallest first for determinism
    if result[&Variant::Slim].is_none() {
        let fallback = tags_lower
            .iter()
            .filter(|(lower, _)| lower.ends_with("-slim"))
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, original)| (*original).clone());
        result.insert(Variant::Slim, fallback);
    }

    result
}

/// Describe a variant from its probed capabilities.
///
/// The recommendation reflects observed capability only, never the variant's
/// name: an image whose actual shell/apk availability differs from its
/// naming convention is described by what it really carries.
pub fn variant_description(has_shell: bool, has_apk: bool) -> (&'static str, Option<Recommendation>) {
    if has_apk {
        (
            "Full image with shell and apk package manager. Use for building or when you need to install packages.",
            Some(Recommendation::Development),
        )
    } else if has_shell {
        (
            "Minimal image with shell but no package manager. Good for apps requiring shell.",
            None,
        )
    } else {
        (
            "Smallest image, no shell, no apk. Best for production with minimal attack surface.",
            Some(Recommendation::Production),
        )
    }
}

/// Probe capabilities for a reference, going through the session cache.
///
/// The cache lookup and the store are each synchronous units; only the probe
/// itself suspends.
pub async fn probe_cached(
    prober: &dyn ImageProber,
    session: &SelectionSession,
    image_ref: &str,
) -> Option<(bool, bool)> {
    if let Some(cached) = session.cached_capabilities(image_ref) {
        debug!("Capability cache hit for {}", image_ref);
        return Some(cached);
    }

    let (has_shell, has_apk) = prober.probe_capabilities(image_ref).await?;
    session.cache_capabilities(image_ref, has_shell, has_apk);
    Some((has_shell, has_apk))
}

/// Probe the representative tag of every variant and aggregate the results.
///
/// The probes are started together and awaited jointly, so latency is
/// bounded by the slowest probe. Each result is paired with its originating
/// variant explicitly; a failed probe is omitted from the output.
pub async fn probe_variant_capabilities(
    prober: &dyn ImageProber,
    session: &SelectionSession,
    image_name: &str,
    org: &str,
    tags: &[String],
    base_version: &str,
) -> Vec<VariantCapabilities> {
    let representatives = representative_tags(tags, base_version);

    let probes = representatives
        .into_iter()
        .filter_map(|(variant, tag)| tag.map(|t| (variant, t)))
        .map(|(variant, tag)| async move {
            let image_ref = format!("{CATALOG_REGISTRY}/{org}/{image_name}:{tag}");
            let (has_shell, has_apk) = probe_cached(prober, session, &image_ref).await?;
            let (description, recommended_for) = variant_description(has_shell, has_apk);
            Some(VariantCapabilities {
                variant,
                has_shell,
                has_apk,
                probed_tag: tag,
                description: description.to_string(),
                recommended_for,
            })
        });

    futures::future::join_all(probes)
        .await
        .into_iter()
        .flatten()
        .collect()
}
