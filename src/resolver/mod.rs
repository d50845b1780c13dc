use crate::chainctl::CatalogClient;
use crate::config::{CATALOG_REGISTRY, PUBLIC_ORG};
use crate::mappings::{AliasTable, GenericBaseSet, is_generic_base_image, lookup};
use crate::models::{
    ImageConfig, ImageResolution, Recommendation, TagLookupResult, Variant, VariantCapabilities,
    VerificationResult,
};
use crate::probe::{ImageProber, probe_variant_capabilities};
use crate::session::SelectionSession;
use crate::tags::{
    DISPLAY_TAG_LIMIT, MATCH_THRESHOLD, find_best_tag, has_slim_tags, sorted_tags, tag_variant,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Sequences the selection flow: organization, generic-base detection,
/// variant choice, tag resolution.
///
/// All collaborator access goes through the injected clients; every failure
/// is converted into a structured outcome carrying a message, never a raw
/// error, as long as a safe degraded result exists.
pub struct Resolver {
    catalog: Arc<dyn CatalogClient>,
    prober: Arc<dyn ImageProber>,
    session: Arc<SelectionSession>,
    aliases: Arc<AliasTable>,
    generic: Arc<GenericBaseSet>,
}

impl Resolver {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        prober: Arc<dyn ImageProber>,
        session: Arc<SelectionSession>,
        aliases: Arc<AliasTable>,
        generic: Arc<GenericBaseSet>,
    ) -> Self {
        Self {
            catalog,
            prober,
            session,
            aliases,
            generic,
        }
    }

    pub fn session(&self) -> &SelectionSession {
        &self.session
    }

    /// Make sure an organization is selected, running the auth flow when
    /// necessary.
    ///
    /// An explicitly requested organization must be one of the previously
    /// listed choices. With nothing requested: auth failure, an invalid
    /// session, or zero organizations fall back to the public registry; a
    /// single organization is auto-selected; several organizations produce
    /// an [`ImageResolution::OrgSelectionRequired`] carrying the complete
    /// list.
    pub async fn ensure_organization(
        &self,
        source_image: &str,
        requested: Option<&str>,
    ) -> Result<String, Box<ImageResolution>> {
        if let Some(org) = requested {
            if let Some(available) = self.session.available_orgs() {
                if !available.iter().any(|o| o == org) {
                    return Err(Box::new(ImageResolution::InvalidOrganization {
                        source_image: source_image.to_string(),
                        requested: org.to_string(),
                        message: format!(
                            "Organization '{}' is not in your available organizations. \
                             Available: {}",
                            org,
                            available.join(", ")
                        ),
                        available,
                    }));
                }
            }
            self.session.set_org(org);
        }

        if !self.session.is_org_selected() {
            match self.catalog.auth_status().await {
                Err(e) => {
                    warn!("Auth status unavailable, using public registry: {}", e);
                    self.session.set_org(PUBLIC_ORG);
                }
                Ok(status) if !status.valid || status.organizations.is_empty() => {
                    info!("Not authenticated or no organizations, using public registry");
                    self.session.set_org(PUBLIC_ORG);
                }
                Ok(status) => {
                    self.session.set_available_orgs(status.organizations.clone());
                    if let [only] = status.organizations.as_slice() {
                        self.session.set_org(only);
                    } else {
                        let org_list = status
                            .organizations
                            .iter()
                            .map(|org| format!("  - {org}"))
                            .collect::<Vec<_>>()
                            .join("\n");
                        return Err(Box::new(ImageResolution::OrgSelectionRequired {
                            source_image: source_image.to_string(),
                            // The complete list, never truncated
                            organizations: status.organizations,
                            message: format!(
                                "ORGANIZATION SELECTION REQUIRED\n\n\
                                 The following organizations are available:\n{org_list}\n\n\
                                 Retry with the organization parameter set to one of them."
                            ),
                        }));
                    }
                }
            }
        }

        Ok(self.session.org().unwrap_or_else(|| PUBLIC_ORG.to_string()))
    }

    /// Find the catalog equivalent for a source image reference, walking the
    /// whole selection flow as far as the supplied parameters allow.
    pub async fn find_equivalent_image(
        &self,
        source_image_and_tag: &str,
        organization: Option<&str>,
        variant: Option<&str>,
    ) -> ImageResolution {
        let original_tag = parse_image_reference(source_image_and_tag).1;

        let org = match self
            .ensure_organization(source_image_and_tag, organization)
            .await
        {
            Ok(org) => org,
            Err(resolution) => return *resolution,
        };

        let is_public = org == PUBLIC_ORG;
        let public_warning = if is_public {
            format!("{}\n\n", public_registry_warning())
        } else {
            String::new()
        };

        let matches = lookup(&self.aliases, source_image_and_tag);
        if matches.is_empty() {
            return ImageResolution::NoMatch {
                source_image: source_image_and_tag.to_string(),
                original_tag,
                message: format!(
                    "No known catalog equivalent for '{source_image_and_tag}'. \
                     Try describing the workload type instead (e.g. 'python', 'node', 'nginx')."
                ),
            };
        }

        let catalog_name = matches[0].catalog_image.clone();
        let catalog_image = format!("{CATALOG_REGISTRY}/{org}/{catalog_name}");

        if is_generic_base_image(&self.generic, source_image_and_tag) {
            return ImageResolution::GenericBase {
                source_image: source_image_and_tag.to_string(),
                catalog_image,
                catalog_image_name: catalog_name.clone(),
                original_tag,
                guidance: generic_base_guidance().to_string(),
                message: format!(
                    "{public_warning}Matched to '{catalog_name}' but this is a generic base image."
                ),
            };
        }

        let tag_names = match self.catalog.list_tags(&catalog_name, &org).await {
            Ok(tags) => tags.into_iter().map(|t| t.tag).collect::<Vec<_>>(),
            Err(e) => {
                // The image match itself is still useful
                return ImageResolution::TagsUnavailable {
                    source_image: source_image_and_tag.to_string(),
                    catalog_image,
                    catalog_image_name: catalog_name,
                    original_tag,
                    message: format!("{public_warning}Found match but failed to list tags: {e}"),
                };
            }
        };

        let has_slim = has_slim_tags(&tag_names);
        let available_variants = available_variants(has_slim);

        let variant_capabilities = probe_variant_capabilities(
            self.prober.as_ref(),
            &self.session,
            &catalog_name,
            &org,
            &tag_names,
            &original_tag,
        )
        .await;

        // Validate the requested variant, if any
        let requested_variant = match variant {
            Some(raw) => match raw.parse::<Variant>() {
                Ok(parsed) => {
                    if parsed == Variant::Slim && !has_slim {
                        return ImageResolution::InvalidVariant {
                            source_image: source_image_and_tag.to_string(),
                            catalog_image,
                            catalog_image_name: catalog_name.clone(),
                            original_tag,
                            requested: raw.to_string(),
                            available_variants,
                            variant_capabilities,
                            message: format!(
                                "No -slim tags available for {catalog_name}. \
                                 Choose 'distroless' (no shell) or 'dev' (shell + apk)."
                            ),
                        };
                    }
                    Some(parsed)
                }
                Err(e) => {
                    return ImageResolution::InvalidVariant {
                        source_image: source_image_and_tag.to_string(),
                        catalog_image,
                        catalog_image_name: catalog_name,
                        original_tag,
                        requested: raw.to_string(),
                        available_variants,
                        variant_capabilities,
                        message: e.to_string(),
                    };
                }
            },
            None => None,
        };

        // No variant requested: hand the probed summary back for a human
        // decision, never pick a default
        let Some(preferred_variant) = requested_variant else {
            let caps = format_variant_capabilities(&variant_capabilities);
            return ImageResolution::VariantSelectionRequired {
                source_image: source_image_and_tag.to_string(),
                catalog_image: catalog_image.clone(),
                catalog_image_name: catalog_name,
                original_tag: original_tag.clone(),
                available_variants,
                variant_capabilities,
                message: format!(
                    "VARIANT SELECTION REQUIRED\n\n\
                     Found catalog image: {catalog_image}\n\
                     Original tag: {original_tag}\n\n\
                     Available variants with capabilities:\n{caps}\n\n\
                     Retry with the variant parameter set to one of the listed variants."
                ),
            };
        };

        let (best_tag, score) = find_best_tag(&original_tag, &tag_names, preferred_variant);

        let best_tag = match best_tag {
            Some(tag) if score >= MATCH_THRESHOLD => tag.to_string(),
            _ => {
                let available_tags =
                    sorted_tags(&original_tag, &tag_names, preferred_variant, DISPLAY_TAG_LIMIT);
                let shown = available_tags.len().min(10);
                let more = if available_tags.len() > 10 { "..." } else { "" };
                return ImageResolution::NoSuitableTag {
                    source_image: source_image_and_tag.to_string(),
                    catalog_image,
                    catalog_image_name: catalog_name,
                    original_tag: original_tag.clone(),
                    variant: preferred_variant,
                    message: format!(
                        "No suitable tag match found for '{}' with variant '{}'. \
                         Available tags: {}{}",
                        original_tag,
                        preferred_variant,
                        available_tags[..shown].join(", "),
                        more
                    ),
                    available_tags,
                    variant_capabilities,
                };
            }
        };

        let full_ref = format!("{catalog_image}:{best_tag}");
        let matched_variant = tag_variant(&best_tag);

        let mut messages = Vec::new();
        if is_public {
            messages.push(public_registry_warning().to_string());
        }
        if score < 1.0 {
            messages.push(format!(
                "Matched '{}' to '{}' (confidence: {:.0}%)",
                original_tag,
                best_tag,
                score * 100.0
            ));
        }
        if preferred_variant != matched_variant {
            messages.push(format!(
                "Note: '{preferred_variant}' variant was requested but '{best_tag}' was the \
                 best version match."
            ));
        }

        info!(
            "Resolved '{}' to '{}' (score {:.2})",
            source_image_and_tag, full_ref, score
        );

        ImageResolution::Resolved {
            source_image: source_image_and_tag.to_string(),
            catalog_image,
            catalog_image_name: catalog_name,
            original_tag,
            matched_tag: best_tag,
            recommendation: format!("Use {full_ref}"),
            full_ref,
            score,
            variant: matched_variant,
            available_variants,
            variant_capabilities,
            message: messages.join(" "),
        }
    }

    /// Find the best matching catalog tag for an original tag.
    ///
    /// Requires an organization to have been selected already.
    pub async fn lookup_tag(
        &self,
        catalog_image: &str,
        original_image: &str,
        original_tag: &str,
        variant: &str,
    ) -> TagLookupResult {
        let preferred_variant = match variant.parse::<Variant>() {
            Ok(parsed) => parsed,
            Err(e) => {
                return TagLookupResult::not_found(
                    catalog_image,
                    original_image,
                    original_tag,
                    e.to_string(),
                );
            }
        };

        let Some(org) = self.session.org() else {
            return TagLookupResult::not_found(
                catalog_image,
                original_image,
                original_tag,
                "No organization selected. Run an image lookup first to select an organization.",
            );
        };

        let tag_names = match self.catalog.list_tags(catalog_image, &org).await {
            Ok(tags) => tags.into_iter().map(|t| t.tag).collect::<Vec<_>>(),
            Err(e) => {
                return TagLookupResult::not_found(
                    catalog_image,
                    original_image,
                    original_tag,
                    format!("Failed to list tags: {e}"),
                );
            }
        };

        if tag_names.is_empty() {
            return TagLookupResult::not_found(
                catalog_image,
                original_image,
                original_tag,
                format!("No tags found for {CATALOG_REGISTRY}/{org}/{catalog_image}"),
            );
        }

        let has_slim = has_slim_tags(&tag_names);
        if preferred_variant == Variant::Slim && !has_slim {
            return TagLookupResult {
                available_tags: sorted_tags(
                    original_tag,
                    &tag_names,
                    Variant::Distroless,
                    DISPLAY_TAG_LIMIT,
                ),
                variant: Some(preferred_variant),
                message: Some(format!(
                    "No -slim tags available for {catalog_image}. \
                     Choose 'distroless' (no shell) or 'dev' (shell + apk)."
                )),
                ..TagLookupResult::not_found(catalog_image, original_image, original_tag, "")
            };
        }

        let (best_tag, score) = find_best_tag(original_tag, &tag_names, preferred_variant);
        let display_tags = sorted_tags(original_tag, &tag_names, preferred_variant, DISPLAY_TAG_LIMIT);

        // Probe around the best tag when there is one, otherwise around the
        // original request
        let base_version = best_tag.unwrap_or(original_tag).to_string();
        let variant_capabilities = probe_variant_capabilities(
            self.prober.as_ref(),
            &self.session,
            catalog_image,
            &org,
            &tag_names,
            &base_version,
        )
        .await;

        let best_tag = match best_tag {
            Some(tag) if score >= MATCH_THRESHOLD => tag.to_string(),
            _ => {
                let shown = display_tags.len().min(10);
                let more = if display_tags.len() > 10 { "..." } else { "" };
                return TagLookupResult {
                    available_tags: display_tags.clone(),
                    variant: Some(preferred_variant),
                    has_slim_variant: has_slim,
                    variant_capabilities,
                    message: Some(format!(
                        "No suitable tag match found for '{}'. Available tags: {}{}",
                        original_tag,
                        display_tags[..shown].join(", "),
                        more
                    )),
                    ..TagLookupResult::not_found(catalog_image, original_image, original_tag, "")
                };
            }
        };

        let matched_variant = tag_variant(&best_tag);
        let mut messages = Vec::new();
        if score < 1.0 {
            messages.push(format!(
                "Matched '{}' to '{}' (confidence: {:.0}%)",
                original_tag,
                best_tag,
                score * 100.0
            ));
        }
        if preferred_variant != matched_variant {
            let suffix = preferred_variant.tag_suffix().unwrap_or("");
            messages.push(format!(
                "Note: '{preferred_variant}' variant was requested but '{best_tag}' was the best \
                 version match. You may want to use '{original_tag}{suffix}' if available."
            ));
        }
        if !variant_capabilities.is_empty() {
            let mut caps = variant_capabilities.clone();
            caps.sort_by_key(|c| c.variant);
            let summary = caps
                .iter()
                .map(|c| {
                    format!(
                        "{}({}): {}, {}",
                        c.variant,
                        c.probed_tag,
                        if c.has_shell { "shell" } else { "no shell" },
                        if c.has_apk { "apk" } else { "no apk" },
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");
            messages.push(format!("Variant capabilities: {summary}"));
        }

        TagLookupResult {
            found: true,
            catalog_image: catalog_image.to_string(),
            original_image: original_image.to_string(),
            original_tag: original_tag.to_string(),
            full_ref: Some(format!(
                "{CATALOG_REGISTRY}/{org}/{catalog_image}:{best_tag}"
            )),
            matched_tag: Some(best_tag),
            available_tags: display_tags,
            variant: Some(matched_variant),
            has_slim_variant: has_slim,
            variant_capabilities,
            message: if messages.is_empty() {
                None
            } else {
                Some(messages.join(" "))
            },
        }
    }

    /// Verify that a full image reference exists and report its
    /// configuration.
    pub async fn verify_tag(&self, image_reference: &str) -> VerificationResult {
        let Some(org) = self.session.org() else {
            return VerificationResult::not_found(
                image_reference,
                "No organization selected. Run an image lookup first to select an organization.",
            );
        };

        let expected_prefix = format!("{CATALOG_REGISTRY}/");
        if !image_reference.starts_with(&expected_prefix) {
            return VerificationResult::not_found(
                image_reference,
                format!(
                    "Image reference must start with '{expected_prefix}'. \
                     Example: {CATALOG_REGISTRY}/{org}/python:3.12"
                ),
            );
        }

        let public_prefix = format!("{CATALOG_REGISTRY}/{PUBLIC_ORG}/");
        if org != PUBLIC_ORG && image_reference.starts_with(&public_prefix) {
            return VerificationResult::not_found(
                image_reference,
                format!(
                    "Do not use '{public_prefix}'. Use your organization: \
                     {CATALOG_REGISTRY}/{org}/<image>:<tag>"
                ),
            );
        }

        match self.catalog.resolve_tag(image_reference).await {
            Ok(Some(resolved)) => {
                let config = self.prober.get_config(image_reference).await;
                let entrypoint_guidance = config.as_ref().map(entrypoint_guidance);
                VerificationResult {
                    exists: true,
                    image_reference: image_reference.to_string(),
                    digest: Some(resolved.digest),
                    config,
                    entrypoint_guidance,
                    message: None,
                }
            }
            Ok(None) => VerificationResult::not_found(
                image_reference,
                "Image or tag not found in the catalog registry.",
            ),
            Err(e) => {
                VerificationResult::not_found(image_reference, format!("Failed to verify image: {e}"))
            }
        }
    }
}

/// Split a source reference into (name, tag); the tag defaults to "latest".
pub fn parse_image_reference(source: &str) -> (String, String) {
    let (name, tag) = match source.rfind('/') {
        Some(last_slash) => match source[last_slash..].find(':') {
            Some(colon) => {
                let split = last_slash + colon;
                (&source[..split], &source[split + 1..])
            }
            None => (source, "latest"),
        },
        None => match source.split_once(':') {
            Some((name, tag)) => (name, tag),
            None => (source, "latest"),
        },
    };
    (name.to_string(), tag.to_string())
}

fn available_variants(has_slim: bool) -> Vec<Variant> {
    if has_slim {
        vec![Variant::Distroless, Variant::Slim, Variant::Dev]
    } else {
        vec![Variant::Distroless, Variant::Dev]
    }
}

fn generic_base_guidance() -> &'static str {
    "This is a generic base image; use a workload-specific catalog image instead.\n\
     \n\
     Review the Dockerfile to identify the primary workload installed onto this base image, \
     then retry with that workload type (e.g. 'python', 'node', 'jdk', 'nginx', 'postgres').\n\
     \n\
     If the Dockerfile only runs shell scripts without installing a runtime, use 'chainguard-base'.\n\
     If it copies in a static binary with no shell needed, use 'static'."
}

fn public_registry_warning() -> &'static str {
    "USING PUBLIC REGISTRY (cgr.dev/chainguard/)\n\
     \n\
     chainctl is not authenticated or no organization is available. \
     Falling back to the public catalog registry.\n\
     \n\
     Limitations:\n\
     - Only 'latest' and 'latest-dev' tags are available\n\
     - Only a subset of images are publicly available\n\
     - No access to versioned tags (e.g., python:3.12)\n\
     \n\
     To access versioned tags and the full image catalog, run:\n\
     \x20\x20chainctl auth login\n\
     \n\
     Then select your organization and retry."
}

/// Order capability entries for display: production recommendation first,
/// then unrecommended, then development; ties by variant order.
fn format_variant_capabilities(capabilities: &[VariantCapabilities]) -> String {
    let mut sorted: Vec<&VariantCapabilities> = capabilities.iter().collect();
    sorted.sort_by_key(|c| {
        let rec_order = match c.recommended_for {
            Some(Recommendation::Production) => 0,
            None => 1,
            Some(Recommendation::Development) => 2,
        };
        (rec_order, c.variant)
    });

    let mut lines = Vec::new();
    for cap in sorted {
        let badge = match cap.recommended_for {
            Some(Recommendation::Production) => " [RECOMMENDED for production]",
            Some(Recommendation::Development) => " [RECOMMENDED for development]",
            None => "",
        };
        lines.push(format!(
            "  - {}: {}, {}{}",
            cap.variant,
            if cap.has_shell { "shell" } else { "no shell" },
            if cap.has_apk { "apk" } else { "no apk" },
            badge
        ));
        if !cap.description.is_empty() {
            lines.push(format!("      {}", cap.description));
        }
    }
    lines.join("\n")
}

fn entrypoint_guidance(config: &ImageConfig) -> String {
    match &config.entrypoint {
        Some(entrypoint) if !entrypoint.is_empty() => format!(
            "This image sets ENTRYPOINT [{}]. Catalog images often differ from the original \
             image's entrypoint; CMD arguments are appended to it. Override ENTRYPOINT \
             explicitly if your Dockerfile expects a different launcher.",
            entrypoint.join(", ")
        ),
        _ => "This image sets no ENTRYPOINT; provide the full command via CMD or set an \
              ENTRYPOINT in your Dockerfile."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recommendation;

    #[test]
    fn test_parse_image_reference() {
        assert_eq!(
            parse_image_reference("python:3.12"),
            ("python".to_string(), "3.12".to_string())
        );
        assert_eq!(
            parse_image_reference("python"),
            ("python".to_string(), "latest".to_string())
        );
        assert_eq!(
            parse_image_reference("ghcr.io/grafana/grafana:10.2.3"),
            ("ghcr.io/grafana/grafana".to_string(), "10.2.3".to_string())
        );
        // A port colon is not a tag separator
        assert_eq!(
            parse_image_reference("registry.example.com:5000/myapp"),
            ("registry.example.com:5000/myapp".to_string(), "latest".to_string())
        );
    }

    #[test]
    fn test_available_variants() {
        assert_eq!(
            available_variants(true),
            vec![Variant::Distroless, Variant::Slim, Variant::Dev]
        );
        assert_eq!(
            available_variants(false),
            vec![Variant::Distroless, Variant::Dev]
        );
    }

    #[test]
    fn test_format_variant_capabilities_order() {
        let caps = vec![
            VariantCapabilities {
                variant: Variant::Dev,
                has_shell: true,
                has_apk: true,
                probed_tag: "20-dev".to_string(),
                description: String::new(),
                recommended_for: Some(Recommendation::Development),
            },
            VariantCapabilities {
                variant: Variant::Distroless,
                has_shell: false,
                has_apk: false,
                probed_tag: "20".to_string(),
                description: String::new(),
                recommended_for: Some(Recommendation::Production),
            },
        ];
        let formatted = format_variant_capabilities(&caps);
        let distroless_pos = formatted.find("distroless").unwrap();
        let dev_pos = formatted.find("dev:").unwrap();
        assert!(distroless_pos < dev_pos);
        assert!(formatted.contains("[RECOMMENDED for production]"));
    }
}
