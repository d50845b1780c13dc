use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Capability tier of a catalog tag, inferred from suffix markers on the tag
/// string. Ordered by increasing capability: distroless carries no shell or
/// package manager, slim adds a shell, dev adds the apk package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Distroless,
    Slim,
    Dev,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Distroless, Variant::Slim, Variant::Dev];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Distroless => "distroless",
            Variant::Slim => "slim",
            Variant::Dev => "dev",
        }
    }

    /// Tag suffix that marks this variant, if any.
    pub fn tag_suffix(&self) -> Option<&'static str> {
        match self {
            Variant::Distroless => None,
            Variant::Slim => Some("-slim"),
            Variant::Dev => Some("-dev"),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Invalid variant '{0}'. Must be 'distroless', 'slim', or 'dev'.")]
pub struct VariantError(pub String);

impl FromStr for Variant {
    type Err = VariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "distroless" => Ok(Variant::Distroless),
            "slim" => Ok(Variant::Slim),
            "dev" => Ok(Variant::Dev),
            _ => Err(VariantError(s.to_string())),
        }
    }
}

/// A matched catalog image with similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMatch {
    pub catalog_image: String,
    pub matched_alias: String,
    /// 1.0 = exact match, lower = fuzzy match. Never negative.
    pub score: f64,
}

/// What a variant is suited for, derived from probed capabilities only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Production,
    Development,
}

/// Probed capabilities of a single variant.
///
/// Instances only exist for variants that were actually probed; a failed
/// probe is omitted from result sets rather than reported as all-false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantCapabilities {
    pub variant: Variant,
    pub has_shell: bool,
    pub has_apk: bool,
    /// The tag that was probed to stand in for this variant.
    pub probed_tag: String,
    pub description: String,
    pub recommended_for: Option<Recommendation>,
}

/// Container image configuration reported by the inspection collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    pub entrypoint: Option<Vec<String>>,
    pub cmd: Option<Vec<String>>,
    pub user: Option<String>,
    pub workdir: Option<String>,
    #[serde(default)]
    pub env: Vec<String>,
    pub has_shell: bool,
    pub has_apk: bool,
}

/// Outcome of an equivalent-image resolution.
///
/// Each stage of the selection flow produces its own shape, so the fields a
/// caller can rely on are fixed by the variant rather than by which code path
/// happened to populate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageResolution {
    /// Multiple organizations are available; the caller must pick one.
    /// The list is always complete, never truncated.
    OrgSelectionRequired {
        source_image: String,
        organizations: Vec<String>,
        message: String,
    },
    /// The supplied organization is not among the available ones.
    InvalidOrganization {
        source_image: String,
        requested: String,
        available: Vec<String>,
        message: String,
    },
    /// No catalog equivalent cleared the fuzzy threshold.
    NoMatch {
        source_image: String,
        original_tag: String,
        message: String,
    },
    /// The source is a generic OS base image; a workload-specific image
    /// should be chosen instead of a 1:1 mapping.
    GenericBase {
        source_image: String,
        catalog_image: String,
        catalog_image_name: String,
        original_tag: String,
        guidance: String,
        message: String,
    },
    /// An image matched but its tags could not be listed.
    TagsUnavailable {
        source_image: String,
        catalog_image: String,
        catalog_image_name: String,
        original_tag: String,
        message: String,
    },
    /// The supplied variant string is unknown, or the variant has no tags.
    InvalidVariant {
        source_image: String,
        catalog_image: String,
        catalog_image_name: String,
        original_tag: String,
        requested: String,
        available_variants: Vec<Variant>,
        variant_capabilities: Vec<VariantCapabilities>,
        message: String,
    },
    /// No variant was requested; the caller must pick one from the probed
    /// capability summary.
    VariantSelectionRequired {
        source_image: String,
        catalog_image: String,
        catalog_image_name: String,
        original_tag: String,
        available_variants: Vec<Variant>,
        variant_capabilities: Vec<VariantCapabilities>,
        message: String,
    },
    /// No candidate tag cleared the acceptance threshold.
    NoSuitableTag {
        source_image: String,
        catalog_image: String,
        catalog_image_name: String,
        original_tag: String,
        variant: Variant,
        available_tags: Vec<String>,
        variant_capabilities: Vec<VariantCapabilities>,
        message: String,
    },
    /// Fully resolved to a catalog image and tag.
    Resolved {
        source_image: String,
        catalog_image: String,
        catalog_image_name: String,
        original_tag: String,
        matched_tag: String,
        full_ref: String,
        score: f64,
        variant: Variant,
        available_variants: Vec<Variant>,
        variant_capabilities: Vec<VariantCapabilities>,
        recommendation: String,
        message: String,
    },
}

impl ImageResolution {
    /// The human-readable message carried by every outcome.
    pub fn message(&self) -> &str {
        match self {
            ImageResolution::OrgSelectionRequired { message, .. }
            | ImageResolution::InvalidOrganization { message, .. }
            | ImageResolution::NoMatch { message, .. }
            | ImageResolution::GenericBase { message, .. }
            | ImageResolution::TagsUnavailable { message, .. }
            | ImageResolution::InvalidVariant { message, .. }
            | ImageResolution::VariantSelectionRequired { message, .. }
            | ImageResolution::NoSuitableTag { message, .. }
            | ImageResolution::Resolved { message, .. } => message,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ImageResolution::Resolved { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_from_str() {
        assert_eq!("distroless".parse::<Variant>().unwrap(), Variant::Distroless);
        assert_eq!("SLIM".parse::<Variant>().unwrap(), Variant::Slim);
        assert_eq!("dev".parse::<Variant>().unwrap(), Variant::Dev);
        assert!("full".parse::<Variant>().is_err());
    }

    #[test]
    fn test_variant_ordering() {
        assert!(Variant::Distroless < Variant::Slim);
        assert!(Variant::Slim < Variant::Dev);
    }

    #[test]
    fn test_resolution_serializes_with_status_tag() {
        let resolution = ImageResolution::NoMatch {
            source_image: "mystery".to_string(),
            original_tag: "latest".to_string(),
            message: "No known catalog equivalent for 'mystery'.".to_string(),
        };
        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["status"], "no_match");
        assert_eq!(json["source_image"], "mystery");
    }
}
