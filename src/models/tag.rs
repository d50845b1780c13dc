use super::image::{ImageConfig, Variant, VariantCapabilities};
use serde::{Deserialize, Serialize};

/// Result of tag lookup/matching against a catalog image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagLookupResult {
    pub found: bool,
    pub catalog_image: String,
    pub original_image: String,
    pub original_tag: String,
    pub matched_tag: Option<String>,
    /// Full image reference (e.g. `cgr.dev/org/python:3.12`), suitable for
    /// verification.
    pub full_ref: Option<String>,
    #[serde(default)]
    pub available_tags: Vec<String>,
    /// Variant of the matched tag.
    pub variant: Option<Variant>,
    /// True if any `-slim` tags exist for this image.
    pub has_slim_variant: bool,
    #[serde(default)]
    pub variant_capabilities: Vec<VariantCapabilities>,
    pub message: Option<String>,
}

impl TagLookupResult {
    /// A not-found result carrying only the lookup inputs and a message.
    pub fn not_found(
        catalog_image: &str,
        original_image: &str,
        original_tag: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            found: false,
            catalog_image: catalog_image.to_string(),
            original_image: original_image.to_string(),
            original_tag: original_tag.to_string(),
            matched_tag: None,
            full_ref: None,
            available_tags: Vec::new(),
            variant: None,
            has_slim_variant: false,
            variant_capabilities: Vec::new(),
            message: Some(message.into()),
        }
    }
}

/// Result of verifying that a full image reference exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub exists: bool,
    pub image_reference: String,
    pub digest: Option<String>,
    pub config: Option<ImageConfig>,
    /// Guidance about the image's entrypoint configuration and how it may
    /// differ from the original image's.
    pub entrypoint_guidance: Option<String>,
    pub message: Option<String>,
}

impl VerificationResult {
    pub fn not_found(image_reference: &str, message: impl Into<String>) -> Self {
        Self {
            exists: false,
            image_reference: image_reference.to_string(),
            digest: None,
            config: None,
            entrypoint_guidance: None,
            message: Some(message.into()),
        }
    }
}
