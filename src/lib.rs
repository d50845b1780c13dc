// Library exports for integration testing
//
// This file exposes internal modules for integration tests while keeping
// the binary entrypoint in main.rs

pub mod apkindex;
pub mod chainctl;
pub mod config;
pub mod mappings;
pub mod models;
pub mod packages;
pub mod probe;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod tags;

// Re-export commonly used types for testing
pub use config::{CATALOG_REGISTRY, PUBLIC_ORG, Settings};
pub use models::{
    ImageMatch, ImageResolution, TagLookupResult, Variant, VariantCapabilities, VerificationResult,
};
pub use resolver::Resolver;
pub use session::SelectionSession;

// Helper functions for testing
/// Convenience wrapper around the tag scorer for owned candidate lists
pub fn best_tag_for(
    original_tag: &str,
    candidates: &[&str],
    preferred_variant: Variant,
) -> (Option<String>, f64) {
    let owned: Vec<String> = candidates.iter().map(|s| s.to_string()).collect();
    let (tag, score) = tags::find_best_tag(original_tag, &owned, preferred_variant);
    (tag.map(str::to_string), score)
}
