use crate::chainctl::{AuthStatus, CatalogClient, CatalogError, ResolvedTag, TagInfo};
use crate::config::CATALOG_REGISTRY;
use async_trait::async_trait;
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use std::str::FromStr;
use tracing::debug;

/// Anonymous OCI client for the public catalog registry.
///
/// Fallback when chainctl is not installed: it can list tags and resolve
/// digests over the OCI distribution API, but it has no notion of
/// authentication or organizations, so `auth_status` always reports invalid
/// and the resolver drops to the public pseudo-organization.
pub struct OciCatalogClient {
    client: Client,
}

impl OciCatalogClient {
    pub fn new() -> Self {
        let client = Client::new(oci_distribution::client::ClientConfig {
            protocol: oci_distribution::client::ClientProtocol::Https,
            ..Default::default()
        });

        Self { client }
    }

    fn parse_reference(raw: &str) -> Result<Reference, CatalogError> {
        Reference::from_str(raw)
            .map_err(|e| CatalogError::Registry(format!("invalid reference '{raw}': {e}")))
    }
}

impl Default for OciCatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogClient for OciCatalogClient {
    async fn auth_status(&self) -> Result<AuthStatus, CatalogError> {
        // Anonymous access: no identity, no organizations
        Ok(AuthStatus::default())
    }

    async fn list_tags(&self, repo: &str, org: &str) -> Result<Vec<TagInfo>, CatalogError> {
        let reference = Self::parse_reference(&format!("{CATALOG_REGISTRY}/{org}/{repo}"))?;

        debug!(
            "Listing tags over OCI for registry: {:?}, repository: {:?}",
            reference.registry(),
            reference.repository()
        );

        let response = self
            .client
            .list_tags(&reference, &RegistryAuth::Anonymous, None, None)
            .await
            .map_err(|e| CatalogError::Registry(format!("failed to list tags: {e}")))?;

        debug!("Found {} tags for {}/{}", response.tags.len(), org, repo);

        Ok(response
            .tags
            .into_iter()
            .map(|tag| TagInfo { tag, digest: None })
            .collect())
    }

    async fn resolve_tag(&self, image_ref: &str) -> Result<Option<ResolvedTag>, CatalogError> {
        let reference = Self::parse_reference(image_ref)?;

        match self
            .client
            .fetch_manifest_digest(&reference, &RegistryAuth::Anonymous)
            .await
        {
            Ok(digest) => Ok(Some(ResolvedTag { digest })),
            // The distribution API reports unknown manifests as errors;
            // treat any failure to fetch as "not found" rather than raising.
            Err(e) => {
                debug!("Digest fetch for '{}' failed: {}", image_ref, e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_parsing() {
        let reference = OciCatalogClient::parse_reference("cgr.dev/chainguard/python:latest");
        assert!(reference.is_ok());
        let reference = reference.unwrap();
        assert_eq!(reference.registry(), "cgr.dev");
        assert_eq!(reference.repository(), "chainguard/python");
    }
}
