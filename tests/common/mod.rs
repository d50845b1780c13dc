// Common test utilities for integration tests
//
// Fake collaborators standing in for the chainctl CLI and the crane prober,
// plus a resolver wired to a small alias table.

use async_trait::async_trait;
use fairlead::chainctl::{AuthStatus, CatalogClient, CatalogError, ResolvedTag, TagInfo};
use fairlead::mappings::{AliasTable, GenericBaseSet};
use fairlead::models::ImageConfig;
use fairlead::probe::ImageProber;
use fairlead::resolver::Resolver;
use fairlead::session::SelectionSession;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Catalog client backed by in-memory fixtures.
#[derive(Default)]
pub struct FakeCatalogClient {
    pub organizations: Vec<String>,
    pub auth_valid: bool,
    /// Simulate the auth collaborator itself failing
    pub auth_fails: bool,
    /// repo name -> available tags
    pub tags: HashMap<String, Vec<String>>,
    /// Simulate tag listing failing
    pub list_tags_fails: bool,
    /// full reference -> digest
    pub digests: HashMap<String, String>,
}

impl FakeCatalogClient {
    pub fn with_orgs(orgs: &[&str]) -> Self {
        Self {
            organizations: orgs.iter().map(|s| s.to_string()).collect(),
            auth_valid: !orgs.is_empty(),
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, repo: &str, tags: &[&str]) -> Self {
        self.tags
            .insert(repo.to_string(), tags.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_digest(mut self, full_ref: &str, digest: &str) -> Self {
        self.digests.insert(full_ref.to_string(), digest.to_string());
        self
    }
}

#[async_trait]
impl CatalogClient for FakeCatalogClient {
    async fn auth_status(&self) -> Result<AuthStatus, CatalogError> {
        if self.auth_fails {
            return Err(CatalogError::CommandFailed("auth backend down".to_string()));
        }
        Ok(AuthStatus {
            valid: self.auth_valid,
            email: None,
            organizations: self.organizations.clone(),
        })
    }

    async fn list_tags(&self, repo: &str, _org: &str) -> Result<Vec<TagInfo>, CatalogError> {
        if self.list_tags_fails {
            return Err(CatalogError::CommandFailed("registry unreachable".to_string()));
        }
        Ok(self
            .tags
            .get(repo)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|tag| TagInfo { tag, digest: None })
            .collect())
    }

    async fn resolve_tag(&self, image_ref: &str) -> Result<Option<ResolvedTag>, CatalogError> {
        Ok(self
            .digests
            .get(image_ref)
            .map(|digest| ResolvedTag {
                digest: digest.clone(),
            }))
    }
}

/// Prober with a fixed capability map; references absent from the map fail
/// their probe (None), they do not report false capabilities.
#[derive(Default)]
pub struct FakeProber {
    pub capabilities: HashMap<String, (bool, bool)>,
    pub configs: HashMap<String, ImageConfig>,
    pub probed_refs: Mutex<Vec<String>>,
}

impl FakeProber {
    pub fn with_capabilities(entries: &[(&str, bool, bool)]) -> Self {
        Self {
            capabilities: entries
                .iter()
                .map(|(r, shell, apk)| (r.to_string(), (*shell, *apk)))
                .collect(),
            ..Self::default()
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probed_refs.lock().map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ImageProber for FakeProber {
    async fn probe_capabilities(&self, image_ref: &str) -> Option<(bool, bool)> {
        if let Ok(mut probed) = self.probed_refs.lock() {
            probed.push(image_ref.to_string());
        }
        self.capabilities.get(image_ref).copied()
    }

    async fn get_config(&self, image_ref: &str) -> Option<ImageConfig> {
        self.configs.get(image_ref).cloned()
    }
}

/// Alias fixtures matching the documented end-to-end scenario.
pub fn test_aliases() -> AliasTable {
    AliasTable::from_entries(vec![
        ("node".to_string(), vec!["nodejs-runtime".to_string()]),
        ("nodejs".to_string(), vec!["nodejs-runtime".to_string()]),
        ("python".to_string(), vec!["python".to_string()]),
        ("ubuntu".to_string(), vec!["chainguard-base".to_string()]),
    ])
}

pub fn test_generic_bases() -> GenericBaseSet {
    GenericBaseSet::from_names(vec!["ubuntu".to_string(), "alpine".to_string()])
}

/// A resolver over the fakes with a fresh session.
pub fn test_resolver(
    catalog: Arc<FakeCatalogClient>,
    prober: Arc<FakeProber>,
) -> (Resolver, Arc<SelectionSession>) {
    let session = Arc::new(SelectionSession::new());
    let resolver = Resolver::new(
        catalog,
        prober,
        Arc::clone(&session),
        Arc::new(test_aliases()),
        Arc::new(test_generic_bases()),
    );
    (resolver, session)
}
