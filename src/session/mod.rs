use crate::config::PUBLIC_ORG;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

/// Session state for the selected catalog organization.
///
/// The organization is chosen interactively: the resolver fetches the
/// available organizations from the auth collaborator and either auto-selects
/// (zero or one candidate) or returns the full list for the caller to pick
/// from. A single session is shared by all resolver calls for the lifetime of
/// the process.
///
/// Capability probe results are cached here keyed by fully-qualified image
/// reference. Cache lookups and stores are synchronous units; only the probe
/// that fills the cache suspends.
#[derive(Debug, Default)]
pub struct SelectionSession {
    state: RwLock<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    selected_org: Option<String>,
    available_orgs: Option<Vec<String>>,
    capabilities: HashMap<String, (bool, bool)>,
}

impl SelectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected organization, or None if not set.
    pub fn org(&self) -> Option<String> {
        self.state.read().ok()?.selected_org.clone()
    }

    /// Select an organization.
    ///
    /// Selecting a different organization clears the capability cache: cached
    /// entries are keyed by fully-qualified references that embed the
    /// organization, so they no longer describe anything reachable.
    pub fn set_org(&self, org: &str) {
        if let Ok(mut state) = self.state.write() {
            if state.selected_org.as_deref() != Some(org) {
                if !state.capabilities.is_empty() {
                    debug!(
                        "Organization changed, dropping {} cached capability entries",
                        state.capabilities.len()
                    );
                }
                state.capabilities.clear();
            }
            info!("Selected organization: {}", org);
            state.selected_org = Some(org.to_string());
        }
    }

    pub fn is_org_selected(&self) -> bool {
        self.org().is_some()
    }

    /// True when the public-registry pseudo-organization is in effect.
    pub fn is_public_registry(&self) -> bool {
        self.org().as_deref() == Some(PUBLIC_ORG)
    }

    /// The organizations returned by the last auth query, if any.
    pub fn available_orgs(&self) -> Option<Vec<String>> {
        self.state.read().ok()?.available_orgs.clone()
    }

    pub fn set_available_orgs(&self, orgs: Vec<String>) {
        if let Ok(mut state) = self.state.write() {
            state.available_orgs = Some(orgs);
        }
    }

    /// Cached (has_shell, has_apk) for a reference, or None if never probed.
    pub fn cached_capabilities(&self, image_ref: &str) -> Option<(bool, bool)> {
        self.state.read().ok()?.capabilities.get(image_ref).copied()
    }

    pub fn cache_capabilities(&self, image_ref: &str, has_shell: bool, has_apk: bool) {
        if let Ok(mut state) = self.state.write() {
            state
                .capabilities
                .insert(image_ref.to_string(), (has_shell, has_apk));
        }
    }

    /// Reset all session state.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            state.selected_org = None;
            state.available_orgs = None;
            state.capabilities.clear();
        }
    }
}
