use crate::config::Settings;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Errors from the catalog/auth collaborator.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(
        "chainctl is not installed. Install it from \
         https://edu.chainguard.dev/chainguard/chainctl-usage/getting-started-with-chainctl/"
    )]
    ToolNotFound,
    #[error("chainctl is not authenticated. Run 'chainctl auth login' first.")]
    NotAuthenticated,
    #[error("chainctl command timed out: {0}")]
    Timeout(String),
    #[error("chainctl command failed: {0}")]
    CommandFailed(String),
    #[error("failed to parse chainctl output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to run chainctl: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry error: {0}")]
    Registry(String),
}

/// Authentication status reported by the catalog tooling.
#[derive(Debug, Clone, Default)]
pub struct AuthStatus {
    pub valid: bool,
    pub email: Option<String>,
    /// Organization names the caller has access to, in reported order.
    pub organizations: Vec<String>,
}

/// A tag known to the catalog registry.
#[derive(Debug, Clone)]
pub struct TagInfo {
    pub tag: String,
    pub digest: Option<String>,
}

/// A tag resolved to its digest.
#[derive(Debug, Clone)]
pub struct ResolvedTag {
    pub digest: String,
}

/// Read-only access to the catalog registry and its auth context.
///
/// Absence (an unknown tag, an unresolvable reference) is a normal `None`
/// return; errors are reserved for the collaborator itself failing.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn auth_status(&self) -> Result<AuthStatus, CatalogError>;

    /// List tags for a repository within an organization.
    async fn list_tags(&self, repo: &str, org: &str) -> Result<Vec<TagInfo>, CatalogError>;

    /// Resolve a full image reference to its digest. `None` means the
    /// reference does not exist; it is not an error.
    async fn resolve_tag(&self, image_ref: &str) -> Result<Option<ResolvedTag>, CatalogError>;
}

/// Wrapper for the `chainctl` CLI, driving it with `--output json`.
pub struct ChainctlClient {
    timeout: Duration,
    binary: OnceCell<PathBuf>,
}

impl ChainctlClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            timeout: settings.chainctl_timeout_duration(),
            binary: OnceCell::new(),
        }
    }

    /// Whether chainctl is available on PATH at all.
    pub fn is_available() -> bool {
        which::which("chainctl").is_ok()
    }

    fn binary_path(&self) -> Result<&PathBuf, CatalogError> {
        self.binary
            .get_or_try_init(|| which::which("chainctl").map_err(|_| CatalogError::ToolNotFound))
    }

    async fn run_command(&self, args: &[&str]) -> Result<Value, CatalogError> {
        let chainctl = self.binary_path()?;
        debug!("Running chainctl {}", args.join(" "));

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(chainctl)
                .args(args)
                .args(["--output", "json"])
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| CatalogError::Timeout(format!("chainctl {}", args.join(" "))))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let lowered = stderr.to_lowercase();
            if lowered.contains("not authenticated") || lowered.contains("login") {
                return Err(CatalogError::NotAuthenticated);
            }
            return Err(CatalogError::CommandFailed(stderr));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[async_trait]
impl CatalogClient for ChainctlClient {
    /// Get authentication status and available organizations.
    async fn auth_status(&self) -> Result<AuthStatus, CatalogError> {
        let result = self.run_command(&["auth", "status"]).await?;

        let Value::Object(map) = &result else {
            return Ok(AuthStatus::default());
        };

        let valid = map.get("valid").and_then(Value::as_bool).unwrap_or(false);
        let email = map
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string);

        // Organization names come from the capability map's keys
        let organizations = map
            .get("capabilities")
            .and_then(Value::as_object)
            .map(|caps| caps.keys().cloned().collect())
            .unwrap_or_default();

        Ok(AuthStatus {
            valid,
            email,
            organizations,
        })
    }

    async fn list_tags(&self, repo: &str, org: &str) -> Result<Vec<TagInfo>, CatalogError> {
        let result = self
            .run_command(&["images", "tags", "list", "--repo", repo, "--parent", org])
            .await?;

        let mut tags = Vec::new();
        if let Value::Array(items) = result {
            for item in items {
                match item {
                    Value::Object(map) => {
                        let tag = map
                            .get("name")
                            .or_else(|| map.get("tag"))
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let digest = map
                            .get("digest")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        tags.push(TagInfo { tag, digest });
                    }
                    Value::String(tag) => tags.push(TagInfo { tag, digest: None }),
                    _ => {}
                }
            }
        }
        Ok(tags)
    }

    async fn resolve_tag(&self, image_ref: &str) -> Result<Option<ResolvedTag>, CatalogError> {
        let result = match self
            .run_command(&["images", "tags", "resolve", image_ref])
            .await
        {
            Ok(value) => value,
            Err(CatalogError::CommandFailed(msg)) if msg.to_lowercase().contains("not found") => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let digest = extract_digest(&result);
        match digest {
            Some(digest) if !digest.is_empty() => Ok(Some(ResolvedTag { digest })),
            _ => {
                warn!("chainctl resolved '{}' without a digest", image_ref);
                Ok(None)
            }
        }
    }
}

fn extract_digest(value: &Value) -> Option<String> {
    match value {
        // chainctl may return a list of tag info objects
        Value::Array(items) => items.first().and_then(extract_digest),
        Value::Object(map) => map
            .get("digest")
            .or_else(|| map.get("Digest"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(digest) => Some(digest.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_digest_shapes() {
        let list = serde_json::json!([{ "digest": "sha256:abc" }]);
        assert_eq!(extract_digest(&list).as_deref(), Some("sha256:abc"));

        let object = serde_json::json!({ "Digest": "sha256:def" });
        assert_eq!(extract_digest(&object).as_deref(), Some("sha256:def"));

        let string = serde_json::json!("sha256:123");
        assert_eq!(extract_digest(&string).as_deref(), Some("sha256:123"));

        let empty = serde_json::json!([]);
        assert_eq!(extract_digest(&empty), None);
    }

    #[test]
    fn test_auth_status_default_is_invalid() {
        let status = AuthStatus::default();
        assert!(!status.valid);
        assert!(status.organizations.is_empty());
    }
}
