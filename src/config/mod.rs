use std::time::Duration;
use tracing::debug;

/// Registry host the curated catalog is served from.
pub const CATALOG_REGISTRY: &str = "cgr.dev";

/// Pseudo-organization used when no authenticated organization is available.
/// The public registry only carries `latest` / `latest-dev` tags for a subset
/// of images.
pub const PUBLIC_ORG: &str = "chainguard";

/// Runtime settings, loaded from `FAIRLEAD_*` environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Timeout for chainctl invocations (seconds)
    pub chainctl_timeout: u64,
    /// Timeout for a single capability probe (seconds)
    pub probe_timeout: u64,
    /// How long a downloaded APK index stays fresh (seconds)
    pub apk_cache_ttl: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chainctl_timeout: 30,
            probe_timeout: 120,
            apk_cache_ttl: 3600,
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let settings = Self {
            chainctl_timeout: parse_env(
                "FAIRLEAD_CHAINCTL_TIMEOUT_SECONDS",
                defaults.chainctl_timeout,
            ),
            probe_timeout: parse_env("FAIRLEAD_PROBE_TIMEOUT_SECONDS", defaults.probe_timeout),
            apk_cache_ttl: parse_env("FAIRLEAD_APK_CACHE_TTL_SECONDS", defaults.apk_cache_ttl),
        };
        debug!("Loaded settings: {:?}", settings);
        settings
    }

    pub fn chainctl_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.chainctl_timeout)
    }

    pub fn probe_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn apk_cache_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.apk_cache_ttl)
    }
}

fn parse_env(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.chainctl_timeout, 30);
        assert_eq!(settings.probe_timeout, 120);
        assert_eq!(settings.apk_cache_ttl, 3600);
    }

    #[test]
    fn test_timeout_durations() {
        let settings = Settings::default();
        assert_eq!(
            settings.chainctl_timeout_duration(),
            Duration::from_secs(30)
        );
        assert_eq!(settings.probe_timeout_duration(), Duration::from_secs(120));
    }
}
