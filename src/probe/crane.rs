use super::ImageProber;
use crate::config::Settings;
use crate::models::ImageConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Marker files that indicate a usable shell in the image filesystem.
const SHELL_MARKERS: [&str; 8] = [
    "bin/sh",
    "usr/bin/sh",
    "bin/bash",
    "usr/bin/bash",
    "bin/ash",
    "usr/bin/ash",
    "bin/busybox",
    "usr/bin/busybox",
];

/// Marker files for the apk package manager.
const APK_MARKERS: [&str; 2] = ["sbin/apk", "usr/bin/apk"];

/// Probes images with the `crane` CLI: `crane export` piped through
/// `tar -tf -` for filesystem listings, `crane config` for the runtime
/// configuration.
pub struct CraneProber {
    timeout: Duration,
}

impl CraneProber {
    pub fn new(settings: &Settings) -> Self {
        Self {
            timeout: settings.probe_timeout_duration(),
        }
    }

    /// List the files inside an image by exporting its flattened filesystem.
    async fn export_file_list(&self, image_ref: &str) -> Option<String> {
        let crane = which::which("crane").ok()?;

        let run = async {
            let mut export = Command::new(&crane)
                .args(["export", image_ref, "-"])
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .ok()?;

            let export_stdout: Stdio = export.stdout.take()?.try_into().ok()?;

            let tar = Command::new("tar")
                .args(["-tf", "-"])
                .stdin(export_stdout)
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .output();

            let (listing, _export_status) = tokio::join!(tar, export.wait());
            let listing = listing.ok()?;

            if !listing.status.success() {
                return None;
            }
            Some(String::from_utf8_lossy(&listing.stdout).into_owned())
        };

        match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Filesystem probe of {} timed out", image_ref);
                None
            }
        }
    }

    async fn fetch_config(&self, image_ref: &str) -> Option<CraneConfigDocument> {
        let crane = which::which("crane").ok()?;

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&crane)
                .args(["config", image_ref])
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .ok()?
        .ok()?;

        if !output.status.success() {
            return None;
        }

        serde_json::from_slice(&output.stdout).ok()
    }
}

#[derive(Debug, Default, Deserialize)]
struct CraneConfigDocument {
    #[serde(default)]
    config: CraneRuntimeConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CraneRuntimeConfig {
    entrypoint: Option<Vec<String>>,
    cmd: Option<Vec<String>>,
    user: Option<String>,
    #[serde(rename = "WorkingDir")]
    workdir: Option<String>,
    #[serde(default)]
    env: Vec<String>,
}

#[async_trait]
impl ImageProber for CraneProber {
    async fn probe_capabilities(&self, image_ref: &str) -> Option<(bool, bool)> {
        let file_list = self.export_file_list(image_ref).await?;

        let has_shell = SHELL_MARKERS.iter().any(|m| file_list.contains(m));
        let has_apk = APK_MARKERS.iter().any(|m| file_list.contains(m));

        debug!(
            "Probed {}: shell={}, apk={}",
            image_ref, has_shell, has_apk
        );
        Some((has_shell, has_apk))
    }

    async fn get_config(&self, image_ref: &str) -> Option<ImageConfig> {
        let document = self.fetch_config(image_ref).await?;

        // The filesystem check can fail independently; absent data leaves
        // the capability flags at false rather than blocking the config.
        let (has_shell, has_apk) = match self.probe_capabilities(image_ref).await {
            Some(caps) => caps,
            None => (false, false),
        };

        Some(ImageConfig {
            entrypoint: document.config.entrypoint,
            cmd: document.config.cmd,
            user: document.config.user,
            workdir: document.config.workdir,
            env: document.config.env,
            has_shell,
            has_apk,
        })
    }
}
