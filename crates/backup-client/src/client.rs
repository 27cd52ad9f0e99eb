//! Backup export client: trigger, progress polling and artifact download

use std::path::Path;

use chrono::{Local, NaiveDate};
use futures::StreamExt;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::budget::TimeoutBudget;
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::profile::{BackendProfile, Dialect};
use crate::progress::normalize;
use crate::session::Session;
use crate::types::*;

const TRIGGER_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

/// Client for one application's backup endpoints
///
/// Wraps the authenticated [`Session`], the selected [`BackendProfile`] and
/// the tuning in [`ExportConfig`]. All calls are sequential; the client holds
/// no per-run state (see [`crate::ExportRun`] for that).
#[derive(Debug, Clone)]
pub struct BackupClient {
    session: Session,
    profile: BackendProfile,
    config: ExportConfig,
}

impl BackupClient {
    /// Create a client from an existing session
    pub fn new(session: Session, profile: BackendProfile, config: ExportConfig) -> Self {
        info!(
            "Backup client created for {} at {}",
            profile.application(),
            session.base_url()
        );
        Self {
            session,
            profile,
            config,
        }
    }

    /// Log in and create a client in one go
    pub async fn connect(
        profile: BackendProfile,
        config: ExportConfig,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let session = Session::login(&profile, username, password, &config.timeouts).await?;
        Ok(Self::new(session, profile, config))
    }

    /// Get the profile
    pub fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    /// Get the configuration
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    // =========================================================================
    // Trigger
    // =========================================================================

    /// Ask the server to start producing a backup
    ///
    /// Returns the task id for the Nested dialect and `None` for the Flat
    /// dialect, which does not hand one out.
    #[instrument(skip(self))]
    pub async fn trigger(&self) -> Result<Option<TaskId>> {
        let url = self.profile.trigger_url()?;
        let body = TriggerRequest::new(
            self.config.trigger.include_attachments,
            self.config.trigger.export_to_cloud,
        );
        info!("Triggering backup at {}", url);

        let response = self
            .http()
            .post(url)
            .header(reqwest::header::ACCEPT, TRIGGER_ACCEPT)
            .header("X-Atlassian-Token", "no-check")
            .header("X-Requested-With", "XMLHttpRequest")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .header(reqwest::header::PRAGMA, "no-cache")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("Trigger response: {}", status);

        if !status.is_success() {
            return Err(ExportError::Trigger(server_error_text(status, &text)));
        }

        match self.profile.dialect() {
            Dialect::Flat => Ok(None),
            Dialect::Nested => parse_trigger_response(status, &text).map(Some),
        }
    }

    /// Look up the id of the most recent backup task
    ///
    /// Returns `None` when the server does not answer with 200 or the body is
    /// empty.
    #[instrument(skip(self))]
    pub async fn last_task_id(&self) -> Result<Option<TaskId>> {
        let url = self.profile.last_task_id_url()?;
        debug!("Retrieving last task id from {}", url);

        let response = self.http().get(url).send().await?;
        if response.status() != StatusCode::OK {
            warn!("Last task id lookup answered {}", response.status());
            return Ok(None);
        }
        Ok(TaskId::new(response.text().await?))
    }

    // =========================================================================
    // Progress
    // =========================================================================

    /// Fetch and normalize one progress response
    #[instrument(skip(self))]
    pub async fn poll_progress(&self, progress_url: &Url) -> Result<ProgressReport> {
        let response = self.http().get(progress_url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        normalize(&body, status.as_u16(), self.profile.dialect())
    }

    /// Poll until an artifact is resolved or the budget runs out
    ///
    /// `on_poll` sees every normalized report together with the minutes left.
    /// A response that cannot be decoded ends the loop immediately.
    #[instrument(skip(self, on_poll))]
    pub async fn poll_until_complete<F>(
        &self,
        progress_url: &Url,
        timeout_minutes: u64,
        mut on_poll: F,
    ) -> Result<ArtifactRef>
    where
        F: FnMut(&PollStatus),
    {
        let poll_interval = self.config.timeouts.poll_interval();
        let mut budget = TimeoutBudget::new(timeout_minutes);

        loop {
            let report = self.poll_progress(progress_url).await?;
            let status = PollStatus {
                report,
                minutes_remaining: budget.minutes_left(),
            };
            debug!("Backup progress: {}", status);
            on_poll(&status);

            if let Some(artifact) = status.report.artifact {
                info!("Backup completed: {}", artifact);
                return Ok(artifact);
            }

            if budget.is_exhausted() {
                return Err(ExportError::Timeout {
                    minutes: budget.minutes(),
                });
            }

            tokio::time::sleep(poll_interval).await;
            budget.tick();
        }
    }

    // =========================================================================
    // Download
    // =========================================================================

    /// Stream an artifact into `dir`
    ///
    /// The file is named `<application>-<YYYYMMDD>.zip` and replaces any
    /// existing file of that name. Nothing is created on disk unless the
    /// server answers with 200. `on_bytes` receives the cumulative byte count
    /// and the announced content length after every chunk.
    #[instrument(skip(self, on_bytes))]
    pub async fn download_artifact<F>(
        &self,
        artifact: &ArtifactRef,
        dir: &Path,
        mut on_bytes: F,
    ) -> Result<DownloadedFile>
    where
        F: FnMut(u64, Option<u64>),
    {
        let url = self.profile.download_url(&artifact.path())?;
        info!("Downloading {}", url);

        let response = self.http().get(url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ExportError::Transport {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        create_backup_dir(dir).await?;
        let path = dir.join(archive_file_name(
            self.profile.label(),
            Local::now().date_naive(),
        ));

        let total = response.content_length();
        let mut file = tokio::fs::File::create(&path).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            file.write_all(&bytes).await?;
            downloaded += bytes.len() as u64;
            on_bytes(downloaded, total);
        }
        file.flush().await?;

        info!("Wrote {} bytes to {}", downloaded, path.display());
        Ok(DownloadedFile {
            path,
            bytes: downloaded,
            artifact: artifact.clone(),
        })
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    fn http(&self) -> &reqwest::Client {
        self.session.http_client()
    }
}

/// Name of the local archive for `label` on `date`
pub fn archive_file_name(label: &str, date: NaiveDate) -> String {
    format!("{}-{}.zip", label, date.format("%Y%m%d"))
}

async fn create_backup_dir(dir: &Path) -> Result<()> {
    if tokio::fs::try_exists(dir).await? {
        return Ok(());
    }
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o744);
    builder.create(dir).await.map_err(|e| {
        ExportError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to create backup location {}: {}", dir.display(), e),
        ))
    })
}

fn parse_trigger_response(status: StatusCode, body: &str) -> Result<TaskId> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ExportError::parse(status.as_u16(), e.to_string()))?;

    if let Some(task_id) = json.get("taskId").and_then(TaskId::from_json) {
        return Ok(task_id);
    }
    match json.get("error") {
        Some(error) => Err(ExportError::Trigger(json_text(error))),
        None => Err(ExportError::Trigger(format!(
            "no taskId in trigger response: {}",
            body
        ))),
    }
}

/// Failure text for a rejected trigger: the `error` field when the body is
/// JSON carrying one, otherwise the body itself
fn server_error_text(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(error) = json.get("error") {
            return json_text(error);
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        body.to_string()
    }
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
