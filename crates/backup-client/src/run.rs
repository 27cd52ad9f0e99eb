//! Step-level orchestration of one export run
//!
//! An [`ExportRun`] owns the per-run state: the task id (supplied, returned
//! by the trigger, or looked up) and the progress URL it resolves to. Each
//! step returns a typed [`StepOutcome`] and reports progress through an
//! [`ExportObserver`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, instrument};
use url::Url;

use crate::client::BackupClient;
use crate::error::{ExportError, Result};
use crate::types::*;

/// Receives progress notifications while steps run
///
/// All methods default to no-ops.
pub trait ExportObserver {
    /// A step is about to start
    fn step_started(&mut self, _step: Step) {}

    /// A progress poll was normalized during monitoring
    fn poll(&mut self, _status: &PollStatus) {}

    /// Cumulative bytes written during download
    fn bytes_downloaded(&mut self, _downloaded: u64, _total: Option<u64>) {}

    /// A step finished, successfully or not
    fn step_finished(
        &mut self,
        _step: Step,
        _result: std::result::Result<&StepOutcome, &ExportError>,
    ) {
    }
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExportObserver for NoopObserver {}

/// Per-run mutable state shared between steps
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    task_id: Option<TaskId>,
    progress_url: Option<Url>,
}

impl RunContext {
    /// Start a run, optionally with a task id known up front
    pub fn new(task_id: Option<TaskId>) -> Self {
        Self {
            task_id,
            progress_url: None,
        }
    }

    /// The task id known so far
    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    /// The progress URL, once resolved
    pub fn progress_url(&self) -> Option<&Url> {
        self.progress_url.as_ref()
    }

    fn remember_task_id(&mut self, task_id: TaskId) {
        // A new task invalidates a progress URL built for an older one
        if self.task_id.as_ref() != Some(&task_id) {
            self.progress_url = None;
        }
        self.task_id = Some(task_id);
    }
}

/// Subset of steps to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSet(BTreeSet<Step>);

impl StepSet {
    /// Every step
    pub fn all() -> Self {
        Self(Step::ALL.into_iter().collect())
    }

    /// Parse the operator's selection (`t`, `m`, `d` or the long names)
    ///
    /// An empty selection means every step. Unknown codes are ignored as long
    /// as at least one known code is present.
    pub fn parse<S: AsRef<str>>(codes: &[S]) -> Result<Self> {
        if codes.is_empty() {
            return Ok(Self::all());
        }
        let steps: BTreeSet<Step> = codes
            .iter()
            .filter_map(|code| code.as_ref().parse::<Step>().ok())
            .collect();
        if steps.is_empty() {
            return Err(ExportError::Config(
                "please supply either 't' (trigger), 'm' (monitor) or 'd' (download) with tasks"
                    .into(),
            ));
        }
        Ok(Self(steps))
    }

    pub fn contains(&self, step: Step) -> bool {
        self.0.contains(&step)
    }

    /// Selected steps in execution order
    pub fn iter(&self) -> impl Iterator<Item = Step> + '_ {
        self.0.iter().copied()
    }
}

impl Default for StepSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for Step {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t" | "trigger" => Ok(Self::Trigger),
            "m" | "monitor" => Ok(Self::Monitor),
            "d" | "download" => Ok(Self::Download),
            other => Err(ExportError::Config(format!("unknown task \"{}\"", other))),
        }
    }
}

/// One export run: a client plus the state carried between steps
#[derive(Debug)]
pub struct ExportRun {
    client: BackupClient,
    context: RunContext,
    timeout_minutes: u64,
    location: PathBuf,
}

impl ExportRun {
    pub fn new(
        client: BackupClient,
        task_id: Option<TaskId>,
        location: impl Into<PathBuf>,
    ) -> Self {
        let timeout_minutes = client.config().timeouts.export_minutes;
        Self {
            client,
            context: RunContext::new(task_id),
            timeout_minutes,
            location: location.into(),
        }
    }

    /// Override the wall-clock budget taken from the client configuration
    pub fn with_timeout_minutes(mut self, minutes: u64) -> Self {
        self.timeout_minutes = minutes;
        self
    }

    pub fn client(&self) -> &BackupClient {
        &self.client
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Directory the archive is written to
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Execute the selected steps in order, stopping at the first failure
    pub async fn run<O: ExportObserver>(
        &mut self,
        steps: &StepSet,
        observer: &mut O,
    ) -> Result<Vec<StepOutcome>> {
        let mut outcomes = Vec::new();
        for step in steps.iter() {
            observer.step_started(step);
            let result = match step {
                Step::Trigger => self.trigger().await,
                Step::Monitor => self.monitor(observer).await,
                Step::Download => self.download(observer).await.map(|(outcome, _)| outcome),
            };
            observer.step_finished(step, result.as_ref());
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    debug!(step = %step, kind = e.kind(), "Step failed: {}", e);
                    return Err(e);
                }
            }
        }
        info!("All tasks completed successfully");
        Ok(outcomes)
    }

    /// Start the remote export and remember the task id it returns
    #[instrument(skip(self))]
    pub async fn trigger(&mut self) -> Result<StepOutcome> {
        let message = match self.client.trigger().await? {
            Some(task_id) => {
                let message = format!("Trigger response successful for task {}", task_id);
                self.context.remember_task_id(task_id);
                message
            }
            None => "Trigger response successful".to_string(),
        };
        info!("{}", message);
        Ok(StepOutcome::new(Step::Trigger, message))
    }

    /// Poll until the export finishes; the message is the artifact reference
    #[instrument(skip(self, observer))]
    pub async fn monitor<O: ExportObserver>(&mut self, observer: &mut O) -> Result<StepOutcome> {
        let url = self.resolve_progress_url().await?;
        let artifact = self
            .client
            .poll_until_complete(&url, self.timeout_minutes, |status| observer.poll(status))
            .await?;
        Ok(StepOutcome::new(Step::Monitor, artifact.path()))
    }

    /// Resolve the artifact afresh and stream it into the run's location
    #[instrument(skip(self, observer))]
    pub async fn download<O: ExportObserver>(
        &mut self,
        observer: &mut O,
    ) -> Result<(StepOutcome, DownloadedFile)> {
        let artifact = self.resolve_artifact().await?;
        info!("Filename found: {}", artifact);

        let file = self
            .client
            .download_artifact(&artifact, &self.location, |downloaded, total| {
                observer.bytes_downloaded(downloaded, total)
            })
            .await?;

        let outcome = StepOutcome::new(
            Step::Download,
            format!(
                "Backup downloaded successfully to {} ({} bytes)",
                file.path.display(),
                file.bytes
            ),
        );
        Ok((outcome, file))
    }

    /// Single progress fetch; a missing filename is a resolution failure
    pub async fn resolve_artifact(&mut self) -> Result<ArtifactRef> {
        let url = self.resolve_progress_url().await?;
        let report = self.client.poll_progress(&url).await?;
        report.artifact.ok_or_else(|| {
            ExportError::Resolution(format!(
                "no fileName in progress response ({} {})",
                report.percent, report.description
            ))
        })
    }

    /// Progress URL with the task id substituted, built at most once per task
    pub async fn resolve_progress_url(&mut self) -> Result<Url> {
        if let Some(url) = &self.context.progress_url {
            return Ok(url.clone());
        }

        let dialect = self.client.profile().dialect();
        if dialect.requires_task_id() && self.context.task_id.is_none() {
            info!("Trying to retrieve task id from the server");
            let task_id = self
                .client
                .last_task_id()
                .await?
                .ok_or(ExportError::MissingTaskId)?;
            info!("Using last task id {}", task_id);
            self.context.task_id = Some(task_id);
        }

        let url = self
            .client
            .profile()
            .progress_url(self.context.task_id.as_ref().map(TaskId::as_str))?;
        self.context.progress_url = Some(url.clone());
        Ok(url)
    }
}
