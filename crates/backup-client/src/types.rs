//! Wire and domain types for the backup export workflow

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// =============================================================================
// Task identifiers
// =============================================================================

/// Server-assigned identifier of a running export job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wrap a raw task id; surrounding whitespace and quotes are stripped
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let id = raw.as_ref().trim().trim_matches('"').trim();
        if id.is_empty() {
            None
        } else {
            Some(Self(id.to_string()))
        }
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract a task id from a JSON value that may be a string or a number
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Self::new(s),
            serde_json::Value::Number(n) => Self::new(n.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Trigger
// =============================================================================

/// Body of the job-start request
///
/// The server expects the flags as the strings `"true"`/`"false"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRequest {
    #[serde(rename = "cbAttachments")]
    pub cb_attachments: String,

    #[serde(rename = "exportToCloud")]
    pub export_to_cloud: String,
}

impl TriggerRequest {
    pub fn new(include_attachments: bool, export_to_cloud: bool) -> Self {
        Self {
            cb_attachments: include_attachments.to_string(),
            export_to_cloud: export_to_cloud.to_string(),
        }
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Reference to the finished export, appended to the download prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactRef {
    /// Bare filename (Confluence, or Jira without a media id)
    File { file_name: String },
    /// Media-store object (Jira); joined as `media_file_id/file_name`
    Media {
        media_file_id: String,
        file_name: String,
    },
}

impl ArtifactRef {
    /// Path fragment appended to the download prefix
    pub fn path(&self) -> String {
        match self {
            Self::File { file_name } => file_name.clone(),
            Self::Media {
                media_file_id,
                file_name,
            } => format!("{}/{}", media_file_id, file_name),
        }
    }

    /// Bare filename of the artifact
    pub fn file_name(&self) -> &str {
        match self {
            Self::File { file_name } | Self::Media { file_name, .. } => file_name,
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Normalized view of one progress response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    /// Percent (or equivalent) fragment, empty when the server sent none
    pub percent: String,
    /// Human-readable status fragment, empty when the server sent none
    pub description: String,
    /// Resolved artifact once the export is finished
    pub artifact: Option<ArtifactRef>,
}

impl ProgressReport {
    /// Whether the export has produced a downloadable artifact
    pub fn is_complete(&self) -> bool {
        self.artifact.is_some()
    }
}

/// Interim monitor status handed to observers after each poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollStatus {
    /// Normalized progress of this poll
    pub report: ProgressReport,
    /// Whole minutes left on the wall-clock budget
    pub minutes_remaining: u64,
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}). Timeout remaining: {}m",
            self.report.percent, self.report.description, self.minutes_remaining
        )
    }
}

// =============================================================================
// Step outcomes
// =============================================================================

/// One stage of the export workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    Trigger,
    Monitor,
    Download,
}

impl Step {
    /// All steps in execution order
    pub const ALL: [Step; 3] = [Step::Trigger, Step::Monitor, Step::Download];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::Monitor => write!(f, "monitor"),
            Self::Download => write!(f, "download"),
        }
    }
}

/// Successful result of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: Step,
    pub message: String,
}

impl StepOutcome {
    pub fn new(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

/// Result of a completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Where the artifact was written
    pub path: PathBuf,
    /// Number of bytes written
    pub bytes: u64,
    /// Artifact that was fetched
    pub artifact: ArtifactRef,
}
