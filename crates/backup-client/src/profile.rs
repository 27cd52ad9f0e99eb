//! Backend profiles: per-application endpoint templates and response dialect
//!
//! Jira and Confluence run the same backup workflow behind different REST
//! paths and with differently shaped progress payloads. A [`BackendProfile`]
//! is selected once per run and never changes afterwards.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{ExportError, Result};

/// Placeholder substituted with the task id in the Jira progress path
pub const TASK_ID_PLACEHOLDER: &str = "{taskId}";

const LOGIN_PATH: &str = "/rest/auth/1/session";
const LAST_TASK_ID_PATH: &str = "/rest/backup/1/export/lastTaskId";

const JIRA_TRIGGER_PATH: &str = "/rest/backup/1/export/runbackup";
const JIRA_PROGRESS_PATH: &str = "/rest/internal/2/task/progress/{taskId}";
const JIRA_DOWNLOAD_PREFIX: &str = "/plugins/servlet/export/download/";

const CONFLUENCE_TRIGGER_PATH: &str = "/wiki/rest/obm/1.0/runbackup";
const CONFLUENCE_PROGRESS_PATH: &str = "/wiki/rest/obm/1.0/getprogress.json";
const CONFLUENCE_DOWNLOAD_PREFIX: &str = "/wiki/download/";

/// Domain appended to bare account names
const CLOUD_DOMAIN: &str = "atlassian.net";

/// Application whose data is being exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Application {
    Jira,
    Confluence,
}

impl Application {
    /// The response dialect spoken by this application's backup endpoints
    pub fn dialect(self) -> Dialect {
        match self {
            Self::Jira => Dialect::Nested,
            Self::Confluence => Dialect::Flat,
        }
    }
}

impl FromStr for Application {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jira" => Ok(Self::Jira),
            "confluence" => Ok(Self::Confluence),
            _ => Err(ExportError::Config(format!(
                "unsupported application \"{}\": request either \"Jira\" or \"Confluence\"",
                s
            ))),
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jira => write!(f, "Jira"),
            Self::Confluence => write!(f, "Confluence"),
        }
    }
}

/// Shape of the progress protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Progress is keyed by task id; completion details arrive as a
    /// stringified JSON document in the `result` field (Jira)
    Nested,
    /// Single fixed progress endpoint with a flat payload (Confluence)
    Flat,
}

impl Dialect {
    /// Whether progress polling needs a server-assigned task id
    pub fn requires_task_id(self) -> bool {
        matches!(self, Self::Nested)
    }
}

/// Immutable endpoint set for one application on one instance
#[derive(Debug, Clone)]
pub struct BackendProfile {
    application: Application,
    /// Name exactly as the operator supplied it (used for the output file)
    label: String,
    base_url: Url,
}

impl BackendProfile {
    /// Select the profile for `application_name` on `instance`
    ///
    /// The name is matched case-insensitively. Anything other than Jira or
    /// Confluence is a configuration error.
    pub fn resolve(application_name: &str, instance: &str) -> Result<Self> {
        let application = application_name.parse::<Application>()?;
        let base_url = instance_url(instance)?;

        Ok(Self {
            application,
            label: application_name.to_string(),
            base_url,
        })
    }

    /// The selected application
    pub fn application(&self) -> Application {
        self.application
    }

    /// The application name as supplied by the operator
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The response dialect for this profile
    pub fn dialect(&self) -> Dialect {
        self.application.dialect()
    }

    /// Base URL of the instance
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Session login endpoint
    pub fn login_url(&self) -> Result<Url> {
        self.build_url(LOGIN_PATH)
    }

    /// Job-start endpoint
    pub fn trigger_url(&self) -> Result<Url> {
        self.build_url(match self.application {
            Application::Jira => JIRA_TRIGGER_PATH,
            Application::Confluence => CONFLUENCE_TRIGGER_PATH,
        })
    }

    /// Raw progress path template, possibly containing [`TASK_ID_PLACEHOLDER`]
    pub fn progress_template(&self) -> &'static str {
        match self.application {
            Application::Jira => JIRA_PROGRESS_PATH,
            Application::Confluence => CONFLUENCE_PROGRESS_PATH,
        }
    }

    /// Progress endpoint with the task id substituted
    ///
    /// The Nested dialect fails with [`ExportError::MissingTaskId`] when no
    /// task id is given; the Flat dialect ignores it.
    pub fn progress_url(&self, task_id: Option<&str>) -> Result<Url> {
        let template = self.progress_template();
        if !template.contains(TASK_ID_PLACEHOLDER) {
            return self.build_url(template);
        }
        let task_id = task_id.ok_or(ExportError::MissingTaskId)?;
        self.build_url(&template.replace(TASK_ID_PLACEHOLDER, task_id))
    }

    /// Download prefix the artifact reference is appended to
    pub fn download_prefix(&self) -> Result<Url> {
        self.build_url(match self.application {
            Application::Jira => JIRA_DOWNLOAD_PREFIX,
            Application::Confluence => CONFLUENCE_DOWNLOAD_PREFIX,
        })
    }

    /// Full download URL for an artifact reference
    pub fn download_url(&self, artifact: &str) -> Result<Url> {
        let prefix = self.download_prefix()?;
        Url::parse(&format!("{}{}", prefix, artifact.trim_start_matches('/'))).map_err(Into::into)
    }

    /// "Last task id" lookup endpoint
    pub fn last_task_id_url(&self) -> Result<Url> {
        self.build_url(LAST_TASK_ID_PATH)
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(Into::into)
    }
}

/// Turn an instance argument into the instance base URL
///
/// - `acme` becomes `https://acme.atlassian.net`
/// - `backup.example.org` becomes `https://backup.example.org`
/// - values with an explicit `http://` or `https://` scheme are kept as-is
pub fn instance_url(instance: &str) -> Result<Url> {
    let instance = instance.trim().trim_end_matches('/');
    if instance.is_empty() {
        return Err(ExportError::Config("instance must not be empty".into()));
    }

    let raw = if instance.starts_with("http://") || instance.starts_with("https://") {
        instance.to_string()
    } else if instance.contains('.') {
        format!("https://{}", instance)
    } else {
        format!("https://{}.{}", instance, CLOUD_DOMAIN)
    };

    Url::parse(&raw).map_err(|e| ExportError::Config(format!("invalid instance {}: {}", raw, e)))
}
