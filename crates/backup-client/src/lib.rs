//! Atlassian Cloud Backup Client
//!
//! Drives the asynchronous backup export offered by Jira and Confluence
//! Cloud: log in, trigger the export, poll until the archive is ready and
//! stream it to disk.
//!
//! # Example
//!
//! ```rust,no_run
//! use backup_client::{BackendProfile, BackupClient, ExportConfig, ExportRun, NoopObserver, StepSet};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let profile = BackendProfile::resolve("jira", "acme")?;
//!     let client = BackupClient::connect(profile, ExportConfig::default(), "admin", "secret").await?;
//!
//!     let mut run = ExportRun::new(client, None, "/tmp/");
//!     for outcome in run.run(&StepSet::all(), &mut NoopObserver).await? {
//!         println!("{}: {}", outcome.step, outcome.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Dialects
//!
//! Jira and Confluence report progress differently. The dialect is fixed when
//! the [`BackendProfile`] is resolved and handed to [`progress::normalize`],
//! which turns either shape into a [`ProgressReport`].
//!
//! # Testing
//!
//! The `testing` module runs an axum router as a stand-in instance:
//!
//! ```rust,ignore
//! use backup_client::testing::TestServer;
//!
//! let server = TestServer::start(router).await?;
//! let profile = BackendProfile::resolve("confluence", &server.base_url())?;
//! ```

mod budget;
mod client;
mod config;
mod error;
pub mod profile;
pub mod progress;
mod run;
mod session;
pub mod testing;
mod types;

pub use budget::TimeoutBudget;
pub use client::{archive_file_name, BackupClient};
pub use config::{
    ConfigError, ExportConfig, ExportConfigBuilder, TimeoutsConfig, TriggerOptions,
    TICKS_PER_MINUTE,
};
pub use error::{ExportError, Result};
pub use profile::{Application, BackendProfile, Dialect};
pub use run::{ExportObserver, ExportRun, NoopObserver, RunContext, StepSet};
pub use session::Session;
pub use types::*;
