//! atlassian-backup - Command-line tool for Atlassian Cloud backup exports
//!
//! Logs in to a Jira or Confluence Cloud instance, triggers a backup export,
//! waits for it to finish and downloads the archive.

mod audit;
mod config;
mod observer;
mod output;

use anyhow::{Context, Result};
use backup_client::{BackendProfile, BackupClient, ExportConfig, ExportRun, StepSet, TaskId};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{filter::Targets, fmt, prelude::*, EnvFilter};

use crate::audit::{AuditLog, AUDIT_TARGET};
use crate::config::{ArgOverrides, Config};
use crate::observer::TerminalObserver;
use crate::output::OutputContext;

#[derive(Parser, Debug)]
#[command(name = "atlassian-backup")]
#[command(author, version, about = "Atlassian Cloud backup export CLI")]
struct Cli {
    /// Instance: short name (<name>.atlassian.net), host name or URL
    #[arg(short, long, env = "ATLASSIAN_BACKUP_INSTANCE")]
    instance: Option<String>,

    /// Application to back up: jira or confluence
    #[arg(short, long)]
    application: String,

    /// Account used to log in
    #[arg(short, long, env = "ATLASSIAN_BACKUP_USERNAME")]
    username: Option<String>,

    /// Password; prompted for when given without a value or omitted
    #[arg(
        short,
        long,
        env = "ATLASSIAN_BACKUP_PASSWORD",
        hide_env_values = true,
        num_args = 0..=1,
        default_missing_value = ""
    )]
    password: Option<String>,

    /// Export timeout in minutes [default: 180]
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Task id of an export that is already running (Jira)
    #[arg(short = 'd', long)]
    taskid: Option<String>,

    /// Directory the archive is written to [default: /tmp/]
    #[arg(short, long)]
    location: Option<PathBuf>,

    /// Steps to run: t (trigger), m (monitor), d (download)
    #[arg(long, num_args = 1.., value_name = "TASK")]
    tasks: Vec<String>,

    /// Write step outcomes to the audit log
    #[arg(long)]
    log: bool,

    /// Configuration file path
    #[arg(short, long, env = "ATLASSIAN_BACKUP_CONFIG")]
    config: Option<PathBuf>,

    /// Client tuning file (YAML: timeouts, trigger options)
    #[arg(long, value_name = "FILE")]
    client_config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(ArgOverrides {
        instance: cli.instance.as_deref(),
        username: cli.username.as_deref(),
        location: cli.location.as_deref(),
        timeout: cli.timeout,
        log: cli.log,
    })?;

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    }
    .add_directive(format!("{}=off", AUDIT_TARGET).parse()?);

    let audit_layer = merged.log.then(|| {
        fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .with_filter(Targets::new().with_target(AUDIT_TARGET, Level::INFO))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(filter))
        .with(audit_layer)
        .init();

    let ctx = OutputContext::new(cli.no_color, cli.quiet);

    let steps = StepSet::parse(cli.tasks.as_slice())?;
    let profile = BackendProfile::resolve(&cli.application, &merged.instance)?;
    let audit = AuditLog::new(profile.application());

    let export_config = load_export_config(cli.client_config.as_deref(), merged.timeout)?;

    let password = match cli.password.filter(|p| !p.is_empty()) {
        Some(password) => password,
        None => rpassword::prompt_password(format!("Password for {}: ", merged.username))
            .context("Failed to read password")?,
    };

    ctx.info(&format!("Connecting to {}", profile.base_url()));
    let client = BackupClient::connect(profile, export_config, &merged.username, &password)
        .await
        .context("Session creation failed")?;

    let task_id = cli.taskid.as_deref().and_then(TaskId::new);
    if cli.taskid.is_some() && task_id.is_none() {
        ctx.warn("Ignoring empty --taskid");
    }

    let mut run = ExportRun::new(client, task_id, merged.location);
    let mut observer = TerminalObserver::new(&ctx, &audit);

    if run.run(&steps, &mut observer).await.is_err() {
        std::process::exit(1);
    }

    audit.message("All tasks completed successfully");
    ctx.success("All tasks completed.");
    Ok(())
}

/// Client configuration from the YAML file (or defaults), with the timeout
/// replaced only when one was given on the command line or in the TOML file
fn load_export_config(path: Option<&Path>, timeout: Option<u64>) -> Result<ExportConfig> {
    let mut export_config = match path {
        Some(path) => ExportConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load client config: {}", path.display()))?,
        None => ExportConfig::default(),
    };
    if let Some(minutes) = timeout {
        export_config.timeouts.export_minutes = minutes;
    }
    Ok(export_config)
}
