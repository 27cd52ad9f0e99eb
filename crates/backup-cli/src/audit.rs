//! Audit trail of step outcomes
//!
//! Audit entries are `tracing` events under the `audit` target. The
//! subscriber installed in `main` only routes them to a sink when `--log`
//! is given.

use backup_client::{Application, ExportError, Step, StepOutcome};
use tracing::{error, info};

pub const AUDIT_TARGET: &str = "audit";

/// Records step outcomes under an application tag
#[derive(Debug, Clone)]
pub struct AuditLog {
    tag: String,
}

impl AuditLog {
    pub fn new(application: Application) -> Self {
        Self {
            tag: audit_tag(application),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn step(&self, step: Step, result: Result<&StepOutcome, &ExportError>) {
        match result {
            Ok(outcome) => info!(target: AUDIT_TARGET, tag = %self.tag, %step, "{}", outcome.message),
            Err(e) => error!(target: AUDIT_TARGET, tag = %self.tag, %step, kind = e.kind(), "{}", e),
        }
    }

    pub fn message(&self, message: &str) {
        info!(target: AUDIT_TARGET, tag = %self.tag, "{}", message);
    }
}

/// `ATLASSIAN_BACKUP_<APP>`
pub fn audit_tag(application: Application) -> String {
    format!("ATLASSIAN_BACKUP_{}", application).to_uppercase()
}
