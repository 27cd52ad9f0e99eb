//! Renders run progress on the terminal and feeds the audit log

use backup_client::{ExportError, ExportObserver, PollStatus, Step, StepOutcome};
use indicatif::ProgressBar;

use crate::audit::AuditLog;
use crate::output::OutputContext;

pub struct TerminalObserver<'a> {
    ctx: &'a OutputContext,
    audit: &'a AuditLog,
    bar: Option<ProgressBar>,
}

impl<'a> TerminalObserver<'a> {
    pub fn new(ctx: &'a OutputContext, audit: &'a AuditLog) -> Self {
        Self {
            ctx,
            audit,
            bar: None,
        }
    }

    fn clear_bar(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl ExportObserver for TerminalObserver<'_> {
    fn step_started(&mut self, step: Step) {
        self.ctx.info(match step {
            Step::Trigger => "Triggering backup",
            Step::Monitor => "Monitoring remote backup progress",
            Step::Download => "Downloading file",
        });
        if step == Step::Monitor {
            self.bar = Some(self.ctx.spinner());
        }
    }

    fn poll(&mut self, status: &PollStatus) {
        if let Some(pb) = &self.bar {
            pb.set_message(status.to_string());
        }
    }

    fn bytes_downloaded(&mut self, downloaded: u64, total: Option<u64>) {
        let ctx = self.ctx;
        let pb = self.bar.get_or_insert_with(|| ctx.download_bar(total));
        pb.set_position(downloaded);
    }

    fn step_finished(&mut self, step: Step, result: Result<&StepOutcome, &ExportError>) {
        self.clear_bar();
        self.audit.step(step, result);
        match result {
            Ok(outcome) => self.ctx.success(&outcome.message),
            Err(e) => self.ctx.error(&format!("{} failed: {}", step, e)),
        }
    }
}
