// src/report/mod.rs
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One unit of work that did not complete, and why.
#[derive(Debug)]
pub struct Failure {
    pub unit: String,
    pub reason: String,
}

/// Per-stage outcome: how many units succeeded, which failed and why, and
/// how long the stage ran. Stages collect failures instead of propagating
/// them, so an error in one (module, year) pair never aborts the batch.
#[derive(Debug)]
pub struct StageReport {
    stage: &'static str,
    started: Instant,
    elapsed: Duration,
    processed: usize,
    failures: Vec<Failure>,
}

impl StageReport {
    pub fn start(stage: &'static str) -> Self {
        info!(stage, "starting");
        StageReport {
            stage,
            started: Instant::now(),
            elapsed: Duration::ZERO,
            processed: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_ok(&mut self) {
        self.processed += 1;
    }

    pub fn record_failure(&mut self, unit: impl Into<String>, reason: impl ToString) {
        self.failures.push(Failure {
            unit: unit.into(),
            reason: reason.to_string(),
        });
    }

    /// Freeze the elapsed time. Call once, when the stage loop is done.
    pub fn finish(mut self) -> Self {
        self.elapsed = self.started.elapsed();
        self
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Log the stage summary: unit counts, elapsed time, then one line per
    /// failure so the operator can follow up by hand.
    pub fn log_summary(&self) {
        info!(
            stage = self.stage,
            processed = self.processed,
            failed = self.failures.len(),
            elapsed = ?self.elapsed,
            "stage complete"
        );
        for failure in &self.failures {
            warn!(stage = self.stage, unit = %failure.unit, reason = %failure.reason, "failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_failures_accumulate() {
        let mut report = StageReport::start("test");
        report.record_ok();
        report.record_ok();
        report.record_failure("module 01 1997", "boom");
        let report = report.finish();

        assert_eq!(report.processed(), 2);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].unit, "module 01 1997");
        assert_eq!(report.failures()[0].reason, "boom");
    }
}
