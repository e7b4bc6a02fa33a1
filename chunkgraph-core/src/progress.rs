//! Progress reporting for the builder's indexing and extraction phases.
//!
//! The CLI draws an `indicatif` bar on stderr; library callers and tests use
//! [`NoopReporter`].

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives phase and item counts from a running build.
pub trait ProgressReporter: Send + Sync {
    /// Begin a phase, with the item total when it is known up front.
    fn start(&self, phase: &str, total: Option<u64>);

    /// Mark `amount` more items done in the current phase.
    fn advance(&self, amount: u64);

    /// End the current phase.
    fn finish(&self);

    /// Print a line without corrupting the bar.
    fn message(&self, msg: &str);
}

#[derive(Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn start(&self, _phase: &str, _total: Option<u64>) {}
    fn advance(&self, _amount: u64) {}
    fn finish(&self) {}
    fn message(&self, _msg: &str) {}
}

/// Reporter backed by an `indicatif` bar.
#[derive(Debug)]
pub struct IndicatifReporter {
    bar: ProgressBar,
    done: AtomicU64,
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::hidden()
    }
}

impl IndicatifReporter {
    /// Bar drawn on stderr.
    pub fn stderr() -> Self {
        Self {
            bar: ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr()),
            done: AtomicU64::new(0),
        }
    }

    /// Bar that tracks counts but never draws.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            done: AtomicU64::new(0),
        }
    }

    /// Items completed in the current phase.
    pub fn completed(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    fn style(total: Option<u64>) -> ProgressStyle {
        let template = match total {
            Some(_) => "{spinner:.green} {msg:<12} [{bar:30.cyan/blue}] {pos}/{len}",
            None => "{spinner:.green} {msg:<12} {pos} chunks",
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl ProgressReporter for IndicatifReporter {
    fn start(&self, phase: &str, total: Option<u64>) {
        self.done.store(0, Ordering::Relaxed);
        self.bar.reset();
        self.bar.set_length(total.unwrap_or(0));
        self.bar.set_style(Self::style(total));
        self.bar.set_message(phase.to_string());
    }

    fn advance(&self, amount: u64) {
        self.done.fetch_add(amount, Ordering::Relaxed);
        self.bar.inc(amount);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn message(&self, msg: &str) {
        self.bar.println(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reporter_accepts_every_call() {
        let reporter = NoopReporter;
        reporter.start("index", Some(3));
        reporter.advance(3);
        reporter.message("done");
        reporter.finish();
    }

    #[test]
    fn indicatif_reporter_counts_per_phase() {
        let reporter = IndicatifReporter::hidden();
        reporter.start("index", Some(10));
        reporter.advance(4);
        reporter.advance(6);
        assert_eq!(reporter.completed(), 10);

        reporter.start("extract", None);
        assert_eq!(reporter.completed(), 0);
        reporter.advance(1);
        reporter.finish();
        assert_eq!(reporter.completed(), 1);
    }
}
