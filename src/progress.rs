//! Progress reporting for apply operations.

use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{ApplyProgress, OpKind, OpRecord};

/// Progress bar over the operations of one changeset.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("valid progress template")
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// A bar that renders nothing, for quiet mode.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

impl ApplyProgress for BarProgress {
    fn on_op_start(&mut self, section: &str, kind: OpKind, name: &str) {
        self.bar
            .set_message(format!("{} {}['{}']", kind.verb(), section, name));
    }

    fn on_op_complete(&mut self, _record: &OpRecord) {
        self.bar.inc(1);
    }
}
