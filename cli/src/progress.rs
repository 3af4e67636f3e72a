//! Terminal progress bar for chunked reads.

use indicatif::{ProgressBar, ProgressStyle};
use qset_core::{Progress, SubRange};

pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{prefix} [{bar:40}] {pos}/{len} chunks ({eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }
}

impl Progress for BarProgress {
    fn start(&mut self, label: &str, total: usize) {
        self.bar.set_prefix(label.to_string());
        self.bar.set_length(total as u64);
    }

    fn advance(&mut self, range: &SubRange) {
        self.bar.set_message(range.start.date().to_string());
        self.bar.inc(1);
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}
