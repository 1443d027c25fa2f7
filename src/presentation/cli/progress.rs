//! Progress reporting for CLI

use indicatif::{ProgressBar, ProgressStyle};

/// A spinner for long walks whose total size (file count) is not known
/// ahead of time, ticking once per file written.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn for_restore() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        bar.set_message("restoring files...");
        Self { bar }
    }

    pub fn update(&self, files_written: u64) {
        self.bar.tick();
        self.bar.set_message(format!("{files_written} file(s) restored"));
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
