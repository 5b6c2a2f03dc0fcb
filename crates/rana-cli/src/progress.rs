use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a progress bar for determinate progress
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n[{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.set_message(message.to_string());
    pb
}

/// Finish a progress bar with success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.abandon_with_message(format!("✗ {}", message));
}

/// Percentage bar for a single file transfer
///
/// Starts as a spinner and switches to a bar once a percentage is known.
pub struct TransferProgress {
    bar: ProgressBar,
    label: String,
    determinate: bool,
}

impl TransferProgress {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self { bar: create_spinner(&label), label, determinate: false }
    }

    pub fn update(&mut self, percent: Option<u8>) {
        let Some(percent) = percent else {
            return;
        };
        if !self.determinate {
            self.bar.finish_and_clear();
            self.bar = create_progress_bar(100, &self.label);
            self.determinate = true;
        }
        self.bar.set_position(u64::from(percent));
    }

    /// Hide the bar while a dialog is shown
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }

    pub fn succeed(&self, message: &str) {
        finish_success(&self.bar, message);
    }

    pub fn fail(&self, message: &str) {
        finish_error(&self.bar, message);
    }
}
