//! Terminal implementations of the host collaborators

use console::style;
use dialoguer::{Confirm, Select};
use indicatif::ProgressBar;
use rana_core::ports::{Communication, ProgressSink, UserPrompt};
use std::sync::Mutex;

use crate::progress::create_progress_bar;

/// Dialogs through dialoguer
///
/// The dialogs block; they are run with `block_in_place` so other tasks on
/// the (multi-threaded) runtime keep going.
pub struct DialoguerPrompt;

impl UserPrompt for DialoguerPrompt {
    fn ask(&self, title: &str, question: &str) -> bool {
        tokio::task::block_in_place(|| {
            Confirm::new()
                .with_prompt(format!("{}: {}", title, question))
                .default(false)
                .interact()
                .unwrap_or(false)
        })
    }

    fn custom_ask(&self, title: &str, question: &str, options: &[&str]) -> Option<String> {
        tokio::task::block_in_place(|| {
            println!("{}", style(title).bold());
            Select::new()
                .with_prompt(question)
                .items(options)
                .default(0)
                .interact_opt()
                .ok()
                .flatten()
                .and_then(|index| options.get(index).map(|o| o.to_string()))
        })
    }
}

/// Messages on the terminal; log-only messages go to tracing
pub struct ConsoleCommunication {
    json: bool,
}

impl ConsoleCommunication {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl Communication for ConsoleCommunication {
    fn bar_info(&self, message: &str) {
        if !self.json {
            eprintln!("{} {}", style("ℹ").blue().bold(), message);
        }
    }

    fn show_info(&self, message: &str) {
        if !self.json {
            eprintln!("{} {}", style("ℹ").blue().bold(), message);
        }
    }

    fn show_warn(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow().bold(), message);
    }

    fn show_error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red().bold(), message);
    }

    fn log_info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn log_warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Step progress of a reconciliation run
pub struct IndicatifProgress {
    label: String,
    bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), bar: Mutex::new(None) }
    }

    pub fn finish(&self) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressSink for IndicatifProgress {
    fn set_maximum(&self, maximum: u64) {
        let mut bar = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        match bar.as_ref() {
            Some(existing) => existing.set_length(maximum),
            None => *bar = Some(create_progress_bar(maximum, &self.label)),
        }
    }

    fn set_value(&self, value: u64) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            bar.set_position(value);
        }
    }
}
