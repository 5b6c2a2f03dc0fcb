use std::path::Path;

/// Asks the user to make a decision
pub trait UserPrompt: Send + Sync {
    /// Yes/no question
    fn ask(&self, title: &str, question: &str) -> bool;

    /// Pick one of `options`; `None` when the user dismissed the prompt
    fn custom_ask(&self, title: &str, question: &str, options: &[&str]) -> Option<String>;
}

/// User-facing messages emitted by long-running operations
pub trait Communication: Send + Sync {
    fn bar_info(&self, message: &str);
    fn show_info(&self, message: &str);
    fn show_warn(&self, message: &str);
    fn show_error(&self, message: &str);
    fn log_info(&self, message: &str);
    fn log_warn(&self, message: &str);
}

/// Editor able to open a schematisation geopackage
pub trait SchemaEditor: Send + Sync {
    fn load_schematisation(&self, geopackage_path: &Path);
}

/// Step-based progress reporting; the sink owns the percentage conversion
pub trait ProgressSink: Send + Sync {
    fn set_maximum(&self, maximum: u64);
    fn set_value(&self, value: u64);
}
