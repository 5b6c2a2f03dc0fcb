use console::style;
use std::fmt;

/// Error with context and suggested fixes
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// No API token in the environment
pub fn missing_token(var: &str) -> CliError {
    CliError::new("No API token available")
        .with_context(format!("The {} environment variable is not set.", var))
        .with_suggestion(format!("Create a personal API key and export it: export {}=\"...\"", var))
        .with_help("Run: rana config")
}

/// Project commands need a tenant
pub fn missing_tenant() -> CliError {
    CliError::new("No tenant configured")
        .with_context("Project files and jobs live inside a tenant.")
        .with_suggestion("Pass --tenant <name>")
        .with_suggestion("Or export RANA_TENANT=<name>")
        .with_suggestion("Or add `tenant = \"<name>\"` to the config file")
        .with_help("Run: rana config")
}

/// Schematisation not present in the working directory
pub fn local_schematisation_not_found(id: i64, working_dir: &str) -> CliError {
    CliError::new(format!("Schematisation {} is not stored locally", id))
        .with_context(format!("Working directory: {}", working_dir))
        .with_suggestion(format!("Download it first: rana schematisation download {}", id))
        .with_suggestion("Or point --working-dir to where it is stored")
        .with_help("Run: rana schematisation list")
}

/// Remote schematisation without any revision
pub fn no_revisions(id: i64) -> CliError {
    CliError::new(format!("Schematisation {} has no revisions", id))
        .with_context("Only committed revisions can be downloaded.")
        .with_help("Run: rana schematisation download --help")
}

/// Requested revision id is not part of the schematisation
pub fn revision_not_found(id: i64, revision: i64) -> CliError {
    CliError::new(format!("Revision {} not found for schematisation {}", revision, id))
        .with_suggestion("Check the revision id, or omit --revision to use the latest")
        .with_help("Run: rana schematisation download --help")
}

/// Project file not present on the server
pub fn remote_file_not_found(project: &str, path: &str) -> CliError {
    CliError::new("File not found")
        .with_context(format!("Project {} has no file at {}", project, path))
        .with_suggestion("Check the path; it is relative to the project root")
}
