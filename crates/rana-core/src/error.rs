//! Error types for Rana

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RanaError {
    // Remote errors
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Missing field in remote payload: {field}")]
    MissingField { field: String },

    #[error("Schematisation not found: {id}")]
    SchematisationNotFound { id: i64 },

    #[error("Revision {revision} not found for schematisation {schematisation}")]
    RevisionNotFound { schematisation: i64, revision: i64 },

    // Local store errors
    #[error("Invalid schematisation directory structure at {path}: {reason}")]
    InvalidLayout { path: PathBuf, reason: String },

    #[error("Unsafe file name from server: {name}")]
    UnsafePath { name: String },

    #[error("Archive error: {0}")]
    Archive(String),

    // Credential errors
    #[error("No credentials available: {reason}")]
    Credentials { reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RanaError {
    /// True for API responses that report a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RanaError::Api { status: 404, .. })
    }

    /// Text shown to the user when an operation is aborted by this error.
    pub fn user_message(&self) -> String {
        match self {
            RanaError::Api { body, .. } => extract_error_message(body),
            other => format!("Error: {}", other),
        }
    }
}

impl From<serde_json::Error> for RanaError {
    fn from(e: serde_json::Error) -> Self {
        RanaError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RanaError>;

/// Extract the useful part of a structured API error body.
///
/// Looks at `detail`, then `details`, then an `errors` list. Bodies that are
/// not JSON objects are returned verbatim.
pub fn extract_error_message(body: &str) -> String {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return format!("Error: {}", body),
    };

    let details = match parsed.as_object() {
        Some(object) => {
            if let Some(detail) = object.get("detail") {
                render_value(detail)
            } else if let Some(details) = object.get("details") {
                render_value(details)
            } else if let Some(errors) = object.get("errors") {
                let parts = format_error_entries(errors)
                    .unwrap_or_else(|| error_values(errors));
                format!("\n{}", parts.join("\n"))
            } else {
                body.to_string()
            }
        }
        None => body.to_string(),
    };

    format!("Error: {}", details)
}

/// `"{reason} ({related_object})"` for every entry, or `None` if any entry
/// has a different shape.
fn format_error_entries(errors: &Value) -> Option<Vec<String>> {
    errors
        .as_array()?
        .iter()
        .map(|entry| {
            let reason = entry.get("reason")?;
            let related = entry.get("instance")?.get("related_object")?;
            Some(format!("{} ({})", render_value(reason), render_value(related)))
        })
        .collect()
}

fn error_values(errors: &Value) -> Vec<String> {
    match errors {
        Value::Object(map) => map.values().map(render_value).collect(),
        Value::Array(items) => items.iter().map(render_value).collect(),
        other => vec![render_value(other)],
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
