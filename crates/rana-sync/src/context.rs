use rana_core::ports::{Communication, RevisionClient, SchemaEditor, SettingsStore, UserPrompt};
use std::path::PathBuf;
use std::sync::Arc;

use crate::locks::SchematisationLocks;

/// Everything a reconciliation run needs from its surroundings
///
/// Collaborators are passed in explicitly; nothing is looked up globally.
#[derive(Clone)]
pub struct SyncContext {
    pub revisions: Arc<dyn RevisionClient>,
    pub prompt: Arc<dyn UserPrompt>,
    pub communication: Arc<dyn Communication>,
    pub settings: Arc<dyn SettingsStore>,
    pub schema_editor: Option<Arc<dyn SchemaEditor>>,
    /// Plain client for pre-signed URLs (no API credentials attached)
    pub http: reqwest::Client,
    pub working_dir: PathBuf,
    pub locks: SchematisationLocks,
}

impl SyncContext {
    pub fn new(
        revisions: Arc<dyn RevisionClient>,
        prompt: Arc<dyn UserPrompt>,
        communication: Arc<dyn Communication>,
        settings: Arc<dyn SettingsStore>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            revisions,
            prompt,
            communication,
            settings,
            schema_editor: None,
            http: reqwest::Client::new(),
            working_dir: working_dir.into(),
            locks: SchematisationLocks::default(),
        }
    }

    pub fn with_schema_editor(mut self, editor: Arc<dyn SchemaEditor>) -> Self {
        self.schema_editor = Some(editor);
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}
