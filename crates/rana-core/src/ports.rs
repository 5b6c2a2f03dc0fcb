//! Port trait definitions
//!
//! These traits define the collaborators that adapters must implement: the
//! remote services, the host application and its settings storage.

pub mod host;
pub mod remote;
pub mod settings;

pub use host::{Communication, ProgressSink, SchemaEditor, UserPrompt};
pub use remote::{CredentialProvider, ProjectClient, RevisionClient};
pub use settings::SettingsStore;
