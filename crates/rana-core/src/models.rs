pub mod monitor;
pub mod project;
pub mod revision;

pub use monitor::{Job, Publication};
pub use project::{Project, ProjectFile, UploadSession};
pub use revision::{
    Download, FileMeta, ModelArtifact, RasterReference, RemoteRevision, RevisionDatabase,
    Schematisation, ThreediModel,
};

use serde::{Deserialize, Deserializer};

/// Remote ids arrive as either JSON strings or numbers; keep them as strings.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
