use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::string_or_number;

/// A Rana project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub slug: String,
}

/// A file listing entry inside a project
///
/// `id` is the file path within the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub descriptor_id: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub last_modified: String,
}

impl ProjectFile {
    /// File name without the directory part
    pub fn name(&self) -> &str {
        self.id.trim_end_matches('/').rsplit('/').next().unwrap_or(&self.id)
    }
}

/// Upload session returned when an upload is initiated
///
/// Extra fields are preserved so the session can be sent back verbatim when
/// finishing the upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub urls: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
