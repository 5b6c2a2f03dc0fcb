use rana_core::config::ConfigSource;
use rana_store::LocalSchematisation;
use serde::Serialize;
use tabled::Tabled;

/// Row of `schematisation list`
#[derive(Debug, Serialize, Tabled)]
pub struct LocalSchematisationRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "WIP based on")]
    pub wip: String,
    #[tabled(rename = "Revisions")]
    pub revisions: String,
}

impl From<&LocalSchematisation> for LocalSchematisationRow {
    fn from(local: &LocalSchematisation) -> Self {
        let revisions: Vec<String> = local.revisions.keys().rev().map(|n| n.to_string()).collect();
        Self {
            id: local.id,
            name: local.name.clone(),
            wip: local
                .wip_revision
                .as_ref()
                .map(|w| format!("revision {}", w.number))
                .unwrap_or_else(|| "-".to_string()),
            revisions: if revisions.is_empty() { "-".to_string() } else { revisions.join(", ") },
        }
    }
}

/// Row of `config`
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

impl ConfigRow {
    pub fn new(key: String, value: String, source: ConfigSource) -> Self {
        Self { key, value, source: format!("{:?}", source) }
    }
}

/// Output for `schematisation download` and `schematisation load`
#[derive(Debug, Serialize)]
pub struct LoadOutput {
    pub schematisation_id: i64,
    pub revision: i64,
    pub geopackage: Option<String>,
}

/// Output for `file download` and `file upload`
#[derive(Debug, Serialize)]
pub struct TransferOutput {
    pub project: String,
    pub path: String,
    pub local_path: String,
}
