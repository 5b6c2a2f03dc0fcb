use crate::error::Result;

/// Folder that received the most recent schematisation download
pub const LAST_SCHEMATISATION_FOLDER: &str = "threedi/last_schematisation_folder";

/// Schematisation directory of the most recently loaded WIP revision
pub const LAST_USED_GEOPACKAGE_PATH: &str = "last_used_geopackage_path";

/// Organisation (tenant) the user last worked in
pub const LAST_USED_ORGANISATION: &str = "Rana/last_used_organisation";

/// Key-value settings persisted by the host
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Key under which the server `last_modified` of a downloaded file is kept
pub fn last_modified_key(project_name: &str, file_path: &str) -> String {
    format!("{}/{}/last_modified", project_name, file_path)
}
