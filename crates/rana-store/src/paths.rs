use rana_core::error::{RanaError, Result};
use std::path::{Component, Path, PathBuf};

/// Local location of a project file: `<working_dir>/<project slug>/<path>`
///
/// Returns the directory to create and the full file path.
pub fn local_file_path(working_dir: &Path, project_slug: &str, file_path: &str) -> (PathBuf, PathBuf) {
    let mut full = working_dir.join(project_slug);
    for part in file_path.split('/').filter(|p| !p.is_empty() && *p != "." && *p != "..") {
        full.push(part);
    }
    let dir = full.parent().map(Path::to_path_buf).unwrap_or_else(|| working_dir.to_path_buf());
    (dir, full)
}

/// Directory name of a schematisation under the working directory
///
/// Separators are replaced so the name is always one path component. Names
/// that still are not one (empty, `.`, `..`, drive prefixes) fall back to
/// the id.
pub fn schematisation_dir_name(name: &str, id: i64) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    if is_single_component(&cleaned) {
        cleaned
    } else {
        format!("schematisation {}", id)
    }
}

/// `name` unchanged if it is a bare file name that stays in its directory
pub fn plain_file_name(name: &str) -> Result<&str> {
    if !name.contains(['/', '\\']) && is_single_component(name) {
        Ok(name)
    } else {
        Err(RanaError::UnsafePath { name: name.to_string() })
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}
