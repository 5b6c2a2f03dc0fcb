use rana_core::error::{RanaError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Extract a zip archive next to itself (or into `location`)
///
/// Returns the archive entry names in archive order.
pub fn unzip_archive(zip_path: &Path, location: Option<&Path>) -> Result<Vec<String>> {
    let location: PathBuf = match location {
        Some(dir) => dir.to_path_buf(),
        None => zip_path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| RanaError::Archive(e.to_string()))?;
    // file_names() iterates in hash order, so entries are read by index
    let mut ordered = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(|e| RanaError::Archive(e.to_string()))?;
        ordered.push(entry.name().to_string());
    }

    archive.extract(&location).map_err(|e| RanaError::Archive(e.to_string()))?;
    Ok(ordered)
}

/// [`unzip_archive`] on the blocking pool
pub async fn unzip_archive_async(zip_path: PathBuf) -> Result<Vec<String>> {
    tokio::task::spawn_blocking(move || unzip_archive(&zip_path, None))
        .await
        .map_err(|e| RanaError::Archive(format!("extraction task failed: {}", e)))?
}
