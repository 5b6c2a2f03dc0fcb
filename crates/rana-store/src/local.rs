//! Filesystem registry of locally stored schematisation revisions.
//!
//! Layout under the working directory:
//!
//! ```text
//! <working_dir>/<schematisation name>/
//!     admin/schematisation.json
//!     work in progress/{schematisation/rasters, grid, results}
//!     revision <n>/{schematisation/rasters, grid, results}
//! ```

use rana_core::error::{RanaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths::schematisation_dir_name;

const ADMIN_DIR: &str = "admin";
const CONFIG_FILE: &str = "schematisation.json";
const WIP_DIR: &str = "work in progress";
const REVISION_DIR_PREFIX: &str = "revision ";

/// Whether a revision is the mutable WIP or an immutable numbered revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionKind {
    Numbered,
    WorkInProgress,
}

/// A revision directory of a local schematisation
///
/// For the WIP, `number` is the remote revision the WIP was based on.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRevision {
    pub kind: RevisionKind,
    pub number: i64,
    pub schematisation_name: String,
    schematisation_main_dir: PathBuf,
}

impl LocalRevision {
    fn new(kind: RevisionKind, number: i64, name: &str, main_dir: &Path) -> Self {
        Self {
            kind,
            number,
            schematisation_name: name.to_string(),
            schematisation_main_dir: main_dir.to_path_buf(),
        }
    }

    pub fn is_wip(&self) -> bool {
        self.kind == RevisionKind::WorkInProgress
    }

    /// Directory name relative to the schematisation main directory
    pub fn sub_dir(&self) -> String {
        match self.kind {
            RevisionKind::WorkInProgress => WIP_DIR.to_string(),
            RevisionKind::Numbered => format!("{}{}", REVISION_DIR_PREFIX, self.number),
        }
    }

    pub fn main_dir(&self) -> PathBuf {
        self.schematisation_main_dir.join(self.sub_dir())
    }

    pub fn schematisation_dir(&self) -> PathBuf {
        self.main_dir().join("schematisation")
    }

    pub fn raster_dir(&self) -> PathBuf {
        self.schematisation_dir().join("rasters")
    }

    pub fn grid_dir(&self) -> PathBuf {
        self.main_dir().join("grid")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.main_dir().join("results")
    }

    /// Create the directory skeleton; existing files are left untouched
    pub fn make_structure(&self) -> Result<()> {
        fs::create_dir_all(self.raster_dir())?;
        fs::create_dir_all(self.grid_dir())?;
        fs::create_dir_all(self.results_dir())?;
        Ok(())
    }

    /// Database of this revision: the first geopackage, else the first
    /// legacy `.sqlite` file in the schematisation directory.
    pub fn schematisation_db_filepath(&self) -> Result<Option<PathBuf>> {
        let dir = self.schematisation_dir();
        if !dir.exists() {
            return Ok(None);
        }

        let entries = fs::read_dir(&dir).map_err(|e| RanaError::InvalidLayout {
            path: dir.clone(),
            reason: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        for extension in ["gpkg", "sqlite"] {
            if let Some(found) = files.iter().find(|p| has_extension(p, extension)) {
                return Ok(Some(found.clone()));
            }
        }
        Ok(None)
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Contents of `admin/schematisation.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchematisationConfig {
    id: i64,
    name: String,
    #[serde(default)]
    wip_parent_revision: Option<i64>,
}

/// A schematisation stored under a working directory
#[derive(Debug, Clone)]
pub struct LocalSchematisation {
    pub working_dir: PathBuf,
    pub id: i64,
    pub name: String,
    pub revisions: BTreeMap<i64, LocalRevision>,
    pub wip_revision: Option<LocalRevision>,
}

impl LocalSchematisation {
    /// Open a schematisation, creating its directory and admin file when
    /// `create` is set. Revisions already on disk are picked up.
    pub fn new(working_dir: &Path, id: i64, name: &str, create: bool) -> Result<Self> {
        let mut schematisation = Self {
            working_dir: working_dir.to_path_buf(),
            id,
            name: name.to_string(),
            revisions: BTreeMap::new(),
            wip_revision: None,
        };

        let wip_parent = schematisation.read_config().ok().and_then(|c| c.wip_parent_revision);
        if create {
            fs::create_dir_all(schematisation.admin_dir())?;
            schematisation.write_config(wip_parent)?;
        }
        schematisation.scan_revisions(wip_parent)?;
        Ok(schematisation)
    }

    /// Load an existing schematisation from its main directory
    pub fn load(main_dir: &Path) -> Result<Self> {
        let config_path = main_dir.join(ADMIN_DIR).join(CONFIG_FILE);
        let config = read_config_file(&config_path)?;
        let working_dir = main_dir.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut schematisation = Self {
            working_dir,
            id: config.id,
            name: config.name,
            revisions: BTreeMap::new(),
            wip_revision: None,
        };
        schematisation.scan_revisions(config.wip_parent_revision)?;
        Ok(schematisation)
    }

    pub fn main_dir(&self) -> PathBuf {
        self.working_dir.join(schematisation_dir_name(&self.name, self.id))
    }

    pub fn admin_dir(&self) -> PathBuf {
        self.main_dir().join(ADMIN_DIR)
    }

    fn config_path(&self) -> PathBuf {
        self.admin_dir().join(CONFIG_FILE)
    }

    /// Make `number` the base of the WIP revision
    pub fn set_wip_revision(&mut self, number: i64) -> Result<&LocalRevision> {
        let wip = LocalRevision::new(
            RevisionKind::WorkInProgress,
            number,
            &self.name,
            &self.main_dir(),
        );
        wip.make_structure()?;
        self.write_config(Some(number))?;
        tracing::debug!(schematisation_id = self.id, revision = number, "WIP revision set");
        Ok(self.wip_revision.insert(wip))
    }

    /// Register a numbered revision, creating its directories if needed
    pub fn add_revision(&mut self, number: i64) -> Result<&LocalRevision> {
        let revision =
            LocalRevision::new(RevisionKind::Numbered, number, &self.name, &self.main_dir());
        revision.make_structure()?;
        tracing::debug!(schematisation_id = self.id, revision = number, "Revision added");
        self.revisions.insert(number, revision);
        Ok(&self.revisions[&number])
    }

    fn read_config(&self) -> Result<SchematisationConfig> {
        read_config_file(&self.config_path())
    }

    fn write_config(&self, wip_parent_revision: Option<i64>) -> Result<()> {
        fs::create_dir_all(self.admin_dir())?;
        let config = SchematisationConfig {
            id: self.id,
            name: self.name.clone(),
            wip_parent_revision,
        };
        fs::write(self.config_path(), serde_json::to_vec_pretty(&config)?)?;
        Ok(())
    }

    fn scan_revisions(&mut self, wip_parent: Option<i64>) -> Result<()> {
        let main_dir = self.main_dir();
        if !main_dir.is_dir() {
            return Ok(());
        }

        for entry in fs::read_dir(&main_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy().to_string();
            if dir_name == WIP_DIR {
                // WIP without a recorded parent was created from scratch
                let number = wip_parent.unwrap_or(0);
                self.wip_revision = Some(LocalRevision::new(
                    RevisionKind::WorkInProgress,
                    number,
                    &self.name,
                    &main_dir,
                ));
            } else if let Some(number) = dir_name
                .strip_prefix(REVISION_DIR_PREFIX)
                .and_then(|n| n.trim().parse::<i64>().ok())
            {
                self.revisions.insert(
                    number,
                    LocalRevision::new(RevisionKind::Numbered, number, &self.name, &main_dir),
                );
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SchematisationConfig> {
    let content = fs::read(path).map_err(|e| RanaError::InvalidLayout {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&content).map_err(|e| RanaError::InvalidLayout {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Every schematisation stored under `working_dir`, keyed by id
///
/// Directories without a readable admin file are skipped.
pub fn list_local_schematisations(working_dir: &Path) -> Result<BTreeMap<i64, LocalSchematisation>> {
    let mut found = BTreeMap::new();
    if !working_dir.is_dir() {
        return Ok(found);
    }

    for entry in fs::read_dir(working_dir)? {
        let path = entry?.path();
        if !path.join(ADMIN_DIR).join(CONFIG_FILE).is_file() {
            continue;
        }
        match LocalSchematisation::load(&path) {
            Ok(schematisation) => {
                found.insert(schematisation.id, schematisation);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Skipping local schematisation: {}", e);
            }
        }
    }
    Ok(found)
}

/// Replace the schematisation data of `target` with a copy of `source`'s
pub fn replace_revision_data(source: &LocalRevision, target: &LocalRevision) -> Result<()> {
    let target_dir = target.schematisation_dir();
    if target_dir.exists() {
        fs::remove_dir_all(&target_dir)?;
    }
    copy_dir_all(&source.schematisation_dir(), &target_dir)?;
    fs::create_dir_all(target.raster_dir())?;
    Ok(())
}

fn copy_dir_all(source: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target)?;
    if !source.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let destination = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &destination)?;
        } else {
            fs::copy(entry.path(), destination)?;
        }
    }
    Ok(())
}
