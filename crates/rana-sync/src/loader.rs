//! Handing schematisations to the schema editor

use rana_core::error::{RanaError, Result};
use rana_core::models::{RemoteRevision, Schematisation};
use rana_core::ports::settings::LAST_USED_GEOPACKAGE_PATH;
use rana_core::ports::{Communication, ProgressSink, SchemaEditor, UserPrompt};
use rana_store::{replace_revision_data, LocalRevision, LocalSchematisation};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::context::SyncContext;
use crate::reconcile::{download_required_files, ReconcileOutcome, CANCEL, PICK_ACTION_TITLE, REPLACE};

pub const INVALID_STRUCTURE_MESSAGE: &str =
    "Invalid schematisation directory structure. Loading schematisation canceled.";

/// How a schematisation came to be loaded, used in user messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildAction {
    Created,
    Loaded,
    Downloaded,
}

impl BuildAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Loaded => "loaded",
            Self::Downloaded => "downloaded",
        }
    }
}

impl fmt::Display for BuildAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconcile a remote revision and load the result
///
/// Returns the geopackage handed to the editor, or `None` when the run was
/// cancelled or failed.
pub async fn load_remote_schematisation(
    ctx: &SyncContext,
    schematisation: &Schematisation,
    revision: &RemoteRevision,
    progress: &dyn ProgressSink,
) -> Option<PathBuf> {
    let downloaded = match download_required_files(ctx, schematisation, revision, None, progress).await {
        ReconcileOutcome::Downloaded(downloaded) => downloaded,
        ReconcileOutcome::Cancelled => return None,
        ReconcileOutcome::Failed(error) => {
            debug!(schematisation_id = schematisation.id, %error, "Reconciliation failed, nothing loaded");
            return None;
        }
    };

    let local = &downloaded.local;
    let target = if downloaded.wip_replace_requested {
        local.wip_revision.as_ref()
    } else {
        local.revisions.get(&revision.number)
    };

    let loaded = load_local_schematisation(
        ctx.communication.as_ref(),
        ctx.schema_editor.as_deref(),
        target,
        BuildAction::Downloaded,
        downloaded.geopackage_path.as_deref(),
    );

    if let Some(wip) = &local.wip_revision {
        let path = wip.schematisation_dir();
        if let Err(e) = ctx.settings.set(LAST_USED_GEOPACKAGE_PATH, &path.to_string_lossy()) {
            warn!("Could not remember geopackage path: {}", e);
        }
    }
    loaded
}

/// [`load_remote_schematisation`] for raw key-value payloads
pub async fn load_remote_schematisation_payload(
    ctx: &SyncContext,
    schematisation: Value,
    revision: Value,
    progress: &dyn ProgressSink,
) -> Option<PathBuf> {
    let parsed = Schematisation::from_payload(schematisation)
        .and_then(|s| RemoteRevision::from_payload(revision).map(|r| (s, r)));
    match parsed {
        Ok((schematisation, revision)) => {
            load_remote_schematisation(ctx, &schematisation, &revision, progress).await
        }
        Err(e) => {
            ctx.communication.show_error(&e.user_message());
            None
        }
    }
}

/// Hand a local revision's database to the schema editor
///
/// `custom_geopackage` takes precedence over the revision's own database.
/// Without an editor the user is told where the geopackage is instead.
pub fn load_local_schematisation(
    communication: &dyn Communication,
    editor: Option<&dyn SchemaEditor>,
    revision: Option<&LocalRevision>,
    action: BuildAction,
    custom_geopackage: Option<&Path>,
) -> Option<PathBuf> {
    let revision = revision?;

    let geopackage = match custom_geopackage {
        Some(path) => path.to_path_buf(),
        None => match revision.schematisation_db_filepath() {
            Ok(Some(path)) => path,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cannot locate schematisation database: {}", e);
                communication.show_error(INVALID_STRUCTURE_MESSAGE);
                return None;
            }
        },
    };

    let message = format!(
        "Schematisation '{} ({})' {}!\n",
        revision.schematisation_name, revision.number, action
    );
    communication.bar_info(message.trim_end());
    communication.log_info(&format!("Loading schematisation from {}", geopackage.display()));

    match editor {
        Some(editor) => editor.load_schematisation(&geopackage),
        None => communication.show_warn(&format!(
            "{}Please use the Rana Schematisation Editor to load it to your project from the GeoPackage:\n{}",
            message,
            geopackage.display()
        )),
    }
    Some(geopackage)
}

/// Which local revision to work on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionChoice {
    Wip,
    Numbered(i64),
}

/// Local revisions in pick-list order: the WIP first, then newest first
pub fn local_revisions_newest_first(local: &LocalSchematisation) -> Vec<&LocalRevision> {
    local
        .wip_revision
        .iter()
        .chain(local.revisions.values().rev())
        .collect()
}

/// Resolve a pick-list choice to the revision that should be loaded
///
/// Picking a numbered revision offers to copy its data into the WIP, which
/// is then returned. `None` means the user cancelled.
pub fn select_local_revision(
    local: &mut LocalSchematisation,
    choice: RevisionChoice,
    prompt: &dyn UserPrompt,
) -> Result<Option<LocalRevision>> {
    let number = match choice {
        RevisionChoice::Wip => {
            return local.wip_revision.clone().map(Some).ok_or_else(|| RanaError::InvalidLayout {
                path: local.main_dir(),
                reason: "no work in progress revision".to_string(),
            });
        }
        RevisionChoice::Numbered(number) => number,
    };

    let source = local
        .revisions
        .get(&number)
        .cloned()
        .ok_or(RanaError::RevisionNotFound { schematisation: local.id, revision: number })?;

    let question = format!("Upload data from revision {}?", number);
    if prompt.custom_ask(PICK_ACTION_TITLE, &question, &[REPLACE, CANCEL]).as_deref() != Some(REPLACE) {
        return Ok(None);
    }

    let wip = local.set_wip_revision(number)?.clone();
    replace_revision_data(&source, &wip)?;
    Ok(Some(wip))
}
