//! Reconciliation of a remote revision with the local schematisation store
//!
//! A run decides where the revision should land locally (the WIP or a
//! numbered revision directory), possibly asking the user, then downloads the
//! revision database, its rasters and the gridadmin of the newest simulation
//! model built from it.

use rana_core::error::{RanaError, Result};
use rana_core::models::{Download, ModelArtifact, RemoteRevision, Schematisation};
use rana_core::ports::settings::LAST_SCHEMATISATION_FOLDER;
use rana_core::ports::{ProgressSink, RevisionClient, UserPrompt};
use rana_store::paths::plain_file_name;
use rana_store::{list_local_schematisations, LocalSchematisation};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::unzip_archive_async;
use crate::context::SyncContext;
use crate::download::stream_to_file;

pub const PICK_ACTION_TITLE: &str = "Pick action";
pub const REPLACE: &str = "Replace";
pub const STORE: &str = "Store";
pub const CANCEL: &str = "Cancel";

/// Result of a successful reconciliation
#[derive(Debug, Clone)]
pub struct DownloadedSchematisation {
    pub local: LocalSchematisation,
    /// Schematisation directory the revision was written to
    pub destination: PathBuf,
    /// Database override, set only when the downloaded legacy database has a
    /// `.gpkg` sibling on disk
    pub geopackage_path: Option<PathBuf>,
    /// The WIP was (re)placed with this revision
    pub wip_replace_requested: bool,
}

#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    Downloaded(DownloadedSchematisation),
    /// The user declined; nothing was written
    Cancelled,
    /// An error was reported to the user with this message
    Failed(String),
}

impl ReconcileOutcome {
    pub fn downloaded(&self) -> Option<&DownloadedSchematisation> {
        match self {
            Self::Downloaded(downloaded) => Some(downloaded),
            _ => None,
        }
    }
}

/// Where a revision should be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Make the revision the WIP
    SetWip { replace_requested: bool },
    /// Write it to its numbered revision directory
    StoreRevision,
    Cancel,
}

/// True when `number` is the highest revision number listed remotely
///
/// An empty listing never makes a revision the latest.
pub fn is_latest_revision(number: i64, remote: &[RemoteRevision]) -> bool {
    remote.iter().map(|r| r.number).max() == Some(number)
}

/// Decide the destination of revision `number`
///
/// `local` is `None` when the schematisation has never been stored locally.
/// No state is changed here; a `Cancel` leaves the store untouched.
pub fn decide(
    prompt: &dyn UserPrompt,
    local: Option<&LocalSchematisation>,
    number: i64,
    is_latest: bool,
) -> Decision {
    let Some(local) = local else {
        return Decision::SetWip { replace_requested: true };
    };

    if is_latest && local.wip_revision.is_none() {
        return Decision::SetWip { replace_requested: false };
    }

    let question = format!("Replace local WIP or store as a revision {}?", number);
    match prompt.custom_ask(PICK_ACTION_TITLE, &question, &[REPLACE, STORE, CANCEL]).as_deref() {
        Some(REPLACE) => Decision::SetWip { replace_requested: true },
        Some(STORE) if local.revisions.contains_key(&number) => {
            let question = format!("Replace local revision {} or Cancel?", number);
            match prompt.custom_ask(PICK_ACTION_TITLE, &question, &[REPLACE, CANCEL]).as_deref() {
                Some(REPLACE) => Decision::StoreRevision,
                _ => Decision::Cancel,
            }
        }
        Some(STORE) => Decision::StoreRevision,
        _ => Decision::Cancel,
    }
}

/// Download everything needed to work on `revision` locally
///
/// `is_latest` may be supplied by the caller; when `None` it is computed from
/// the remote revision listing. Errors are shown to the user and returned as
/// [`ReconcileOutcome::Failed`]. Runs for the same schematisation are
/// serialized.
pub async fn download_required_files(
    ctx: &SyncContext,
    schematisation: &Schematisation,
    revision: &RemoteRevision,
    is_latest: Option<bool>,
    progress: &dyn ProgressSink,
) -> ReconcileOutcome {
    let _guard = ctx.locks.lock(schematisation.id).await;
    info!(
        schematisation_id = schematisation.id,
        revision = revision.number,
        "Reconciling schematisation revision"
    );

    match reconcile(ctx, schematisation, revision, is_latest, progress).await {
        Ok(Some(downloaded)) => ReconcileOutcome::Downloaded(downloaded),
        Ok(None) => {
            info!(schematisation_id = schematisation.id, "Reconciliation cancelled");
            ReconcileOutcome::Cancelled
        }
        Err(e) => {
            warn!(schematisation_id = schematisation.id, "Reconciliation failed: {}", e);
            let message = e.user_message();
            ctx.communication.show_error(&message);
            ReconcileOutcome::Failed(message)
        }
    }
}

async fn reconcile(
    ctx: &SyncContext,
    schematisation: &Schematisation,
    revision: &RemoteRevision,
    is_latest: Option<bool>,
    progress: &dyn ProgressSink,
) -> Result<Option<DownloadedSchematisation>> {
    let client = ctx.revisions.as_ref();
    let number = revision.number;

    let is_latest = match is_latest {
        Some(latest) => latest,
        None => is_latest_revision(number, &client.list_revisions(schematisation.id).await?),
    };

    let mut existing = list_local_schematisations(&ctx.working_dir)?;
    let decision = decide(
        ctx.prompt.as_ref(),
        existing.get(&schematisation.id),
        number,
        is_latest,
    );
    debug!(?decision, is_latest, "Revision destination decided");
    if decision == Decision::Cancel {
        return Ok(None);
    }

    // Nothing is written locally until every remote handle is resolved
    let plan = DownloadPlan::fetch(client, schematisation.id, revision).await?;

    let mut local = match existing.remove(&schematisation.id) {
        Some(local) => local,
        None => LocalSchematisation::new(&ctx.working_dir, schematisation.id, &schematisation.name, true)?,
    };

    let (destination, wip_replace_requested) = match decision {
        Decision::Cancel => return Ok(None),
        Decision::SetWip { replace_requested } => {
            (local.set_wip_revision(number)?.schematisation_dir(), replace_requested)
        }
        Decision::StoreRevision => (local.add_revision(number)?.schematisation_dir(), false),
    };

    // Gridadmin files always belong to the numbered revision
    if !local.revisions.contains_key(&number) {
        local.add_revision(number)?;
    }
    let grid_dir = local
        .revisions
        .get(&number)
        .map(|r| r.grid_dir())
        .ok_or(RanaError::RevisionNotFound { schematisation: schematisation.id, revision: number })?;

    let database_file = plan.execute(ctx, &destination, &grid_dir, progress).await?;

    let geopackage_path = geopackage_override(&destination.join(&database_file));

    if let Err(e) = ctx
        .settings
        .set(LAST_SCHEMATISATION_FOLDER, &destination.to_string_lossy())
    {
        warn!("Could not remember schematisation folder: {}", e);
    }
    ctx.communication.bar_info(&format!(
        "Schematisation '{} (revision {})' downloaded!",
        schematisation.name, number
    ));

    Ok(Some(DownloadedSchematisation {
        local,
        destination,
        geopackage_path,
        wip_replace_requested,
    }))
}

/// Remote handles for everything a revision download writes
///
/// Every file name in a plan is a bare name; [`DownloadPlan::fetch`] rejects
/// anything that would resolve outside its target directory.
struct DownloadPlan {
    database_name: String,
    database: Download,
    rasters: Vec<(String, Download)>,
    grid: Option<(ModelArtifact, Option<ModelArtifact>)>,
}

impl DownloadPlan {
    async fn fetch(
        client: &dyn RevisionClient,
        schematisation_id: i64,
        revision: &RemoteRevision,
    ) -> Result<Self> {
        let database_name = match &revision.sqlite {
            Some(database) => plain_file_name(&database.file.filename)?.to_string(),
            None => return Err(RanaError::MissingField { field: "sqlite".to_string() }),
        };
        let database = client.download_database_archive(schematisation_id, revision.id).await?;

        let mut rasters = Vec::with_capacity(revision.rasters.len());
        for raster in &revision.rasters {
            let name = plain_file_name(&raster.name)?.to_string();
            let download = client.download_raster(raster.id, schematisation_id, revision.id).await?;
            rasters.push((name, download));
        }

        let models = client.find_models_for_revision(schematisation_id, revision.id).await?;
        let grid = find_gridadmin(client, models.iter().map(|m| m.id).collect()).await?;
        if let Some((gridadmin, geopackage)) = &grid {
            for artifact in std::iter::once(gridadmin).chain(geopackage.iter()) {
                plain_file_name(&artifact.file.filename)?;
            }
        }

        Ok(Self { database_name, database, rasters, grid })
    }

    /// Number of progress steps: database, each raster, gridadmin with its geopackage
    fn steps(&self) -> u64 {
        1 + self.rasters.len() as u64 + u64::from(self.grid.is_some())
    }

    /// Write everything to disk and return the database file name
    async fn execute(
        &self,
        ctx: &SyncContext,
        destination: &Path,
        grid_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<String> {
        let mut step = 0;
        progress.set_maximum(self.steps());
        progress.set_value(step);

        let zip_path = destination.join(&self.database_name);
        stream_to_file(&ctx.http, &self.database.get_url, &zip_path, |_| {}).await?;
        let content = unzip_archive_async(zip_path.clone()).await?;
        tokio::fs::remove_file(&zip_path).await?;
        let database_file = content
            .into_iter()
            .next()
            .ok_or_else(|| RanaError::Archive(format!("{} is empty", self.database_name)))?;
        step += 1;
        progress.set_value(step);

        let raster_dir = destination.join("rasters");
        for (name, download) in &self.rasters {
            tokio::fs::create_dir_all(&raster_dir).await?;
            stream_to_file(&ctx.http, &download.get_url, &raster_dir.join(name), |_| {}).await?;
            step += 1;
            progress.set_value(step);
        }

        if let Some((gridadmin, geopackage)) = &self.grid {
            tokio::fs::create_dir_all(grid_dir).await?;
            for artifact in std::iter::once(gridadmin).chain(geopackage.iter()) {
                let path = grid_dir.join(&artifact.file.filename);
                stream_to_file(&ctx.http, &artifact.download.get_url, &path, |_| {}).await?;
            }
            step += 1;
            progress.set_value(step);
        }

        Ok(database_file)
    }
}

/// Gridadmin of the newest model that has one, with its geopackage if present
async fn find_gridadmin(
    client: &dyn RevisionClient,
    mut model_ids: Vec<i64>,
) -> Result<Option<(ModelArtifact, Option<ModelArtifact>)>> {
    model_ids.sort_unstable_by(|a, b| b.cmp(a));

    for model_id in model_ids {
        let gridadmin = match client.download_gridadmin(model_id).await {
            Ok(artifact) => artifact,
            Err(e) if e.is_not_found() => {
                debug!(model_id, "No gridadmin for model");
                continue;
            }
            Err(e) => return Err(e),
        };
        let geopackage = match client.download_gridadmin_geopackage(model_id).await {
            Ok(artifact) => Some(artifact),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        return Ok(Some((gridadmin, geopackage)));
    }
    Ok(None)
}

/// `.gpkg` sibling of a legacy `.sqlite` database, if it exists on disk
fn geopackage_override(database: &Path) -> Option<PathBuf> {
    let is_sqlite = database
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("sqlite"))
        .unwrap_or(false);
    if !is_sqlite {
        return None;
    }
    let geopackage = database.with_extension("gpkg");
    geopackage.is_file().then_some(geopackage)
}
