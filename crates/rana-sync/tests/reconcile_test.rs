mod common;

use common::*;
use rana_core::models::{RemoteRevision, Schematisation, ThreediModel};
use rana_core::ports::settings::LAST_SCHEMATISATION_FOLDER;
use rana_core::ports::SettingsStore;
use rana_store::{LocalSchematisation, MemorySettingsStore};
use rana_sync::reconcile::{CANCEL, REPLACE, STORE};
use rana_sync::{download_required_files, ReconcileOutcome, SyncContext};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    working_dir: PathBuf,
    client: Arc<FakeRevisionClient>,
    prompt: Arc<ScriptedPrompt>,
    communication: Arc<RecordingCommunication>,
    settings: Arc<MemorySettingsStore>,
    ctx: SyncContext,
}

async fn harness<F>(answers: &[&'static str], configure: F) -> Harness
where
    F: FnOnce(&mut FakeRevisionClient),
{
    let server = spawn_file_server(vec![
        ("db.zip", zip_bytes(&[("model.sqlite", b"sqlite"), ("model.gpkg", b"gpkg")])),
        ("raster-7", b"dem".to_vec()),
        ("raster-8", b"friction".to_vec()),
        ("gridadmin.h5", b"h5".to_vec()),
        ("gridadmin.gpkg", b"grid gpkg".to_vec()),
    ])
    .await;

    let dir = TempDir::new().unwrap();
    let working_dir = dir.path().to_path_buf();
    let mut client = FakeRevisionClient::new(&server);
    configure(&mut client);
    let client = Arc::new(client);
    let prompt = Arc::new(ScriptedPrompt::answering(answers));
    let communication = Arc::new(RecordingCommunication::default());
    let settings = Arc::new(MemorySettingsStore::new());

    let ctx = SyncContext::new(
        client.clone(),
        prompt.clone(),
        communication.clone(),
        settings.clone(),
        &working_dir,
    );
    Harness { _dir: dir, working_dir, client, prompt, communication, settings, ctx }
}

fn models(ids: &[i64]) -> Vec<ThreediModel> {
    ids.iter().map(|id| ThreediModel { id: *id, name: None }).collect()
}

fn stored(h: &Harness) -> LocalSchematisation {
    LocalSchematisation::load(&h.working_dir.join("Polder")).unwrap()
}

fn existing_local(h: &Harness, wip: Option<i64>, revisions: &[i64]) {
    let mut local = LocalSchematisation::new(&h.working_dir, 1, "Polder", true).unwrap();
    if let Some(number) = wip {
        local.set_wip_revision(number).unwrap();
    }
    for number in revisions {
        local.add_revision(*number).unwrap();
    }
}

#[tokio::test]
async fn test_fresh_schematisation_is_downloaded_into_wip() {
    // Nothing listed remotely yet, so the revision is not considered the latest
    let h = harness(&[], |client| {
        client.revisions = Vec::new();
        client.models = models(&[3, 5]);
        client.gridadmins = HashMap::from([(3, true)]);
    })
    .await;
    let revision = remote_revision(1, &[(7, "dem.tif")]);
    let progress = RecordingProgress::default();

    let outcome = download_required_files(&h.ctx, &schematisation(), &revision, None, &progress).await;

    let downloaded = outcome.downloaded().expect("revision should be downloaded");
    let wip = downloaded.local.wip_revision.clone().unwrap();
    assert!(downloaded.wip_replace_requested);
    assert_eq!(wip.number, 1);
    assert_eq!(downloaded.destination, wip.schematisation_dir());

    let destination = &downloaded.destination;
    assert!(destination.join("model.sqlite").is_file());
    assert!(!destination.join("db.zip").exists());
    assert_eq!(std::fs::read(destination.join("rasters").join("dem.tif")).unwrap(), b"dem");
    assert_eq!(downloaded.geopackage_path, Some(destination.join("model.gpkg")));

    let grid_dir = downloaded.local.revisions[&1].grid_dir();
    assert_eq!(std::fs::read(grid_dir.join("gridadmin.h5")).unwrap(), b"h5");
    assert!(grid_dir.join("gridadmin.gpkg").is_file());

    assert_eq!(*progress.maximum.lock().unwrap(), Some(3));
    assert_eq!(progress.values(), vec![0, 1, 2, 3]);
    assert!(h.prompt.questions().is_empty());

    let gridadmin_calls: Vec<String> =
        h.client.calls().into_iter().filter(|c| c.starts_with("gridadmin")).collect();
    assert_eq!(gridadmin_calls, vec!["gridadmin 5", "gridadmin 3"]);

    assert_eq!(
        h.settings.get(LAST_SCHEMATISATION_FOLDER),
        Some(destination.to_string_lossy().to_string())
    );
    assert_eq!(
        h.communication.of_kind("bar_info"),
        vec!["Schematisation 'Polder (revision 1)' downloaded!".to_string()]
    );

    let on_disk = stored(&h);
    assert_eq!(on_disk.wip_revision.map(|w| w.number), Some(1));
    assert!(on_disk.revisions.contains_key(&1));
}

#[tokio::test]
async fn test_cancel_leaves_store_untouched() {
    let h = harness(&[CANCEL], |client| {
        client.revisions = vec![remote_revision(1, &[]), remote_revision(2, &[])];
    })
    .await;
    existing_local(&h, Some(1), &[]);
    let progress = RecordingProgress::default();

    let outcome =
        download_required_files(&h.ctx, &schematisation(), &remote_revision(2, &[]), None, &progress).await;

    assert!(matches!(outcome, ReconcileOutcome::Cancelled));
    assert_eq!(h.prompt.questions(), vec!["Replace local WIP or store as a revision 2?"]);
    assert_eq!(h.client.calls(), vec!["revisions 1"]);
    assert!(progress.values().is_empty());

    let on_disk = stored(&h);
    assert_eq!(on_disk.wip_revision.map(|w| w.number), Some(1));
    assert!(on_disk.revisions.is_empty());
    assert!(!h.working_dir.join("Polder").join("revision 2").exists());
}

#[tokio::test]
async fn test_store_writes_numbered_revision_and_keeps_wip() {
    let h = harness(&[STORE], |_| {}).await;
    existing_local(&h, Some(1), &[]);
    let progress = RecordingProgress::default();

    let outcome = download_required_files(
        &h.ctx,
        &schematisation(),
        &remote_revision(2, &[]),
        Some(true),
        &progress,
    )
    .await;

    let downloaded = outcome.downloaded().unwrap();
    assert!(!downloaded.wip_replace_requested);
    let revision_dir = downloaded.local.revisions[&2].schematisation_dir();
    assert_eq!(downloaded.destination, revision_dir);
    assert!(revision_dir.join("model.sqlite").is_file());

    let on_disk = stored(&h);
    assert_eq!(on_disk.wip_revision.map(|w| w.number), Some(1));
    assert!(!h.client.calls().contains(&"revisions 1".to_string()));
}

#[tokio::test]
async fn test_replace_moves_wip_to_revision() {
    let h = harness(&[REPLACE], |_| {}).await;
    existing_local(&h, Some(1), &[]);
    let progress = RecordingProgress::default();

    let outcome =
        download_required_files(&h.ctx, &schematisation(), &remote_revision(3, &[]), Some(false), &progress)
            .await;

    let downloaded = outcome.downloaded().unwrap();
    assert!(downloaded.wip_replace_requested);
    assert_eq!(stored(&h).wip_revision.map(|w| w.number), Some(3));
    // Gridadmin files always get a numbered revision to live in
    assert!(downloaded.local.revisions.contains_key(&3));
}

#[tokio::test]
async fn test_storing_over_existing_revision_needs_confirmation() {
    let h = harness(&[STORE, CANCEL], |_| {}).await;
    existing_local(&h, Some(1), &[2]);
    let progress = RecordingProgress::default();

    let outcome =
        download_required_files(&h.ctx, &schematisation(), &remote_revision(2, &[]), Some(false), &progress)
            .await;

    assert!(matches!(outcome, ReconcileOutcome::Cancelled));
    assert_eq!(
        h.prompt.questions(),
        vec![
            "Replace local WIP or store as a revision 2?".to_string(),
            "Replace local revision 2 or Cancel?".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_latest_revision_without_wip_is_set_silently() {
    let h = harness(&[], |client| {
        client.revisions = vec![remote_revision(1, &[]), remote_revision(4, &[])];
    })
    .await;
    existing_local(&h, None, &[1]);
    let progress = RecordingProgress::default();

    let outcome =
        download_required_files(&h.ctx, &schematisation(), &remote_revision(4, &[]), None, &progress).await;

    let downloaded = outcome.downloaded().unwrap();
    assert!(!downloaded.wip_replace_requested);
    assert_eq!(downloaded.local.wip_revision.as_ref().map(|w| w.number), Some(4));
    assert!(h.prompt.questions().is_empty());
}

#[tokio::test]
async fn test_missing_geopackage_export_is_tolerated() {
    let h = harness(&[], |client| {
        client.models = models(&[3]);
        client.gridadmins = HashMap::from([(3, false)]);
    })
    .await;
    let progress = RecordingProgress::default();

    let outcome = download_required_files(
        &h.ctx,
        &schematisation(),
        &remote_revision(1, &[(7, "dem.tif"), (8, "friction.tif")]),
        None,
        &progress,
    )
    .await;

    let downloaded = outcome.downloaded().unwrap();
    let grid_dir = downloaded.local.revisions[&1].grid_dir();
    assert!(grid_dir.join("gridadmin.h5").is_file());
    assert!(!grid_dir.join("gridadmin.gpkg").exists());
    assert_eq!(*progress.maximum.lock().unwrap(), Some(4));
    assert_eq!(progress.values(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_without_models_only_database_is_downloaded() {
    let h = harness(&[], |_| {}).await;
    let progress = RecordingProgress::default();

    let outcome =
        download_required_files(&h.ctx, &schematisation(), &remote_revision(1, &[]), None, &progress).await;

    let downloaded = outcome.downloaded().unwrap();
    assert_eq!(*progress.maximum.lock().unwrap(), Some(1));
    assert_eq!(progress.values(), vec![0, 1]);
    let grid_dir = downloaded.local.revisions[&1].grid_dir();
    assert_eq!(std::fs::read_dir(grid_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_gridadmin_server_error_fails_run() {
    let h = harness(&[], |client| {
        client.models = models(&[5]);
        client.gridadmin_error_status = 500;
    })
    .await;
    let progress = RecordingProgress::default();

    let outcome =
        download_required_files(&h.ctx, &schematisation(), &remote_revision(1, &[]), None, &progress).await;

    let ReconcileOutcome::Failed(message) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert_eq!(message, "Error: Gridadmin unavailable");
    assert_eq!(h.communication.of_kind("show_error"), vec![message]);
    assert!(h.communication.of_kind("bar_info").is_empty());
}

#[tokio::test]
async fn test_revision_without_database_fails() {
    let h = harness(&[], |_| {}).await;
    let revision = RemoteRevision { sqlite: None, ..remote_revision(1, &[]) };
    let progress = RecordingProgress::default();

    let outcome = download_required_files(&h.ctx, &schematisation(), &revision, None, &progress).await;

    assert!(matches!(outcome, ReconcileOutcome::Failed(_)));
    assert_eq!(h.communication.of_kind("show_error").len(), 1);
}

#[tokio::test]
async fn test_existing_schematisation_without_revisions_stores_revision_one() {
    let h = harness(&[STORE], |client| client.revisions = Vec::new()).await;
    existing_local(&h, None, &[]);
    let progress = RecordingProgress::default();

    let outcome =
        download_required_files(&h.ctx, &schematisation(), &remote_revision(1, &[]), None, &progress).await;

    assert_eq!(h.prompt.questions(), vec!["Replace local WIP or store as a revision 1?"]);
    let downloaded = outcome.downloaded().unwrap();
    assert!(!downloaded.wip_replace_requested);
    assert!(downloaded.local.wip_revision.is_none());
    assert_eq!(downloaded.local.revisions.keys().copied().collect::<Vec<_>>(), vec![1]);
    assert_eq!(downloaded.destination, downloaded.local.revisions[&1].schematisation_dir());
    assert!(downloaded.destination.join("model.sqlite").is_file());

    let on_disk = stored(&h);
    assert!(on_disk.wip_revision.is_none());
    assert!(on_disk.revisions.contains_key(&1));
}

#[tokio::test]
async fn test_name_with_separator_is_found_again() {
    let h = harness(&[CANCEL], |_| {}).await;
    let schematisation = Schematisation { id: 1, name: "Polder/North".to_string() };
    let progress = RecordingProgress::default();

    let first =
        download_required_files(&h.ctx, &schematisation, &remote_revision(1, &[]), Some(true), &progress).await;
    let main_dir = h.working_dir.join("Polder_North");
    let downloaded = first.downloaded().unwrap();
    assert!(downloaded.destination.starts_with(&main_dir));
    assert!(!h.working_dir.join("Polder").exists());

    // The existing WIP is recognised, so the user is asked before touching it
    let second =
        download_required_files(&h.ctx, &schematisation, &remote_revision(2, &[]), Some(true), &progress).await;
    assert!(matches!(second, ReconcileOutcome::Cancelled));
    assert_eq!(h.prompt.questions(), vec!["Replace local WIP or store as a revision 2?"]);

    let on_disk = LocalSchematisation::load(&main_dir).unwrap();
    assert_eq!(on_disk.name, "Polder/North");
    assert_eq!(on_disk.wip_revision.map(|w| w.number), Some(1));
}

#[tokio::test]
async fn test_raster_name_escaping_directory_is_rejected() {
    let h = harness(&[], |_| {}).await;
    let progress = RecordingProgress::default();

    let outcome = download_required_files(
        &h.ctx,
        &schematisation(),
        &remote_revision(1, &[(7, "../../dem.tif")]),
        None,
        &progress,
    )
    .await;

    assert!(matches!(outcome, ReconcileOutcome::Failed(_)));
    assert_eq!(h.communication.of_kind("show_error").len(), 1);
    assert!(!h.working_dir.join("dem.tif").exists());
    assert!(!h.working_dir.parent().unwrap().join("dem.tif").exists());
    assert!(!h.working_dir.join("Polder").exists());
}

#[tokio::test]
async fn test_absolute_database_name_is_rejected() {
    let h = harness(&[], |_| {}).await;
    let mut revision = remote_revision(1, &[]);
    if let Some(database) = revision.sqlite.as_mut() {
        database.file.filename = "/tmp/db.zip".to_string();
    }
    let progress = RecordingProgress::default();

    let outcome = download_required_files(&h.ctx, &schematisation(), &revision, None, &progress).await;

    assert!(matches!(outcome, ReconcileOutcome::Failed(_)));
    assert!(!h.working_dir.join("Polder").exists());
}
