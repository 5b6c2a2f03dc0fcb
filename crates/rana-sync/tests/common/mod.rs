//! Shared fixtures: an in-process file server and recording fakes
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Router;
use rana_core::error::{RanaError, Result};
use rana_core::models::{
    Download, FileMeta, Job, ModelArtifact, Project, ProjectFile, Publication, RemoteRevision,
    RevisionDatabase, RasterReference, Schematisation, ThreediModel, UploadSession,
};
use rana_core::ports::{
    Communication, ProgressSink, ProjectClient, RevisionClient, SchemaEditor, UserPrompt,
};
use serde_json::Map;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path as FsPath, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct ServerState {
    files: Arc<HashMap<String, Vec<u8>>>,
    uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

/// Serves `/files/{name}` with a content length, `/stream/{name}` without
/// one, and records `PUT /upload/{name}` bodies.
pub struct FileServer {
    pub base: String,
    uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl FileServer {
    pub fn url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base, name)
    }

    pub fn stream_url(&self, name: &str) -> String {
        format!("{}/stream/{}", self.base, name)
    }

    pub fn upload_url(&self, name: &str) -> String {
        format!("{}/upload/{}", self.base, name)
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }
}

async fn serve_file(State(state): State<ServerState>, Path(name): Path<String>) -> Response {
    match state.files.get(&name) {
        Some(data) => data.clone().into_response(),
        None => (StatusCode::NOT_FOUND, "no such file").into_response(),
    }
}

async fn stream_file(State(state): State<ServerState>, Path(name): Path<String>) -> Response {
    match state.files.get(&name) {
        Some(data) => {
            let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = data
                .chunks(7)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            Body::from_stream(futures::stream::iter(chunks)).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such file").into_response(),
    }
}

async fn receive_upload(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    body: Bytes,
) -> StatusCode {
    state.uploads.lock().unwrap().push((name, body.to_vec()));
    StatusCode::OK
}

pub async fn spawn_file_server(files: Vec<(&str, Vec<u8>)>) -> FileServer {
    let state = ServerState {
        files: Arc::new(files.into_iter().map(|(n, d)| (n.to_string(), d)).collect()),
        uploads: Arc::default(),
    };
    let uploads = state.uploads.clone();

    let app = Router::new()
        .route("/files/{name}", get(serve_file))
        .route("/stream/{name}", get(stream_file))
        .route("/upload/{name}", put(receive_upload))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FileServer { base, uploads }
}

/// Zip archive with the given entries, in order
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn not_found() -> RanaError {
    RanaError::Api { status: 404, body: r#"{"detail": "Not found."}"#.to_string() }
}

pub fn schematisation() -> Schematisation {
    Schematisation { id: 1, name: "Polder".to_string() }
}

pub fn remote_revision(number: i64, rasters: &[(i64, &str)]) -> RemoteRevision {
    RemoteRevision {
        id: 100 + number,
        number,
        schematisation_id: Some(1),
        sqlite: Some(RevisionDatabase { file: FileMeta { filename: "db.zip".to_string() } }),
        rasters: rasters
            .iter()
            .map(|(id, name)| RasterReference {
                id: *id,
                name: name.to_string(),
                raster_type: Some("dem_file".to_string()),
            })
            .collect(),
        commit_message: None,
    }
}

/// Remote revision service backed by the file server
pub struct FakeRevisionClient {
    pub base: String,
    pub revisions: Vec<RemoteRevision>,
    pub models: Vec<ThreediModel>,
    /// Models with a gridadmin, and whether they also have a geopackage
    pub gridadmins: HashMap<i64, bool>,
    /// Status returned for gridadmin lookups of models not in `gridadmins`
    pub gridadmin_error_status: u16,
    pub calls: Mutex<Vec<String>>,
}

impl FakeRevisionClient {
    pub fn new(server: &FileServer) -> Self {
        Self {
            base: server.base.clone(),
            revisions: Vec::new(),
            models: Vec::new(),
            gridadmins: HashMap::new(),
            gridadmin_error_status: 404,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn artifact(&self, filename: &str) -> ModelArtifact {
        ModelArtifact {
            file: FileMeta { filename: filename.to_string() },
            download: Download { get_url: format!("{}/files/{}", self.base, filename) },
        }
    }
}

#[async_trait]
impl RevisionClient for FakeRevisionClient {
    async fn fetch_schematisation(&self, schematisation_id: i64) -> Result<Schematisation> {
        self.record(format!("schematisation {}", schematisation_id));
        Ok(schematisation())
    }

    async fn list_revisions(&self, schematisation_id: i64) -> Result<Vec<RemoteRevision>> {
        self.record(format!("revisions {}", schematisation_id));
        Ok(self.revisions.clone())
    }

    async fn download_database_archive(&self, _s: i64, revision_id: i64) -> Result<Download> {
        self.record(format!("database {}", revision_id));
        Ok(Download { get_url: format!("{}/files/db.zip", self.base) })
    }

    async fn download_raster(&self, raster_id: i64, _s: i64, _r: i64) -> Result<Download> {
        self.record(format!("raster {}", raster_id));
        Ok(Download { get_url: format!("{}/files/raster-{}", self.base, raster_id) })
    }

    async fn find_models_for_revision(&self, _s: i64, _r: i64) -> Result<Vec<ThreediModel>> {
        self.record("models".to_string());
        Ok(self.models.clone())
    }

    async fn download_gridadmin(&self, model_id: i64) -> Result<ModelArtifact> {
        self.record(format!("gridadmin {}", model_id));
        if self.gridadmins.contains_key(&model_id) {
            Ok(self.artifact("gridadmin.h5"))
        } else {
            Err(RanaError::Api {
                status: self.gridadmin_error_status,
                body: r#"{"detail": "Gridadmin unavailable"}"#.to_string(),
            })
        }
    }

    async fn download_gridadmin_geopackage(&self, model_id: i64) -> Result<ModelArtifact> {
        self.record(format!("geopackage {}", model_id));
        match self.gridadmins.get(&model_id) {
            Some(true) => Ok(self.artifact("gridadmin.gpkg")),
            _ => Err(not_found()),
        }
    }
}

pub fn project() -> Project {
    Project { id: "p1".to_string(), name: "Delta".to_string(), slug: "delta".to_string() }
}

pub fn project_file(path: &str, url: Option<String>, last_modified: &str) -> ProjectFile {
    ProjectFile {
        id: path.to_string(),
        url,
        descriptor_id: None,
        data_type: Some("raster".to_string()),
        size: None,
        last_modified: last_modified.to_string(),
    }
}

/// Project API fake; `stat_file` answers come from a queue whose last entry repeats
pub struct FakeProjectClient {
    pub stats: Mutex<Vec<Option<ProjectFile>>>,
    pub upload_url: String,
    pub finished: Mutex<Vec<UploadSession>>,
    pub jobs: Mutex<Result<Vec<Job>>>,
    pub publications: Mutex<Vec<Publication>>,
}

impl FakeProjectClient {
    pub fn new(upload_url: String) -> Self {
        Self {
            stats: Mutex::new(Vec::new()),
            upload_url,
            finished: Mutex::new(Vec::new()),
            jobs: Mutex::new(Ok(Vec::new())),
            publications: Mutex::new(Vec::new()),
        }
    }

    pub fn with_stats(self, stats: Vec<Option<ProjectFile>>) -> Self {
        *self.stats.lock().unwrap() = stats;
        self
    }
}

#[async_trait]
impl ProjectClient for FakeProjectClient {
    async fn get_project(&self, _project_id: &str) -> Result<Project> {
        Ok(project())
    }

    async fn list_files(&self, _project_id: &str, _path: Option<&str>) -> Result<Vec<ProjectFile>> {
        Ok(Vec::new())
    }

    async fn stat_file(&self, _project_id: &str, _path: &str) -> Result<Option<ProjectFile>> {
        let mut stats = self.stats.lock().unwrap();
        if stats.len() > 1 {
            Ok(stats.remove(0))
        } else {
            Ok(stats.first().cloned().flatten())
        }
    }

    async fn start_upload(&self, _project_id: &str, path: &str) -> Result<UploadSession> {
        let mut extra = Map::new();
        extra.insert("path".to_string(), path.into());
        Ok(UploadSession { urls: vec![self.upload_url.clone()], extra })
    }

    async fn finish_upload(&self, _project_id: &str, session: &UploadSession) -> Result<()> {
        self.finished.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn list_jobs(&self, _project_id: &str) -> Result<Vec<Job>> {
        match &*self.jobs.lock().unwrap() {
            Ok(jobs) => Ok(jobs.clone()),
            Err(_) => Err(RanaError::Api { status: 503, body: r#"{"detail": "Try again later"}"#.to_string() }),
        }
    }

    async fn list_publications(&self, _project_id: &str) -> Result<Vec<Publication>> {
        Ok(self.publications.lock().unwrap().clone())
    }
}

/// Answers `custom_ask` from a script; an exhausted script dismisses the dialog
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<Vec<&'static str>>,
    pub questions: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answering(answers: &[&'static str]) -> Self {
        Self { answers: Mutex::new(answers.to_vec()), questions: Mutex::new(Vec::new()) }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl UserPrompt for ScriptedPrompt {
    fn ask(&self, _title: &str, question: &str) -> bool {
        self.questions.lock().unwrap().push(question.to_string());
        false
    }

    fn custom_ask(&self, _title: &str, question: &str, options: &[&str]) -> Option<String> {
        self.questions.lock().unwrap().push(question.to_string());
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            return None;
        }
        let answer = answers.remove(0);
        assert!(options.contains(&answer), "{} not offered for {}", answer, question);
        Some(answer.to_string())
    }
}

#[derive(Default)]
pub struct RecordingCommunication {
    pub messages: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingCommunication {
    pub fn of_kind(&self, kind: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, kind: &'static str, message: &str) {
        self.messages.lock().unwrap().push((kind, message.to_string()));
    }
}

impl Communication for RecordingCommunication {
    fn bar_info(&self, message: &str) {
        self.push("bar_info", message);
    }
    fn show_info(&self, message: &str) {
        self.push("show_info", message);
    }
    fn show_warn(&self, message: &str) {
        self.push("show_warn", message);
    }
    fn show_error(&self, message: &str) {
        self.push("show_error", message);
    }
    fn log_info(&self, message: &str) {
        self.push("log_info", message);
    }
    fn log_warn(&self, message: &str) {
        self.push("log_warn", message);
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub maximum: Mutex<Option<u64>>,
    pub values: Mutex<Vec<u64>>,
}

impl RecordingProgress {
    pub fn values(&self) -> Vec<u64> {
        self.values.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn set_maximum(&self, maximum: u64) {
        *self.maximum.lock().unwrap() = Some(maximum);
    }

    fn set_value(&self, value: u64) {
        self.values.lock().unwrap().push(value);
    }
}

#[derive(Default)]
pub struct RecordingEditor {
    pub loaded: Mutex<Vec<PathBuf>>,
}

impl SchemaEditor for RecordingEditor {
    fn load_schematisation(&self, geopackage_path: &FsPath) {
        self.loaded.lock().unwrap().push(geopackage_path.to_path_buf());
    }
}
