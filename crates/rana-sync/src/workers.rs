//! Background transfers of project files
//!
//! Each worker runs as its own tokio task and reports through an unbounded
//! channel of [`TransferEvent`]s. A worker always ends with exactly one
//! `Finished` or `Failed` event unless the receiver is gone.

use rana_core::error::{RanaError, Result};
use rana_core::models::{Project, ProjectFile};
use rana_core::ports::settings::last_modified_key;
use rana_core::ports::{ProjectClient, SettingsStore};
use rana_store::paths::local_file_path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::download::{file_chunks, stream_to_file, Percent};

pub const SERVER_FILE_MISSING: &str =
    "Failed to get file from server. Check if file has been moved or deleted.";
pub const UPLOAD_ABORTED: &str = "File upload aborted.";

/// Progress and outcome of a background transfer
#[derive(Debug)]
pub enum TransferEvent {
    /// Percentage done; `None` while the size is unknown
    Progress(Percent),
    /// Local path of the transferred file
    Finished(PathBuf),
    Failed(String),
    /// The file changed on the server since it was downloaded
    Conflict(ConflictResolver),
}

/// Reply channel for an upload conflict
///
/// Dropping it without answering aborts the upload.
#[derive(Debug)]
pub struct ConflictResolver {
    reply: oneshot::Sender<bool>,
}

impl ConflictResolver {
    /// Continue and overwrite the server copy
    pub fn overwrite(self) {
        let _ = self.reply.send(true);
    }

    pub fn abort(self) {
        let _ = self.reply.send(false);
    }
}

type Events = mpsc::UnboundedSender<TransferEvent>;

fn emit(events: &Events, event: TransferEvent) {
    // A closed channel means nobody is listening any more
    let _ = events.send(event);
}

/// Downloads a project file to `<working_dir>/<project slug>/<path>`
pub struct FileDownloadWorker {
    http: reqwest::Client,
    settings: Arc<dyn SettingsStore>,
    working_dir: PathBuf,
    project: Project,
    file: ProjectFile,
}

impl FileDownloadWorker {
    pub fn new(
        http: reqwest::Client,
        settings: Arc<dyn SettingsStore>,
        working_dir: impl Into<PathBuf>,
        project: Project,
        file: ProjectFile,
    ) -> Self {
        Self { http, settings, working_dir: working_dir.into(), project, file }
    }

    /// Run on a background task
    pub fn spawn(self) -> (JoinHandle<()>, mpsc::UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tokio::spawn(self.run(tx)), rx)
    }

    pub async fn run(self, events: Events) {
        match self.download(&events).await {
            Ok(path) => {
                info!(project = %self.project.name, file = %self.file.id, "File downloaded");
                emit(&events, TransferEvent::Finished(path));
            }
            Err(e) => {
                warn!(file = %self.file.id, "Download failed: {}", e);
                let message = match &e {
                    RanaError::Api { .. } | RanaError::Transport(_) => {
                        format!("Failed to download file: {}", e)
                    }
                    _ => format!("An error occurred: {}", e),
                };
                emit(&events, TransferEvent::Failed(message));
            }
        }
    }

    async fn download(&self, events: &Events) -> Result<PathBuf> {
        let url = self
            .file
            .url
            .as_deref()
            .ok_or(RanaError::MissingField { field: "url".to_string() })?;
        let (dir, path) = local_file_path(&self.working_dir, &self.project.slug, &self.file.id);
        tokio::fs::create_dir_all(&dir).await?;

        stream_to_file(&self.http, url, &path, |percent| {
            emit(events, TransferEvent::Progress(percent));
        })
        .await?;

        let key = last_modified_key(&self.project.name, &self.file.id);
        if let Err(e) = self.settings.set(&key, &self.file.last_modified) {
            warn!("Could not record modification time: {}", e);
        }
        Ok(path)
    }
}

/// Uploads a local project file, checking for server-side changes first
pub struct FileUploadWorker {
    projects: Arc<dyn ProjectClient>,
    http: reqwest::Client,
    settings: Arc<dyn SettingsStore>,
    working_dir: PathBuf,
    project: Project,
    file: ProjectFile,
}

/// Why an upload stopped early
enum Stop {
    Failed(String),
    /// The event receiver is gone
    Detached,
}

impl FileUploadWorker {
    pub fn new(
        projects: Arc<dyn ProjectClient>,
        http: reqwest::Client,
        settings: Arc<dyn SettingsStore>,
        working_dir: impl Into<PathBuf>,
        project: Project,
        file: ProjectFile,
    ) -> Self {
        Self { projects, http, settings, working_dir: working_dir.into(), project, file }
    }

    pub fn spawn(self) -> (JoinHandle<()>, mpsc::UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tokio::spawn(self.run(tx)), rx)
    }

    pub async fn run(self, events: Events) {
        match self.upload(&events).await {
            Ok(path) => {
                info!(project = %self.project.name, file = %self.file.id, "File uploaded");
                emit(&events, TransferEvent::Finished(path));
            }
            Err(Stop::Failed(message)) => {
                warn!(file = %self.file.id, "Upload failed: {}", message);
                emit(&events, TransferEvent::Failed(message));
            }
            Err(Stop::Detached) => {
                warn!(file = %self.file.id, "Upload abandoned, no listener for conflict");
            }
        }
    }

    async fn upload(&self, events: &Events) -> std::result::Result<PathBuf, Stop> {
        let (_, path) = local_file_path(&self.working_dir, &self.project.slug, &self.file.id);
        if !path.is_file() {
            return Err(Stop::Failed(format!("File not found: {}", path.display())));
        }

        let key = last_modified_key(&self.project.name, &self.file.id);
        let local_last_modified = self.settings.get(&key);

        let server_file = match self.projects.stat_file(&self.project.id, &self.file.id).await {
            Ok(Some(file)) => file,
            Ok(None) => return Err(Stop::Failed(SERVER_FILE_MISSING.to_string())),
            Err(e) => return Err(Stop::Failed(format!("{} {}", SERVER_FILE_MISSING, e.user_message()))),
        };

        if local_last_modified.as_deref() != Some(server_file.last_modified.as_str()) {
            let (reply, answer) = oneshot::channel();
            events
                .send(TransferEvent::Conflict(ConflictResolver { reply }))
                .map_err(|_| Stop::Detached)?;
            if !matches!(answer.await, Ok(true)) {
                return Err(Stop::Failed(UPLOAD_ABORTED.to_string()));
            }
        }

        emit(events, TransferEvent::Progress(Some(0)));
        self.transfer(&path, events)
            .await
            .map_err(|e| Stop::Failed(format!("Failed to upload file: {}", e.user_message())))?;

        // Remember the server's new timestamp so the next upload doesn't conflict
        let new_last_modified = match self.projects.stat_file(&self.project.id, &self.file.id).await {
            Ok(Some(file)) => file.last_modified,
            _ => server_file.last_modified,
        };
        if let Err(e) = self.settings.set(&key, &new_last_modified) {
            warn!("Could not record modification time: {}", e);
        }

        emit(events, TransferEvent::Progress(Some(100)));
        Ok(path)
    }

    async fn transfer(&self, path: &std::path::Path, events: &Events) -> Result<()> {
        let session = self.projects.start_upload(&self.project.id, &self.file.id).await?;
        let url = session
            .urls
            .first()
            .ok_or(RanaError::MissingField { field: "urls".to_string() })?;
        emit(events, TransferEvent::Progress(Some(20)));

        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let response = self
            .http
            .put(url)
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(file_chunks(file)))
            .send()
            .await
            .map_err(|e| RanaError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RanaError::Api { status: status.as_u16(), body });
        }
        emit(events, TransferEvent::Progress(Some(80)));

        self.projects.finish_upload(&self.project.id, &session).await
    }
}
