//! Rana Sync - Schematisation reconciliation, transfers and monitoring
//!
//! This crate drives everything that moves data between the remote services
//! and the local working directory:
//!
//! - [`reconcile`]: decides where a remote revision lands locally and downloads it
//! - [`loader`]: hands downloaded or local schematisations to the schema editor
//! - [`workers`]: background project file downloads and conflict-checked uploads
//! - [`scheduler`] and [`monitor`]: interval polling of jobs and publications

pub mod archive;
pub mod context;
pub mod download;
pub mod loader;
pub mod locks;
pub mod monitor;
pub mod reconcile;
pub mod scheduler;
pub mod workers;

pub use context::SyncContext;
pub use loader::{load_local_schematisation, load_remote_schematisation, BuildAction};
pub use reconcile::{download_required_files, is_latest_revision, DownloadedSchematisation, ReconcileOutcome};
pub use scheduler::{PersistentTask, PersistentTaskScheduler};
pub use workers::{ConflictResolver, FileDownloadWorker, FileUploadWorker, TransferEvent};
