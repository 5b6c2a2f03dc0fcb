use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Download, Job, ModelArtifact, Project, ProjectFile, Publication, RemoteRevision,
    Schematisation, ThreediModel, UploadSession,
};

/// Port for the hydraulic modelling service (schematisations and revisions)
#[async_trait]
pub trait RevisionClient: Send + Sync {
    /// Fetch a schematisation by id
    async fn fetch_schematisation(&self, schematisation_id: i64) -> Result<Schematisation>;

    /// List every published revision of a schematisation
    async fn list_revisions(&self, schematisation_id: i64) -> Result<Vec<RemoteRevision>>;

    /// Request the zipped primary database of a revision
    async fn download_database_archive(
        &self,
        schematisation_id: i64,
        revision_id: i64,
    ) -> Result<Download>;

    /// Request a single raster of a revision
    async fn download_raster(
        &self,
        raster_id: i64,
        schematisation_id: i64,
        revision_id: i64,
    ) -> Result<Download>;

    /// Simulation models built from a revision, ordered by creation
    async fn find_models_for_revision(
        &self,
        schematisation_id: i64,
        revision_id: i64,
    ) -> Result<Vec<ThreediModel>>;

    /// Grid administration artifact of a model
    ///
    /// Returns an API error with status 404 when the model has none.
    async fn download_gridadmin(&self, model_id: i64) -> Result<ModelArtifact>;

    /// Geopackage export of the grid administration of a model
    async fn download_gridadmin_geopackage(&self, model_id: i64) -> Result<ModelArtifact>;
}

/// Port for the Rana project API (files, jobs, publications)
#[async_trait]
pub trait ProjectClient: Send + Sync {
    /// Fetch a project by id
    async fn get_project(&self, project_id: &str) -> Result<Project>;

    /// List files under a directory path (root when `None`)
    async fn list_files(&self, project_id: &str, path: Option<&str>) -> Result<Vec<ProjectFile>>;

    /// Current server record of a file, `None` if it no longer exists
    async fn stat_file(&self, project_id: &str, path: &str) -> Result<Option<ProjectFile>>;

    /// Initiate an upload, returning pre-signed upload URLs
    async fn start_upload(&self, project_id: &str, path: &str) -> Result<UploadSession>;

    /// Complete an upload started with [`ProjectClient::start_upload`]
    async fn finish_upload(&self, project_id: &str, session: &UploadSession) -> Result<()>;

    /// Jobs of a project
    async fn list_jobs(&self, project_id: &str) -> Result<Vec<Job>>;

    /// Publications of a project
    async fn list_publications(&self, project_id: &str) -> Result<Vec<Publication>>;
}

/// Supplies bearer tokens for authenticated requests
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Result<String>;
}
