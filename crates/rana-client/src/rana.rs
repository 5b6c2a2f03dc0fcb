use async_trait::async_trait;
use rana_core::error::Result;
use rana_core::models::{Job, Project, ProjectFile, Publication, UploadSession};
use rana_core::ports::{CredentialProvider, ProjectClient};
use serde::Deserialize;
use std::sync::Arc;

use crate::http::ApiHttp;

/// Client for the Rana project API of a single tenant
pub struct RanaClient {
    http: ApiHttp,
    tenant: String,
}

impl RanaClient {
    /// Create a client for `api_url` (e.g. "https://www.ranawaterintelligence.com/v1-alpha")
    pub fn new(
        api_url: impl Into<String>,
        tenant: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self { http: ApiHttp::new(api_url, credentials), tenant: tenant.into() }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    fn project_path(&self, project_id: &str, rest: &str) -> String {
        format!("tenants/{}/projects/{}{}", self.tenant, project_id, rest)
    }
}

/// Listing envelope used by the project API
#[derive(Debug, Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

#[async_trait]
impl ProjectClient for RanaClient {
    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.http.get_json(&self.http.url(&self.project_path(project_id, ""))).await
    }

    async fn list_files(&self, project_id: &str, path: Option<&str>) -> Result<Vec<ProjectFile>> {
        let params: Vec<(&str, &str)> = path.map(|p| vec![("path", p)]).unwrap_or_default();
        let url = self.http.url_with_params(&self.project_path(project_id, "/files/ls"), &params)?;
        let listing: Items<ProjectFile> = self.http.get_url(url).await?;
        Ok(listing.items)
    }

    async fn stat_file(&self, project_id: &str, path: &str) -> Result<Option<ProjectFile>> {
        let url = self
            .http
            .url_with_params(&self.project_path(project_id, "/files/stat"), &[("path", path)])?;
        match self.http.get_url(url).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn start_upload(&self, project_id: &str, path: &str) -> Result<UploadSession> {
        let url = self
            .http
            .url_with_params(&self.project_path(project_id, "/files/upload"), &[("path", path)])?;
        self.http.post_json(url).await
    }

    async fn finish_upload(&self, project_id: &str, session: &UploadSession) -> Result<()> {
        self.http
            .put_json(&self.http.url(&self.project_path(project_id, "/files/upload")), session)
            .await
    }

    async fn list_jobs(&self, project_id: &str) -> Result<Vec<Job>> {
        let listing: Items<Job> =
            self.http.get_json(&self.http.url(&self.project_path(project_id, "/jobs"))).await?;
        Ok(listing.items)
    }

    async fn list_publications(&self, project_id: &str) -> Result<Vec<Publication>> {
        let listing: Items<Publication> = self
            .http
            .get_json(&self.http.url(&self.project_path(project_id, "/publications")))
            .await?;
        Ok(listing.items)
    }
}
