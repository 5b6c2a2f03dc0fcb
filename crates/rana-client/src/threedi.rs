use async_trait::async_trait;
use rana_core::error::Result;
use rana_core::models::{
    Download, FileMeta, ModelArtifact, RemoteRevision, Schematisation, ThreediModel,
};
use rana_core::ports::{CredentialProvider, RevisionClient};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

use crate::http::ApiHttp;

/// Client for the hydraulic modelling (3Di v3) API
pub struct ThreediClient {
    http: ApiHttp,
}

impl ThreediClient {
    /// Create a client for the API rooted at `base_url` (e.g. "https://api.3di.live/v3")
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { http: ApiHttp::new(base_url, credentials) }
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Collect every page of a paginated listing
    async fn paginated<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.http.url(path));
        while let Some(url) = next {
            let page: Page<T> = self.http.get_json(&url).await?;
            items.extend(page.results);
            next = page.next;
        }
        Ok(items)
    }

    async fn model_artifact(&self, model_id: i64, artifact: &str) -> Result<ModelArtifact> {
        let file: FileMeta =
            self.http.get_json(&self.http.url(&format!("threedimodels/{}/{}/", model_id, artifact))).await?;
        let download: Download = self
            .http
            .get_json(&self.http.url(&format!("threedimodels/{}/{}/download/", model_id, artifact)))
            .await?;
        Ok(ModelArtifact { file, download })
    }
}

/// Paginated listing envelope
#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[async_trait]
impl RevisionClient for ThreediClient {
    async fn fetch_schematisation(&self, schematisation_id: i64) -> Result<Schematisation> {
        self.http
            .get_json(&self.http.url(&format!("schematisations/{}/", schematisation_id)))
            .await
    }

    async fn list_revisions(&self, schematisation_id: i64) -> Result<Vec<RemoteRevision>> {
        self.paginated(&format!("schematisations/{}/revisions/", schematisation_id)).await
    }

    async fn download_database_archive(
        &self,
        schematisation_id: i64,
        revision_id: i64,
    ) -> Result<Download> {
        self.http
            .get_json(&self.http.url(&format!(
                "schematisations/{}/revisions/{}/sqlite/download/",
                schematisation_id, revision_id
            )))
            .await
    }

    async fn download_raster(
        &self,
        raster_id: i64,
        schematisation_id: i64,
        revision_id: i64,
    ) -> Result<Download> {
        self.http
            .get_json(&self.http.url(&format!(
                "schematisations/{}/revisions/{}/rasters/{}/download/",
                schematisation_id, revision_id, raster_id
            )))
            .await
    }

    async fn find_models_for_revision(
        &self,
        schematisation_id: i64,
        revision_id: i64,
    ) -> Result<Vec<ThreediModel>> {
        self.paginated(&format!(
            "schematisations/{}/revisions/{}/threedimodels/",
            schematisation_id, revision_id
        ))
        .await
    }

    async fn download_gridadmin(&self, model_id: i64) -> Result<ModelArtifact> {
        self.model_artifact(model_id, "gridadmin").await
    }

    async fn download_gridadmin_geopackage(&self, model_id: i64) -> Result<ModelArtifact> {
        self.model_artifact(model_id, "geopackage").await
    }
}
