//! Authenticated JSON requests shared by the API clients

use rana_core::error::{RanaError, Result};
use rana_core::ports::CredentialProvider;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub(crate) struct ApiHttp {
    base_url: String,
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiHttp {
    pub(crate) fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            credentials,
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Absolute URL with query parameters
    pub(crate) fn url_with_params(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        Url::parse_with_params(&self.url(path), params).map_err(|e| RanaError::ConfigInvalid {
            key: "base_url".to_string(),
            reason: format!("Cannot build request URL: {}", e),
        })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(self.client.get(url)).await?;
        decode(response).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .send(self.client.post(url).json(&serde_json::Map::new()))
            .await?;
        decode(response).await
    }

    pub(crate) async fn put_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<()> {
        self.send(self.client.put(url).json(body)).await?;
        Ok(())
    }

    pub(crate) async fn get_url<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(self.client.get(url)).await?;
        decode(response).await
    }

    /// Attach the bearer token, send, and turn non-2xx statuses into API errors
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.credentials.token()?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RanaError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "API request failed");
            return Err(RanaError::Api { status: status.as_u16(), body });
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| RanaError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| RanaError::Serialization(e.to_string()))
}
