//! Generic HTTP catalog adapter: a single endpoint that returns a JSON
//! array of [`Bundle`]s, each carrying its own `manifest_url`/`download_url`.

use async_trait::async_trait;
use bundle_registry_schema::{Bundle, DeploymentManifest};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::{
    adapters::{html_snippet, SourceAdapter},
    errors::{RegistryError, RegistryResult},
};

/// HTTP-catalog [`SourceAdapter`].
pub struct HttpCatalogAdapter {
    source_id: String,
    catalog_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpCatalogAdapter {
    /// Build an adapter pointed at `catalog_url`, with an explicit token
    /// (trimmed; whitespace-only is treated as absent).
    pub fn new(
        source_id: impl Into<String>,
        catalog_url: impl Into<String>,
        token: Option<String>,
    ) -> RegistryResult<Self> {
        Ok(Self {
            source_id: source_id.into(),
            catalog_url: catalog_url.into(),
            token: token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            client: crate::net::build_client(&crate::net::ClientSettings::default())?,
        })
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url);
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }
}

#[async_trait]
impl SourceAdapter for HttpCatalogAdapter {
    async fn validate(&self) -> RegistryResult<()> {
        self.fetch_bundles().await?;
        Ok(())
    }

    async fn fetch_bundles(&self) -> RegistryResult<Vec<Bundle>> {
        let response = self
            .request(&self.catalog_url)
            .send()
            .await
            .map_err(|e| RegistryError::Network {
                message: e.to_string(),
            })?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await.map_err(|e| RegistryError::Network {
            message: e.to_string(),
        })?;
        if content_type.contains("text/html") {
            return Err(RegistryError::HtmlResponse {
                snippet: html_snippet(&body),
            });
        }
        let mut bundles: Vec<Bundle> =
            serde_json::from_str(&body).map_err(|e| RegistryError::ParseFailure {
                format: "json",
                message: e.to_string(),
            })?;
        for bundle in &mut bundles {
            bundle.source_id = self.source_id.clone();
        }
        Ok(bundles)
    }

    async fn fetch_metadata(&self, bundle: &Bundle) -> RegistryResult<DeploymentManifest> {
        let body = self
            .request(&bundle.manifest_url)
            .send()
            .await
            .map_err(|e| RegistryError::Network {
                message: e.to_string(),
            })?
            .text()
            .await
            .map_err(|e| RegistryError::Network {
                message: e.to_string(),
            })?;
        serde_yml::from_str(&body).map_err(|e| RegistryError::ParseFailure {
            format: "yaml",
            message: e.to_string(),
        })
    }

    async fn download_bundle(&self, bundle: &Bundle) -> RegistryResult<Vec<u8>> {
        let bytes = self
            .request(&bundle.download_url)
            .send()
            .await
            .map_err(|e| RegistryError::Network {
                message: e.to_string(),
            })?
            .bytes()
            .await
            .map_err(|e| RegistryError::Network {
                message: e.to_string(),
            })?;
        Ok(bytes.to_vec())
    }
}
