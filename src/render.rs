use std::path::Path;

use async_trait::async_trait;
use url::Url;

use crate::encoding::encode_diagram;
use crate::error::{PreviewError, PreviewResult};

/// Turns a diagram source into markup that can be pushed to viewers.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, source: &str) -> PreviewResult<String>;
}

/// Client for a remote PlantUML server.
#[derive(Debug, Clone)]
pub struct PlantUmlClient {
    http: reqwest::Client,
    base: Url,
}

impl PlantUmlClient {
    pub fn new(base: Url) -> PreviewResult<Self> {
        if base.cannot_be_a_base() {
            return Err(PreviewError::invalid_server_url(base.as_str()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// `<base>/svg/<encoded source>`
    pub fn svg_url(&self, source: &str) -> PreviewResult<Url> {
        let encoded = encode_diagram(source)?;
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PreviewError::invalid_server_url(self.base.as_str()))?
            .pop_if_empty()
            .push("svg")
            .push(&encoded);
        Ok(url)
    }
}

#[async_trait]
impl Renderer for PlantUmlClient {
    async fn render(&self, source: &str) -> PreviewResult<String> {
        let url = self.svg_url(source)?;
        tracing::debug!(%url, "requesting render");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::RenderStatus {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Read the whole diagram source. Nothing is cached between calls.
pub async fn read_source(path: &Path) -> PreviewResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PreviewError::read(path, e))
}
