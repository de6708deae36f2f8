//! Item image source. Best-effort; failures yield an empty index.

use std::time::Duration;

use common::config::SourcesConfig;
use common::{Error, ImageIndex};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ImageClient {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageResponse {
    #[serde(rename = "imageData", default)]
    pub image_data: Option<ImageIndex>,
}

impl ImageClient {
    pub fn new(sources: &SourcesConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(sources.user_agent.clone())
            .timeout(Duration::from_secs(sources.aux_timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build image HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: sources.image_api_url.clone(),
        })
    }

    /// Fetch the image index, or an empty one on any failure.
    pub async fn fetch(&self) -> ImageIndex {
        match self.try_fetch().await {
            Ok(images) => {
                info!("Images fetched: {}", images.len());
                images
            }
            Err(e) => {
                warn!("Image fetch failed: {}", e);
                ImageIndex::new()
            }
        }
    }

    async fn try_fetch(&self) -> Result<ImageIndex, Error> {
        debug!("Fetching images: {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Http(format!(
                "image API returned {}",
                resp.status().as_u16()
            )));
        }

        let body: ImageResponse = resp
            .json()
            .await
            .map_err(|e| Error::Data(format!("image API JSON parse error: {e}")))?;

        Ok(body.image_data.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use serde_json::json;

    #[test]
    fn test_image_data_keeps_upstream_order() {
        let resp: ImageResponse = serde_json::from_str(
            r#"{"imageData": {"Zucchini": {"url": "z.png"}, "Apple": {"url": "a.png"}}}"#,
        )
        .expect("deserialize");

        let images = resp.image_data.expect("image data");
        let names: Vec<&str> = images.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Zucchini", "Apple"]);
        assert_eq!(images["Apple"]["url"], "a.png");
    }

    #[test]
    fn test_missing_image_data_is_none() {
        let resp: ImageResponse = serde_json::from_str(r#"{"stock": []}"#).expect("deserialize");
        assert!(resp.image_data.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_api_degrades_to_empty() {
        let sources = SourcesConfig {
            image_api_url: "http://127.0.0.1:9/images".into(),
            aux_timeout_secs: 1,
            ..SourcesConfig::default()
        };
        let client = ImageClient::new(&sources).expect("client");
        assert!(client.fetch().await.is_empty());
    }

    #[tokio::test]
    async fn test_slow_api_times_out_to_empty() {
        let base = test_support::serve(test_support::stalled(
            "/images",
            Duration::from_secs(5),
            json!({"imageData": {"Carrot": {"url": "c.png"}}}),
        ))
        .await;
        let sources = SourcesConfig {
            image_api_url: format!("{base}/images"),
            aux_timeout_secs: 1,
            ..SourcesConfig::default()
        };
        let client = ImageClient::new(&sources).expect("client");

        let started = std::time::Instant::now();
        assert!(client.fetch().await.is_empty());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_fetch_reads_served_index() {
        let base = test_support::serve(test_support::stalled(
            "/images",
            Duration::ZERO,
            json!({"imageData": {"Carrot": {"url": "c.png"}}}),
        ))
        .await;
        let sources = SourcesConfig {
            image_api_url: format!("{base}/images"),
            ..SourcesConfig::default()
        };
        let client = ImageClient::new(&sources).expect("client");

        let images = client.fetch().await;
        assert_eq!(images["Carrot"]["url"], "c.png");
    }
}
