use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use super::{StoreClient, StoreResponse};
use crate::config::ClientConfig;
use crate::error::{PantryError, Result};

/// [`StoreClient`] over the store's HTTP/JSON API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStore {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("FoodRescue/0.1")
            .build()
            .map_err(|e| PantryError::Transport(format!("failed to build http client: {}", e)))?;

        if config.base_url.cannot_be_a_base() {
            return Err(PantryError::validation(format!(
                "store base url cannot carry a path: {}",
                config.base_url
            )));
        }

        Ok(HttpStore {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<StoreResponse> {
        let resp = request.send().await.map_err(|e| {
            tracing::error!("Store request to {} failed: {}", path, e);
            PantryError::Transport(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| {
            tracing::error!("Reading store response from {} failed: {}", path, e);
            PantryError::Transport(e.to_string())
        })?;
        let body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice::<Value>(&bytes).ok()
        };

        tracing::debug!("{} -> {}", path, status);
        Ok(StoreResponse { status, body })
    }
}

#[async_trait]
impl StoreClient for HttpStore {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<StoreResponse> {
        let request = self.client.get(self.url(path)).query(query);
        self.send(request, path).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<StoreResponse> {
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request, path).await
    }

    async fn delete(&self, path: &str) -> Result<StoreResponse> {
        let request = self.client.delete(self.url(path));
        self.send(request, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_under_the_api_prefix() {
        let mut config = ClientConfig::default();
        config.base_url = Url::parse("http://127.0.0.1:5000/api/v1/").unwrap();
        let store = HttpStore::new(&config).unwrap();

        assert_eq!(
            store.url("/holds/12/pickup").as_str(),
            "http://127.0.0.1:5000/api/v1/holds/12/pickup"
        );
        assert_eq!(store.url("/donations").as_str(), "http://127.0.0.1:5000/api/v1/donations");
    }

    #[test]
    fn rejects_base_urls_without_a_path() {
        let mut config = ClientConfig::default();
        config.base_url = Url::parse("mailto:pantry@example.com").unwrap();
        assert!(matches!(HttpStore::new(&config), Err(PantryError::Validation(_))));
    }
}
