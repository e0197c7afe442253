//! Model list fetching.
//!
//! One fetcher per catalog endpoint, behind the [`FetchModels`] trait. HTTP
//! endpoints use the reqwest implementation against an OpenAI-compatible
//! `/models` route; endpoints with fixed offerings use the static fetcher.

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{config::ProviderEndpointConfig, types::UserId};

/// Per-request parameters of a catalog fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelQuery {
    /// The caller the list is scoped to
    pub user: UserId,
    /// Route the fetch through the Azure deployment
    pub azure: bool,
    /// Ask for the plugins-capable model set
    pub plugins: bool,
}

/// A trait for fetching the model names one catalog endpoint offers.
#[async_trait]
pub trait FetchModels: Send + Sync {
    async fn fetch(&self, query: &ModelQuery) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct OpenAiModelsResponse {
    data: Vec<OpenAiModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAiModel {
    id: String,
}

/// The concrete HTTP implementation of `FetchModels`.
pub struct FetchModelsReqwest {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl FetchModelsReqwest {
    pub fn new(config: &ProviderEndpointConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

/// Makes sure a url has a trailing slash.
///
/// This fixes a weird idiosyncracy in rusts 'join' method on urls, where joining URLs like
/// '/hello', 'world' gives you '/world', but '/hello/', 'world' gives you '/hello/world'.
/// Basically, call this before calling .join
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

#[async_trait]
impl FetchModels for FetchModelsReqwest {
    async fn fetch(&self, query: &ModelQuery) -> anyhow::Result<Vec<String>> {
        let mut url = ensure_slash(&self.base_url)
            .join("models")
            .map_err(|e| anyhow!("Failed to construct models URL: {}", e))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("user", &query.user.to_string());
            if query.azure {
                pairs.append_pair("azure", "true");
            }
            if query.plugins {
                pairs.append_pair("plugins", "true");
            }
        }

        debug!("Fetching models from URL: {}", url);

        let mut request = self.client.get(url.clone());
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("models API error from {}: {} - {}", url, status, body));
        }

        let parsed: OpenAiModelsResponse = response.json().await.map_err(|e| anyhow!("error decoding models response: {}", e))?;

        Ok(parsed.data.into_iter().map(|m| m.id).collect())
    }
}

/// A static implementation of FetchModels that returns a predefined list of models.
/// Used for endpoints whose offerings come from configuration rather than an API.
pub struct StaticModelsFetcher {
    models: Vec<String>,
}

impl StaticModelsFetcher {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }
}

#[async_trait]
impl FetchModels for StaticModelsFetcher {
    async fn fetch(&self, _query: &ModelQuery) -> anyhow::Result<Vec<String>> {
        debug!("Returning static model list with {} models", self.models.len());
        Ok(self.models.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(azure: bool, plugins: bool) -> ModelQuery {
        ModelQuery {
            user: Uuid::new_v4(),
            azure,
            plugins,
        }
    }

    fn fetcher_for(server: &MockServer) -> FetchModelsReqwest {
        FetchModelsReqwest::new(&ProviderEndpointConfig {
            base_url: Url::parse(&server.uri()).unwrap(),
            api_key: Some("sk-test".to_string()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_model_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    {"id": "gpt-4", "object": "model"},
                    {"id": "gpt-3.5-turbo", "object": "model"}
                ]
            })))
            .mount(&server)
            .await;

        let models = fetcher_for(&server).fetch(&query(false, false)).await.unwrap();
        assert_eq!(models, vec!["gpt-4".to_string(), "gpt-3.5-turbo".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_sends_query_flags() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .and(query_param("azure", "true"))
            .and(query_param("plugins", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let models = fetcher_for(&server).fetch(&query(true, true)).await.unwrap();
        assert!(models.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(fetcher_for(&server).fetch(&query(false, false)).await.is_err());
    }

    #[tokio::test]
    async fn test_static_fetcher_ignores_query() {
        let fetcher = StaticModelsFetcher::new(vec!["claude-2".to_string()]);

        let a = fetcher.fetch(&query(false, false)).await.unwrap();
        let b = fetcher.fetch(&query(true, true)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec!["claude-2".to_string()]);
    }
}
