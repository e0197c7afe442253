//! Model catalog aggregation.
//!
//! Builds the per-user endpoint-to-models map the frontend renders its
//! endpoint picker from. Every catalog key is always present in the result;
//! a failed fetch degrades that key to an empty list instead of failing the
//! request.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    models::fetchers::{FetchModels, ModelQuery},
    types::UserId,
};

/// Fixed offering of the `bingAI` endpoint
pub const BINGAI_MODELS: &[&str] = &["BingAI", "Sydney"];

/// Fixed offering of the `assistant` endpoint
pub const ASSISTANT_MODELS: &[&str] = &["gpt-4-1106-preview", "gpt-3.5-turbo-1106"];

/// The full catalog, one ordered model list per endpoint.
///
/// Modelled as a struct rather than a map so every endpoint key is present
/// in every response, even when its fetch failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ModelCatalog {
    #[serde(rename = "openAI")]
    pub openai: Vec<String>,
    #[serde(rename = "azureOpenAI")]
    pub azure_openai: Vec<String>,
    pub google: Vec<String>,
    pub anthropic: Vec<String>,
    #[serde(rename = "gptPlugins")]
    pub gpt_plugins: Vec<String>,
    #[serde(rename = "bingAI")]
    pub bingai: Vec<String>,
    #[serde(rename = "chatGPTBrowser")]
    pub chatgpt_browser: Vec<String>,
    pub assistant: Vec<String>,
}

/// Fans out to every endpoint fetcher concurrently and joins the results.
pub struct ModelCatalogAggregator {
    openai: Arc<dyn FetchModels>,
    azure_openai: Arc<dyn FetchModels>,
    gpt_plugins: Arc<dyn FetchModels>,
    google: Arc<dyn FetchModels>,
    anthropic: Arc<dyn FetchModels>,
    chatgpt_browser: Arc<dyn FetchModels>,
    /// Deployment-wide flag, resolved once at startup
    use_azure_plugins: bool,
}

impl ModelCatalogAggregator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        openai: Arc<dyn FetchModels>,
        azure_openai: Arc<dyn FetchModels>,
        gpt_plugins: Arc<dyn FetchModels>,
        google: Arc<dyn FetchModels>,
        anthropic: Arc<dyn FetchModels>,
        chatgpt_browser: Arc<dyn FetchModels>,
        use_azure_plugins: bool,
    ) -> Self {
        Self {
            openai,
            azure_openai,
            gpt_plugins,
            google,
            anthropic,
            chatgpt_browser,
            use_azure_plugins,
        }
    }

    /// Load the catalog for one user.
    pub async fn load_catalog(&self, user: UserId) -> ModelCatalog {
        let openai_query = ModelQuery {
            user,
            azure: false,
            plugins: false,
        };
        let azure_query = ModelQuery {
            user,
            azure: true,
            plugins: false,
        };
        let plugins_query = ModelQuery {
            user,
            azure: self.use_azure_plugins,
            plugins: true,
        };
        let static_query = ModelQuery {
            user,
            azure: false,
            plugins: false,
        };

        let (openai, azure_openai, gpt_plugins, google, anthropic, chatgpt_browser) = tokio::join!(
            contained("openAI", self.openai.fetch(&openai_query)),
            contained("azureOpenAI", self.azure_openai.fetch(&azure_query)),
            contained("gptPlugins", self.gpt_plugins.fetch(&plugins_query)),
            contained("google", self.google.fetch(&static_query)),
            contained("anthropic", self.anthropic.fetch(&static_query)),
            contained("chatGPTBrowser", self.chatgpt_browser.fetch(&static_query)),
        );

        ModelCatalog {
            openai,
            azure_openai,
            google,
            anthropic,
            gpt_plugins,
            bingai: BINGAI_MODELS.iter().map(|s| s.to_string()).collect(),
            chatgpt_browser,
            assistant: ASSISTANT_MODELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Degrade one endpoint's failure to an empty list.
async fn contained(endpoint: &str, fetch: impl Future<Output = anyhow::Result<Vec<String>>>) -> Vec<String> {
    match fetch.await {
        Ok(models) => models,
        Err(e) => {
            warn!("Failed to fetch models for {}: {:#}", endpoint, e);
            Vec::new()
        }
    }
}
