//! Shared helpers for tests.

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState, Config,
    auth::{CurrentUser, session::create_session_token},
    files::{records::InMemoryFileRecords, service::FileService, storage::StorageRegistry},
    models::{aggregator::ModelCatalogAggregator, fetchers::StaticModelsFetcher},
};

pub fn create_test_config() -> Config {
    Config {
        secret_key: Some("test-secret-key".to_string()),
        ..Default::default()
    }
}

pub fn create_test_user() -> CurrentUser {
    CurrentUser {
        id: Uuid::new_v4(),
        email: "test@example.com".to_string(),
        username: "testuser".to_string(),
    }
}

/// State with empty collaborators. Tests needing storage or records build
/// their own [`AppState`] with the builder.
pub fn create_test_state(config: Config) -> AppState {
    let files = Arc::new(FileService::new(Arc::new(InMemoryFileRecords::new()), StorageRegistry::new()));
    let catalog = Arc::new(test_catalog(&config));

    AppState::builder().config(config).files(files).catalog(catalog).build()
}

/// Aggregator backed entirely by static fetchers.
pub fn test_catalog(config: &Config) -> ModelCatalogAggregator {
    ModelCatalogAggregator::new(
        Arc::new(StaticModelsFetcher::new(vec!["gpt-4".to_string()])),
        Arc::new(StaticModelsFetcher::new(vec!["gpt-4-azure".to_string()])),
        Arc::new(StaticModelsFetcher::new(vec!["gpt-4".to_string()])),
        Arc::new(StaticModelsFetcher::new(config.providers.google_models.clone())),
        Arc::new(StaticModelsFetcher::new(config.providers.anthropic_models.clone())),
        Arc::new(StaticModelsFetcher::new(config.providers.chatgpt_browser_models.clone())),
        config.providers.use_azure_plugins,
    )
}

/// `Authorization` header value for a freshly minted session token.
pub fn bearer_for(user: &CurrentUser, config: &Config) -> String {
    let token = create_session_token(user, config).expect("failed to create session token");
    format!("Bearer {token}")
}
