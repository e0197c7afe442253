//! chatctl: attachment lifecycle and model-catalog control layer for chat
//! applications.
//!
//! The service owns two surfaces:
//! - the file routes (`/files`): upload, list, batch delete and the foreign
//!   provider download passthrough, dispatching content storage to
//!   per-endpoint strategies;
//! - the model catalog (`/models`): a concurrent fan-out over every chat
//!   endpoint's model list, degraded per endpoint on failure.
//!
//! Persistence and object storage stay behind the [`files::records::FileRecords`]
//! and [`files::storage::StorageStrategy`] traits; the in-memory store and
//! local filesystem strategy make the service self-contained for development.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod files;
pub mod models;
pub mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

pub use config::Config;
pub use errors::{Error, Result};

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::get,
};
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use utoipa::OpenApi as _;
use utoipa_scalar::{Scalar, Servable as _};

use crate::{
    config::CorsOrigin,
    files::{
        openai::{OpenAiFiles, OpenAiStorage},
        records::InMemoryFileRecords,
        service::{FileService, OPENAI_ENDPOINT},
        storage::{LocalStorage, StorageRegistry},
    },
    models::{
        aggregator::ModelCatalogAggregator,
        fetchers::{FetchModelsReqwest, StaticModelsFetcher},
    },
    openapi::ApiDoc,
};

/// Endpoint key for the filesystem strategy
pub const LOCAL_ENDPOINT: &str = "local";

/// Shared application state for all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub files: Arc<FileService>,
    pub catalog: Arc<ModelCatalogAggregator>,
}

impl AppState {
    /// Wire the default collaborators from configuration: the in-memory
    /// metadata store, the local and provider storage strategies, and one
    /// fetcher per catalog endpoint.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let records = Arc::new(InMemoryFileRecords::new());

        let provider_client = OpenAiFiles::new(&config.providers.openai)?;
        let storage = StorageRegistry::new()
            .register(LOCAL_ENDPOINT, Arc::new(LocalStorage::new(config.files.storage_dir.clone())))
            .register(
                OPENAI_ENDPOINT,
                Arc::new(OpenAiStorage::new(provider_client, config.files.retain_staged)),
            );

        let files = Arc::new(FileService::new(records, storage));

        let openai_fetcher = Arc::new(FetchModelsReqwest::new(&config.providers.openai)?);
        let azure_fetcher = Arc::new(FetchModelsReqwest::new(config.azure_provider())?);
        let catalog = Arc::new(ModelCatalogAggregator::new(
            openai_fetcher.clone(),
            azure_fetcher,
            openai_fetcher,
            Arc::new(StaticModelsFetcher::new(config.providers.google_models.clone())),
            Arc::new(StaticModelsFetcher::new(config.providers.anthropic_models.clone())),
            Arc::new(StaticModelsFetcher::new(config.providers.chatgpt_browser_models.clone())),
            config.providers.use_azure_plugins,
        ));

        Ok(AppState::builder().config(config).files(files).catalog(catalog).build())
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.cors.allow_credentials);

    Ok(cors)
}

async fn healthz() -> &'static str {
    "OK"
}

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let mut router = Router::new()
        .route(
            "/files",
            get(api::handlers::files::list_files)
                .post(api::handlers::files::upload_file)
                .delete(api::handlers::files::delete_files),
        )
        .route("/files/download/{file_id}", get(api::handlers::files::download_file))
        .route("/models", get(api::handlers::models::get_models))
        .route("/healthz", get(healthz))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .with_state(state.clone());

    // The axum default body limit is well below a useful upload size
    if state.config.files.max_file_size > 0 {
        router = router.layer(DefaultBodyLimit::max(state.config.files.max_file_size as usize));
    } else {
        router = router.layer(DefaultBodyLimit::disable());
    }

    let cors_layer = create_cors_layer(&state.config)?;
    Ok(router.layer(cors_layer).layer(TraceLayer::new_for_http()))
}

/// The application: router plus the configuration it was built from.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting chatctl with configuration: {:#?}", config);

        let state = AppState::from_config(config.clone())?;
        let router = build_router(&state)?;

        Ok(Self { router, config })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("chatctl listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server shut down gracefully");
        Ok(())
    }
}
