use crate::AppState;
use crate::auth::CurrentUser;
use crate::errors::Result;
use crate::models::aggregator::ModelCatalog;
use axum::{Json, extract::State};

#[utoipa::path(
    get,
    path = "/models",
    tag = "models",
    summary = "Load the model catalog",
    description = "Aggregate the model lists of every chat endpoint for the authenticated user. \
                   Endpoints whose fetch fails appear with an empty list.",
    responses(
        (status = 200, description = "Model catalog", body = ModelCatalog),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_models(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<ModelCatalog>> {
    let catalog = state.catalog.load_catalog(current_user.id).await;
    Ok(Json(catalog))
}
