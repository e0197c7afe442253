//! OpenAPI documentation for the HTTP API.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Security scheme: session JWT as a bearer token or cookie.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "SessionToken".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token issued at login. Sent either as\n\n\
                            ```\nAuthorization: Bearer <token>\n```\n\n\
                            or as the session cookie.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::list_files,
        api::handlers::files::delete_files,
        api::handlers::files::download_file,
        api::handlers::files::upload_file,
        api::handlers::models::get_models,
    ),
    components(schemas(
        crate::types::FileRecord,
        crate::api::models::files::DeleteFileItem,
        crate::api::models::files::DeleteFilesRequest,
        crate::api::models::files::MessageResponse,
        crate::api::models::files::FileUploadResponse,
        crate::models::aggregator::ModelCatalog,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "files", description = "File attachment lifecycle"),
        (name = "models", description = "Model catalog")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_spell_out_id_and_timestamp_formats() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();

        let record = &doc["components"]["schemas"]["FileRecord"]["properties"];
        assert_eq!(record["user"]["type"], "string");
        assert_eq!(record["user"]["format"], "uuid");
        assert_eq!(record["created_at"]["format"], "date-time");

        let upload = &doc["components"]["schemas"]["FileUploadResponse"]["properties"];
        assert_eq!(upload["user"]["format"], "uuid");
    }
}
