//! OpenAPI 3.0 documentation assembly
//!
//! Aggregates handler path annotations and domain schemas into a single
//! OpenAPI document, served at `/api-docs/openapi.json` with Swagger UI
//! mounted at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Patio Core API",
        version = "0.3.0",
        description = "Patio Core gateway and platform service API",
        license(name = "Proprietary"),
        contact(name = "Patio Team")
    ),
    tags(
        (name = "System", description = "Health checks and system status"),
        (name = "Verification", description = "Email verification codes"),
        (name = "Me", description = "Current-user views backed by the user service"),
    ),
    security(
        ("bearer_jwt" = [])
    ),
    components(
        schemas(
            // Shared response types
            crate::api::MessageResponse,
            crate::api::health::HealthResponse,

            // User directory
            crate::domain::UserSummary,
            crate::domain::UserProfile,
            crate::domain::UserExists,

            // Verification
            crate::domain::SendCodeInput,
            crate::domain::CheckCodeInput,
        )
    ),
    paths(
        crate::api::health::health,
        crate::api::verification::send_code,
        crate::api::verification::check_code,
        crate::api::me::me,
        crate::api::me::my_friends,
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn build() -> utoipa::openapi::OpenApi {
        let mut doc = Self::openapi();
        // Add Bearer JWT security scheme
        if let Some(c) = doc.components.as_mut() {
            c.security_schemes.insert(
                "bearer_jwt".to_string(),
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
        doc
    }
}
