use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "irhabi API",
        version = "0.3.0",
        description = "Demo REST API built on the irhabi toolkit. Successful responses wrap their payload as `{\"status\": \"success\", \"data\": ..., \"total\": ...}`."
    ),
    paths(
        crate::routes::register,
        crate::routes::login,
        crate::routes::me,
        crate::routes::list_users,
        crate::routes::get_user,
        crate::routes::list_notifications,
        crate::routes::create_notification,
        crate::routes::read_all_notifications,
        crate::routes::read_notification,
        crate::routes::document_history,
        crate::routes::show_document_version,
        crate::routes::create_document_version,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::RegisterRequest,
        crate::dto::LoginRequest,
        crate::dto::UserResponse,
        crate::dto::TokenResponse,
        crate::dto::ObjectActionDto,
        crate::dto::NotificationRequest,
        crate::dto::NotificationResponse,
        crate::dto::CountResponse,
        crate::dto::VersionRequest,
        crate::dto::DocumentResponse,
        crate::dto::ErrorResponse,
        crate::dto::HealthResponse,
    )),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "Accounts"),
        (name = "notifications", description = "User notifications and push delivery"),
        (name = "documents", description = "Document version history"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the JWT bearer security scheme to the OpenAPI document.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /v1/auth/login."))
                        .build(),
                ),
            );
        }
    }
}
