use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct CredentialsDoc { pub username: String, pub password: String }

#[derive(ToSchema)]
pub struct MeDoc { pub id: i64, pub login: String }

#[derive(ToSchema)]
pub struct CreateTaskDoc { pub task_id: String, pub status: String }

/// `status` is `in_progress` or `ready`; timestamps are RFC 3339.
#[derive(ToSchema)]
pub struct StatusDoc { pub status: String, pub created_at: String, pub updated_at: String }

#[derive(ToSchema)]
pub struct ResultDoc { pub result: String }

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::tasks::create,
        crate::routes::tasks::status,
        crate::routes::tasks::result,
    ),
    components(
        schemas(
            HealthResponse,
            CredentialsDoc,
            MeDoc,
            CreateTaskDoc,
            StatusDoc,
            ResultDoc,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "tasks")
    )
)]
pub struct ApiDoc;
