pub mod bank;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod leaderboard;
pub mod models;
pub mod progression;
pub mod routes;
pub mod seed;
pub mod session;
pub mod state;
pub mod utils;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Arena Competition API",
        version = "1.0.0",
        description = "API for the Arena multi-round programming competition engine"
    ),
    tags(
        (name = "Auth", description = "Authentication and participant accounts"),
        (name = "Rounds", description = "Round access gate"),
        (name = "Sessions", description = "Quiz sessions for rounds 1 and 2"),
        (name = "Round 3", description = "Track choice and challenge submissions"),
        (name = "Review", description = "Admin review of Round 3 submissions"),
        (name = "Leaderboard", description = "Rankings and Round 3 qualification"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the CORS layer from config. An empty origin list means permissive.
fn build_cors(config: &config::CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(config.max_age));

    if config.allow_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = build_cors(&state.config.server.cors);

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .with_state(state)
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
