pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod scope;
pub mod store;
pub mod telemetry;
pub mod users;

use axum::Router;
use std::sync::Arc;
use store::Store;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across all handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Lifetime of newly issued bearer tokens
    pub token_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, token_ttl: chrono::Duration) -> Self {
        Self { store, token_ttl }
    }
}

/// Build the full application router: API routes, Swagger UI and request
/// tracing.
pub fn app(state: AppState) -> Router {
    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    let router = Router::new()
        .nest("/api/user", api::user::router())
        .nest("/api/recipe", api::recipe::router())
        .merge(swagger_ui)
        .with_state(state);

    telemetry::trace_requests(router)
}
