//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection (in-memory or Postgres) and the cart service
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request bodies and composite response shapes
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use storefront_auth::{Hs256JwtValidator, JwtValidator};
use storefront_infra::StoreResult;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router from process configuration (used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> StoreResult<Router> {
    let services = services::build_services(config.database.as_ref()).await?;
    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes()));
    Ok(router(services, jwt))
}

/// Assemble the router around already-built services.
pub fn router(services: AppServices, jwt: Arc<dyn JwtValidator>) -> Router {
    let auth_state = middleware::AuthState { jwt };

    routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
