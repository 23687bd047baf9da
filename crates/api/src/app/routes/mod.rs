use axum::{Router, routing::MethodRouter};

pub mod cart;
pub mod categories;
pub mod products;
pub mod system;

/// Router for every resource endpoint. Each path answers with and without a
/// trailing slash.
pub fn router() -> Router {
    Router::new()
        .merge(system::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(cart::router())
}

/// Route `path` and `path/` to the same handlers.
pub(crate) fn route_both(router: Router, path: &str, handlers: MethodRouter) -> Router {
    router
        .route(path, handlers.clone())
        .route(&format!("{path}/"), handlers)
}
