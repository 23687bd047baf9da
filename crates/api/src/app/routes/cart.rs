use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use super::route_both;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    route_both(Router::new(), "/cart", get(get_cart).post(add_item))
}

pub async fn get_cart(Extension(services): Extension<Arc<AppServices>>, principal: PrincipalContext) -> Response {
    match services.carts.get_or_create_cart(principal.user_id()).await {
        Ok(view) => Json(dto::cart_to_json(&view)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    body: Result<Json<dto::AddItemRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let (product_id, quantity) = match body.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.carts.add_item(principal.user_id(), product_id, quantity).await {
        Ok(item) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "message": "Item added to cart",
                "item": item,
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
