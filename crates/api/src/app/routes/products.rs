use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;

use storefront_catalog::{NewProduct, ProductPatch, ProductQuery};
use storefront_core::ProductId;

use super::route_both;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    let r = Router::new();
    let r = route_both(r, "/products", get(list_products).post(create_product));
    route_both(
        r,
        "/products/:id",
        get(get_product)
            .put(replace_product)
            .patch(patch_product)
            .delete(delete_product),
    )
}

/// Parse raw query pairs into a [`ProductQuery`].
pub(crate) fn product_query(
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<ProductQuery, Response> {
    let Query(params) = params.map_err(errors::query_rejection)?;
    ProductQuery::from_params(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .map_err(errors::domain_error_to_response)
}

fn parse_id(raw: &str) -> Result<ProductId, Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let query = match product_query(params) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.catalog.list_products(&query).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.get_product(id).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let product = match body.into_product(ProductId::new(), Utc::now()) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog.insert_product(product).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, user_id = %principal.user_id(), "product created");
            (StatusCode::CREATED, Json(product)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn replace_product(
    Extension(services): Extension<Arc<AppServices>>,
    _principal: PrincipalContext,
    Path(id): Path<String>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let mut product = match services.catalog.get_product(id).await {
        Ok(p) => p,
        Err(e) => return errors::store_error_to_response(e),
    };
    if let Err(e) = product.replace(body) {
        return errors::domain_error_to_response(e);
    }

    match services.catalog.update_product(product).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn patch_product(
    Extension(services): Extension<Arc<AppServices>>,
    _principal: PrincipalContext,
    Path(id): Path<String>,
    body: Result<Json<ProductPatch>, JsonRejection>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(patch) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let mut product = match services.catalog.get_product(id).await {
        Ok(p) => p,
        Err(e) => return errors::store_error_to_response(e),
    };
    if let Err(e) = product.apply_patch(patch) {
        return errors::domain_error_to_response(e);
    }

    match services.catalog.update_product(product).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    _principal: PrincipalContext,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.delete_product(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
