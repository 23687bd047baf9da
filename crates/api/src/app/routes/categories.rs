use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use storefront_catalog::{CategoryPatch, NewCategory, Slug};
use storefront_core::{CategoryId, DomainError};

use super::products::product_query;
use super::route_both;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    let r = Router::new();
    let r = route_both(r, "/categories", get(list_categories).post(create_category));
    let r = route_both(
        r,
        "/categories/:slug",
        get(get_category)
            .put(replace_category)
            .patch(patch_category)
            .delete(delete_category),
    );
    route_both(r, "/categories/:slug/products", get(list_category_products))
}

/// A path segment that is not a well-formed slug cannot name a category.
fn parse_slug(raw: &str) -> Result<Slug, Response> {
    Slug::parse(raw).map_err(|_| errors::domain_error_to_response(DomainError::not_found("category")))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.catalog.list_categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_category(Extension(services): Extension<Arc<AppServices>>, Path(slug): Path<String>) -> Response {
    let slug = match parse_slug(&slug) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.catalog.get_category(&slug).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    body: Result<Json<NewCategory>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let category = match body.into_category(CategoryId::new()) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog.insert_category(category).await {
        Ok(category) => {
            tracing::info!(slug = %category.slug, user_id = %principal.user_id(), "category created");
            (StatusCode::CREATED, Json(category)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Full replace: an omitted slug is derived from the new name.
pub async fn replace_category(
    Extension(services): Extension<Arc<AppServices>>,
    _principal: PrincipalContext,
    Path(slug): Path<String>,
    body: Result<Json<NewCategory>, JsonRejection>,
) -> Response {
    let slug = match parse_slug(&slug) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let (name, new_slug) = match body.resolve() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog.update_category(&slug, name, new_slug).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn patch_category(
    Extension(services): Extension<Arc<AppServices>>,
    _principal: PrincipalContext,
    Path(slug): Path<String>,
    body: Result<Json<CategoryPatch>, JsonRejection>,
) -> Response {
    let slug = match parse_slug(&slug) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let Json(patch) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection(e),
    };

    let current = match services.catalog.get_category(&slug).await {
        Ok(c) => c,
        Err(e) => return errors::store_error_to_response(e),
    };
    let (name, new_slug) = match patch.resolve(&current) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog.update_category(&slug, name, new_slug).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    _principal: PrincipalContext,
    Path(slug): Path<String>,
) -> Response {
    let slug = match parse_slug(&slug) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.catalog.delete_category(&slug).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_category_products(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let slug = match parse_slug(&slug) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let query = match product_query(params) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.catalog.list_category_products(&slug, &query).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
