use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use storefront_core::DomainError;
use storefront_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Database { .. } | StoreError::Unavailable(_) => {
            tracing::error!(error = %err, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage backend failure")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
    }
}

pub fn json_rejection(err: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.body_text())
}

pub fn query_rejection(err: QueryRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.body_text())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
