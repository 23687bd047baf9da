use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};

use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/whoami", get(whoami))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(principal: PrincipalContext) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id().to_string(),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    }))
}
