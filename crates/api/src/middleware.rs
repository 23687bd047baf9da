use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use storefront_auth::JwtValidator;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Attach a [`PrincipalContext`] when the request carries a bearer token.
///
/// Requests without an `Authorization` header pass through anonymously; a
/// header that is present but malformed, or a token that fails validation,
/// is rejected with 401 on every route.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = match extract_bearer(req.headers()) {
        Ok(None) => return Ok(next.run(req).await),
        Ok(Some(token)) => token,
        Err(msg) => return Err(unauthorized(msg)),
    };

    let principal = state
        .jwt
        .validate(token, Utc::now())
        .map_err(|_| unauthorized("invalid or expired token"))?;

    req.extensions_mut().insert(PrincipalContext::from(principal));

    Ok(next.run(req).await)
}

fn unauthorized(msg: &'static str) -> Response {
    errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, &'static str> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| "malformed authorization header")?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or("authorization header must use the Bearer scheme")?
        .trim();
    if token.is_empty() {
        return Err("empty bearer token");
    }

    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(v) = value {
            h.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static(v));
        }
        h
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_bearer(&headers(None)), Ok(None));
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers(Some("Bearer abc.def "))), Ok(Some("abc.def")));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_rejected() {
        assert!(extract_bearer(&headers(Some("Basic dXNlcg=="))).is_err());
        assert!(extract_bearer(&headers(Some("Bearer   "))).is_err());
    }
}
