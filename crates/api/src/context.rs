use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::Response;

use storefront_auth::{Principal, Role};
use storefront_core::UserId;

use crate::app::errors;

/// Authenticated caller of a request (identity + roles).
///
/// Inserted by the auth middleware when the request carries a valid bearer
/// token. Handlers that take it as an argument reject anonymous callers
/// with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

impl From<Principal> for PrincipalContext {
    fn from(p: Principal) -> Self {
        Self::new(p.user_id(), p.roles().to_vec())
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for PrincipalContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PrincipalContext>()
            .cloned()
            .ok_or_else(|| errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required"))
    }
}
