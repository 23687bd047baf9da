//! `storefront-auth` — token verification boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it turns a
//! bearer token into a verified [`Principal`] and nothing more. Issuing tokens
//! is someone else's job.

pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::Principal;
pub use roles::Role;
