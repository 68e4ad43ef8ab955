use axum::http::{header, HeaderMap};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;

/// Cookie the login handler mirrors the token into.
pub const AUTH_COOKIE: &str = "token";

/// Pull the bearer token out of a request: `Authorization: Bearer <t>` wins,
/// the auth cookie is the fallback for browser clients.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
        {
            return Some(token);
        }
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|pair| pair.strip_prefix(AUTH_COOKIE).and_then(|rest| rest.strip_prefix('=')))
        })
}

/// Resolve the caller's identity from the request headers.
///
/// This is a plain function instead of an extractor so handlers control when
/// it runs: resource-scoped routes must 404 on a missing record before any
/// token check happens.
pub fn require_identity(headers: &HeaderMap, keys: &JwtKeys) -> Result<Uuid, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;

    match keys.verify(token) {
        Ok(claims) => Ok(claims.sub),
        Err(_) => {
            warn!("invalid or expired token");
            Err(ApiError::Unauthorized("Invalid or expired token".into()))
        }
    }
}

/// The only authorization rule in the system: the caller may touch a user
/// record only when it is their own.
pub fn authorize_owner(identity: Uuid, owner: Uuid) -> Result<(), ApiError> {
    if identity == owner {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
