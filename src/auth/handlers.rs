use axum::{
    extract::{FromRef, State},
    http::header::SET_COOKIE,
    response::AppendHeaders,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, MessageResponse, PublicUser},
        identity::AUTH_COOKIE,
        jwt::JwtKeys,
        password::verify_password,
    },
    error::ApiError,
    state::AppState,
    users::repo::User,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(AppendHeaders<[(axum::http::HeaderName, String); 1]>, Json<LoginResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::InvalidCredentials("User not found")
        })?;

    // An argon2 error here is a hashing subsystem failure, not a mismatch.
    let ok = verify_password(&payload.password, &user.password_hash)?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials("Email and password do not match"));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    let cookie = format!(
        "{AUTH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        keys.ttl.as_secs()
    );

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            message: "Successfully logged in!".into(),
            token,
            user: PublicUser::from(user),
        }),
    ))
}

/// Clears the auth cookie. The token itself stays valid until expiry; there
/// is no server-side revocation list.
#[instrument]
pub async fn logout() -> (AppendHeaders<[(axum::http::HeaderName, String); 1]>, Json<MessageResponse>) {
    // Attributes must match the login cookie or some browsers keep the
    // original instead of replacing it.
    let cookie = format!("{AUTH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse {
            message: "Successfully logged out!",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logout_clears_cookie_with_matching_attributes() {
        let (AppendHeaders([(name, cookie)]), Json(body)) = logout().await;

        assert_eq!(name, SET_COOKIE);
        assert!(cookie.starts_with(&format!("{AUTH_COOKIE}=;")));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(body.message, "Successfully logged out!");
    }
}
