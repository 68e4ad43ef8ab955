use axum::{
    extract::{FromRef, Path, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::MessageResponse,
        identity::{authorize_owner, require_identity},
        jwt::JwtKeys,
        password::hash_password,
    },
    error::ApiError,
    state::AppState,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest, UserView},
        repo::User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Guard order for `/users/:id` routes: a missing record answers 404 before
/// any token check, and a bad token answers 401 before ownership is weighed.
fn guard_user(
    target: Option<User>,
    headers: &HeaderMap,
    keys: &JwtKeys,
    owner_only: bool,
) -> Result<User, ApiError> {
    let user = target.ok_or(ApiError::NotFound)?;
    let identity = require_identity(headers, keys)?;
    if owner_only {
        authorize_owner(identity, user.id)?;
    }
    Ok(user)
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }

    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, name, &email, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok(Json(MessageResponse {
        message: "Successfully signed up!",
    }))
}

#[instrument(skip(state, headers))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<UserView>, ApiError> {
    let target = User::find_by_id(&state.db, id).await?;
    let keys = JwtKeys::from_ref(&state);
    let user = guard_user(target, &headers, &keys, false)?;

    Ok(Json(UserView::from(user)))
}

#[instrument(skip(state, headers, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let target = User::find_by_id(&state.db, id).await?;
    let keys = JwtKeys::from_ref(&state);
    let user = guard_user(target, &headers, &keys, true)?;

    let name = match payload.name.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::BadRequest("Name is required".into())),
        other => other,
    };
    let email = match payload.email.as_deref().map(|e| e.trim().to_lowercase()) {
        Some(e) if !is_valid_email(&e) => {
            return Err(ApiError::BadRequest("Invalid email".into()))
        }
        other => other,
    };

    User::update(&state.db, user.id, name, email.as_deref()).await?;

    info!(user_id = %user.id, "user updated");
    Ok(Json(MessageResponse {
        message: "Update success!",
    }))
}

#[instrument(skip(state, headers))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let target = User::find_by_id(&state.db, id).await?;
    let keys = JwtKeys::from_ref(&state);
    let user = guard_user(target, &headers, &keys, true)?;

    User::delete(&state.db, user.id).await?;

    info!(user_id = %user.id, "user deleted");
    Ok(Json(MessageResponse {
        message: "Delete success!",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};
    use time::OffsetDateTime;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_ref(&AppState::fake())
    }

    fn stored_user(id: Uuid) -> User {
        User {
            id,
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn missing_record_is_404_regardless_of_token() {
        let keys = make_keys();

        // No token at all.
        let err = guard_user(None, &HeaderMap::new(), &keys, true).unwrap_err();
        assert_eq!(err.kind(), "NotFound");

        // Garbage token.
        let err = guard_user(None, &headers_with_bearer("nonsense"), &keys, true).unwrap_err();
        assert_eq!(err.kind(), "NotFound");

        // Perfectly valid token.
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        let err = guard_user(None, &headers_with_bearer(&token), &keys, true).unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[tokio::test]
    async fn bad_token_is_401_before_ownership_is_checked() {
        let keys = make_keys();
        let target = stored_user(Uuid::new_v4());

        let err = guard_user(Some(target.clone()), &HeaderMap::new(), &keys, true).unwrap_err();
        assert_eq!(err.kind(), "Unauthorized");

        let err =
            guard_user(Some(target), &headers_with_bearer("nonsense"), &keys, true).unwrap_err();
        assert_eq!(err.kind(), "Unauthorized");
    }

    #[tokio::test]
    async fn cross_user_token_is_403_on_owner_routes() {
        let keys = make_keys();
        let target = stored_user(Uuid::new_v4());
        let token = keys.sign(Uuid::new_v4()).expect("sign");

        let err =
            guard_user(Some(target), &headers_with_bearer(&token), &keys, true).unwrap_err();
        assert_eq!(err.kind(), "Forbidden");
    }

    #[tokio::test]
    async fn owner_token_passes_owner_routes() {
        let keys = make_keys();
        let owner = Uuid::new_v4();
        let token = keys.sign(owner).expect("sign");

        let user =
            guard_user(Some(stored_user(owner)), &headers_with_bearer(&token), &keys, true)
                .expect("owner allowed");
        assert_eq!(user.id, owner);
    }

    #[tokio::test]
    async fn any_valid_token_passes_read_routes() {
        let keys = make_keys();
        let target = stored_user(Uuid::new_v4());
        let token = keys.sign(Uuid::new_v4()).expect("sign");

        assert!(guard_user(Some(target), &headers_with_bearer(&token), &keys, false).is_ok());
    }

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("ann@x.com"));
        assert!(is_valid_email("a.b+tag@sub.domain.org"));
    }

    #[test]
    fn email_regex_rejects_junk() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("ann"));
        assert!(!is_valid_email("ann@"));
        assert!(!is_valid_email("ann@x"));
        assert!(!is_valid_email("ann @x.com"));
    }
}
