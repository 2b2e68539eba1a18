//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, logout and the
//! current-user lookup.
//!
//! Passwords are stored as salted Argon2 hashes. Login failures for an
//! unknown email and for a wrong password produce the identical response,
//! so the two cases cannot be told apart from outside.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use pdf_chat_core::domain::{NewUser, User};
use pdf_chat_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::web::middleware::CurrentUser;
use crate::web::respond::{failure, invalid, storage_failure, Failure, FieldError};
use crate::web::session::{session_token_from_headers, SESSION_COOKIE, SESSION_TTL_SECONDS};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A user as serialized to clients. The password hash never leaves the
/// server.
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

//=========================================================================================
// Password Hashing
//=========================================================================================

pub(crate) fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

//=========================================================================================
// Cookie Helpers
//=========================================================================================

fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECONDS
    )
}

fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Validation failure or duplicate email"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, Failure> {
    let mut errors = Vec::new();
    if req.email.trim().is_empty() {
        errors.push(FieldError::required("email"));
    }
    if req.password.is_empty() {
        errors.push(FieldError::required("password"));
    }
    if req.name.trim().is_empty() {
        errors.push(FieldError::required("name"));
    }
    if !errors.is_empty() {
        return Err(invalid("Invalid user data", errors));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to register user")
    })?;

    let user = state
        .storage
        .create_user(NewUser {
            email: req.email,
            password: password_hash,
            name: req.name,
        })
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => failure(StatusCode::BAD_REQUEST, "User already exists"),
            other => storage_failure("Failed to register user", other),
        })?;

    let token = state.sessions.issue(user.id).await;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(UserResponse::from(user)),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, Failure> {
    let user = state
        .storage
        .get_user_by_email(&req.email)
        .await
        .map_err(|e| storage_failure("Failed to login", e))?;

    // Same response whether the email is unknown or the password is wrong.
    let Some(user) = user else {
        return Err(failure(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    };
    if !verify_password(&req.password, &user.password) {
        return Err(failure(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    }

    let token = state.sessions.issue(user.id).await;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(UserResponse::from(user)),
    ))
}

/// POST /api/auth/logout - Logout and invalidate the session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = LogoutResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, Failure> {
    // require_auth already ran, so a token is present.
    if let Some(token) = session_token_from_headers(&headers) {
        state.sessions.revoke(token).await;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// GET /api/auth/user - Fetch the currently authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn current_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, Failure> {
    let user = state
        .storage
        .get_user(user_id)
        .await
        .map_err(|e| storage_failure("Failed to get user", e))?
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "User not found"))?;

    Ok((StatusCode::OK, Json(UserResponse::from(user))))
}
