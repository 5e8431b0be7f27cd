//! Account endpoints: register, login, logout, current user
//!
//! Tokens are returned in plaintext exactly once; only their SHA-256
//! digest is stored.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use songboard_common::auth::{generate_token, hash_password, hash_token, verify_password};
use songboard_common::{NewUser, Role, User};
use tracing::{info, warn};
use validator::Validate;

use crate::api::validated::ValidatedJson;
use crate::context::Authenticated;
use crate::error::{ServiceError, ServiceResult};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "The password must be at least 8 characters."))]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "The password field is required."))]
    pub password: String,
}

/// Issue a token for `user` and build the `{user, token}` body
async fn issue_token(state: &AppState, user: User) -> ServiceResult<Value> {
    let token = generate_token();
    state.users.create_token(user.id, &hash_token(&token)).await?;
    Ok(json!({
        "user": user,
        "token": token,
    }))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> ServiceResult<(StatusCode, Json<Value>)> {
    if body.password != body.password_confirmation {
        return Err(ServiceError::validation(
            "password",
            "The password confirmation does not match.",
        ));
    }

    let password_hash = hash_password(&body.password)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    let user = state
        .users
        .create(NewUser {
            name: body.name.trim().to_string(),
            email: body.email,
            password_hash,
            role: Role::User,
        })
        .await
        .map_err(|e| match e {
            songboard_common::Error::Conflict(_) => {
                ServiceError::validation("email", "The email has already been taken.")
            }
            other => other.into(),
        })?;

    info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(issue_token(&state, user).await?)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> ServiceResult<Json<Value>> {
    let Some(record) = state.users.find_by_email(&body.email).await? else {
        warn!("Login failed: unknown account");
        return Err(ServiceError::InvalidCredentials);
    };

    let valid = verify_password(&body.password, &record.password_hash)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    if !valid {
        warn!(user_id = record.user.id, "Login failed: wrong password");
        return Err(ServiceError::InvalidCredentials);
    }

    info!(user_id = record.user.id, "User logged in");
    Ok(Json(issue_token(&state, record.user).await?))
}

/// POST /auth/logout
///
/// Revokes only the token used for this request.
pub async fn logout(
    State(state): State<AppState>,
    auth: Authenticated,
) -> ServiceResult<Json<Value>> {
    let caller = auth.caller().ok_or(ServiceError::Unauthenticated)?;
    state.users.revoke_token(&caller.token_hash).await?;

    info!(user_id = caller.id(), "User logged out");
    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

/// GET /auth/me, /auth/user, /auth/profile
pub async fn me(auth: Authenticated) -> ServiceResult<Json<User>> {
    let caller = auth.caller().ok_or(ServiceError::Unauthenticated)?;
    Ok(Json(caller.user.clone()))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/user", get(me))
        .route("/auth/profile", get(me))
}
