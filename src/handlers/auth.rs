//! Session endpoints: login, current principal, logout.

use axum::{response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{generate_jwt, Principal};
use crate::database::service as db;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/auth/login
///
/// The credential store is two-layered: the users table is consulted first,
/// then branches (a branch record doubles as a branch-manager login). Both
/// failures collapse into the same 401 so the response does not reveal which
/// layer matched.
pub async fn login(Json(payload): Json<LoginRequest>) -> Result<Json<Value>, ApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation_error("Username and password are required", None));
    }

    if let Some(user) = db::find_user_by_username(&payload.username).await? {
        if verify_password(&payload.password, &user.password_hash).await {
            // Correct credentials against a disabled account get a distinct
            // answer; wrong credentials never reveal the account exists
            if !user.is_active {
                return Err(ApiError::forbidden("Account is deactivated"));
            }
            let principal = Principal::from_user(&user).map_err(|e| {
                warn!("User {} has inconsistent role data: {}", user.id, e);
                ApiError::internal_server_error("Account is misconfigured")
            })?;
            return issue_session(principal, json!(user));
        }
        // Fall through: the same username may belong to a branch credential
    }

    if let Some(branch) = db::find_branch_by_username(&payload.username).await? {
        if verify_password(&payload.password, &branch.password_hash).await {
            if !branch.is_active {
                return Err(ApiError::forbidden("Account is deactivated"));
            }
            // Branch login: synthesized branch_manager scoped to its own id
            let principal = Principal::from_branch(&branch);
            return issue_session(principal, json!(branch));
        }
    }

    Err(ApiError::unauthorized("Invalid username or password"))
}

fn issue_session(principal: Principal, account: Value) -> Result<Json<Value>, ApiError> {
    let claims = principal.to_claims();
    let token = generate_jwt(&claims).map_err(|e| {
        warn!("JWT generation failed: {}", e);
        ApiError::internal_server_error("Failed to create session")
    })?;

    info!("Login: {} ({})", principal.username(), principal.role_str());

    Ok(Json(json!({
        "success": true,
        "data": {
            "token": token,
            "user": {
                "id": principal.id(),
                "username": principal.username(),
                "role": principal.role_str(),
                "branch_id": principal.branch_id(),
                "account": account,
            },
            "expires_at": claims.exp,
        }
    })))
}

/// An unparseable stored hash counts as a failed match, not a server error.
/// Verification runs on the blocking pool; bcrypt at the configured cost is
/// too slow to hold an executor thread.
async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(ok)) => ok,
        Ok(Err(e)) => {
            warn!("Password verification failed against stored hash: {}", e);
            false
        }
        Err(e) => {
            warn!("Password verification task failed: {}", e);
            false
        }
    }
}

/// GET /api/auth/me
pub async fn me(Extension(principal): Extension<Principal>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({
        "success": true,
        "data": {
            "id": principal.id(),
            "username": principal.username(),
            "role": principal.role_str(),
            "branch_id": principal.branch_id(),
        }
    })))
}

/// POST /api/auth/logout
///
/// Sessions are stateless JWTs; logout is an acknowledgment and the client
/// discards the token.
pub async fn logout(Extension(principal): Extension<Principal>) -> Json<Value> {
    info!("Logout: {}", principal.username());
    Json(json!({ "success": true, "message": "Logged out successfully" }))
}
