//! HTTP handlers, grouped by resource. Every protected handler receives the
//! normalized [`Principal`] from the auth middleware via request extensions.

use tracing::error;

use crate::auth::{can_access, Principal, ResourceOp};
use crate::config;
use crate::error::ApiError;

pub mod auth;
pub mod branch_documents;
pub mod branches;
pub mod documents;
pub mod employees;
pub mod multipart;
pub mod users;

/// Evaluate an access decision and turn a denial into a 403
pub fn require_access(
    principal: &Principal,
    target_branch: Option<i32>,
    op: ResourceOp,
    denied_message: &str,
) -> Result<(), ApiError> {
    if can_access(principal, target_branch, op).is_allowed() {
        Ok(())
    } else {
        Err(ApiError::forbidden(denied_message))
    }
}

/// Bcrypt is CPU-bound at the configured cost; run it off the async runtime
pub async fn hash_password(password: &str) -> Result<String, ApiError> {
    let password = password.to_string();
    let cost = config::config().security.bcrypt_cost;
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            ApiError::internal_server_error("Failed to process password")
        })?
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::internal_server_error("Failed to process password")
        })
}
