//! User administration. Main manager only; the only creatable role is
//! branch_manager, so the main account cannot be duplicated through the API.

use axum::{
    extract::{Path, Query},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{Principal, ResourceOp};
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::database::service::{self as db, UserFilters};
use crate::database::update::UpdateBuilder;
use crate::error::ApiError;

use super::{hash_password, require_access};

const USER_COLUMNS: &str = "id, username, password_hash, role, branch_id, full_name, email, \
                            is_active, created_at, updated_at, created_by";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub role: Option<String>,
    pub branch_id: Option<i32>,
    pub is_active: Option<bool>,
}

/// GET /api/users
pub async fn list(
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    require_access(&principal, None, ResourceOp::UserAdmin, "Only main manager can manage users")?;

    let filters = UserFilters {
        role: query.role,
        branch_id: query.branch_id,
        is_active: query.is_active,
    };
    let users = db::list_users(&filters).await?;

    Ok(Json(json!({ "success": true, "data": users })))
}

/// GET /api/users/:id
pub async fn get(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    require_access(&principal, None, ResourceOp::UserAdmin, "Only main manager can manage users")?;

    let user = db::find_user_by_id(id).await?.ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(json!({ "success": true, "data": user })))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub branch_id: i32,
    pub email: Option<String>,
}

/// POST /api/users - create a branch_manager account tied to a branch
pub async fn create(
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    require_access(&principal, None, ResourceOp::UserAdmin, "Only main manager can manage users")?;

    if payload.username.trim().is_empty()
        || payload.password.is_empty()
        || payload.full_name.trim().is_empty()
    {
        return Err(ApiError::validation_error(
            "username, password, and full_name are required",
            None,
        ));
    }

    // The referenced branch must exist and be active
    db::find_branch_by_id(payload.branch_id)
        .await?
        .ok_or_else(|| ApiError::validation_error("Branch not found", None))?;

    let password_hash = hash_password(&payload.password).await?;

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, password_hash, role, branch_id, full_name, email, created_by) \
         VALUES ($1, $2, 'branch_manager', $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
    ))
    .bind(payload.username.trim())
    .bind(&password_hash)
    .bind(payload.branch_id)
    .bind(payload.full_name.trim())
    .bind(&payload.email)
    .bind(principal.id())
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({ "success": true, "data": user })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub branch_id: Option<i32>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

/// PUT /api/users/:id
pub async fn update(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    require_access(&principal, None, ResourceOp::UserAdmin, "Only main manager can manage users")?;

    db::find_user_by_id(id).await?.ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut builder = UpdateBuilder::new("users");
    if let Some(password) = &payload.password {
        builder.set("password_hash", hash_password(password).await?);
    }
    builder.set_if("full_name", payload.full_name);
    builder.set_if("branch_id", payload.branch_id);
    builder.set_if("email", payload.email);
    builder.set_if("is_active", payload.is_active);

    if builder.is_empty() {
        return Err(ApiError::validation_error("No fields to update", None));
    }
    builder.set_raw("updated_at = CURRENT_TIMESTAMP");

    let pool = DatabaseManager::pool().await?;
    let mut qb = builder.where_id(id, USER_COLUMNS);
    let user = qb.build_query_as::<User>().fetch_one(&pool).await?;

    Ok(Json(json!({ "success": true, "data": user })))
}

/// DELETE /api/users/:id - soft delete; the row survives for audit references
pub async fn delete(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    require_access(&principal, None, ResourceOp::UserAdmin, "Only main manager can manage users")?;

    if principal.id() == id {
        return Err(ApiError::validation_error("Cannot deactivate your own account", None));
    }

    db::find_user_by_id(id).await?.ok_or_else(|| ApiError::not_found("User not found"))?;

    let pool = DatabaseManager::pool().await?;
    sqlx::query("UPDATE users SET is_active = false, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "success": true, "message": "User deactivated" })))
}
