//! Branch endpoints. Reads are branch-scoped; create/update/delete are main
//! manager only.

use axum::{
    extract::{Path, Query},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{can_access, Principal, ResourceOp};
use crate::database::manager::DatabaseManager;
use crate::database::models::Branch;
use crate::database::service::{self as db, BranchFilters};
use crate::database::update::UpdateBuilder;
use crate::error::ApiError;

use super::{hash_password, require_access};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub branch_type: Option<String>,
    pub is_active: Option<bool>,
}

/// GET /api/branches - a branch manager sees only their own branch
pub async fn list(
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let filters = BranchFilters {
        branch_type: query.branch_type,
        is_active: query.is_active,
        id: principal.branch_id(),
    };
    let branches = db::list_branches(&filters).await?;

    Ok(Json(json!({ "success": true, "data": branches })))
}

/// GET /api/branches/:id
pub async fn get(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let branch =
        db::find_branch_by_id(id).await?.ok_or_else(|| ApiError::not_found("Branch not found"))?;

    if !can_access(&principal, Some(branch.id), ResourceOp::BranchRead).is_allowed() {
        return Err(ApiError::forbidden("You can only view your own branch"));
    }

    Ok(Json(json!({ "success": true, "data": branch })))
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub branch_name: String,
    pub branch_location: String,
    pub branch_type: String,
    pub username: String,
    pub password: String,
}

const BRANCH_TYPES: [&str; 2] = ["school", "healthcare_center"];

/// POST /api/branches
pub async fn create(
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateBranchRequest>,
) -> Result<Json<Value>, ApiError> {
    require_access(&principal, None, ResourceOp::BranchAdmin, "Only main manager can manage branches")?;

    if payload.branch_name.trim().is_empty()
        || payload.branch_location.trim().is_empty()
        || payload.username.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(ApiError::validation_error(
            "branch_name, branch_location, branch_type, username, and password are required",
            None,
        ));
    }
    if !BRANCH_TYPES.contains(&payload.branch_type.as_str()) {
        return Err(ApiError::validation_error(
            "branch_type must be 'school' or 'healthcare_center'",
            None,
        ));
    }

    let password_hash = hash_password(&payload.password).await?;

    let pool = DatabaseManager::pool().await?;
    let branch = sqlx::query_as::<_, Branch>(
        "INSERT INTO branches (branch_name, branch_location, branch_type, username, password_hash) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(payload.branch_name.trim())
    .bind(payload.branch_location.trim())
    .bind(&payload.branch_type)
    .bind(payload.username.trim())
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({ "success": true, "data": branch })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBranchRequest {
    pub branch_name: Option<String>,
    pub branch_location: Option<String>,
    pub branch_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// PUT /api/branches/:id
pub async fn update(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBranchRequest>,
) -> Result<Json<Value>, ApiError> {
    require_access(&principal, None, ResourceOp::BranchAdmin, "Only main manager can manage branches")?;

    db::find_branch_by_id(id).await?.ok_or_else(|| ApiError::not_found("Branch not found"))?;

    if let Some(branch_type) = &payload.branch_type {
        if !BRANCH_TYPES.contains(&branch_type.as_str()) {
            return Err(ApiError::validation_error(
                "branch_type must be 'school' or 'healthcare_center'",
                None,
            ));
        }
    }

    let mut builder = UpdateBuilder::new("branches");
    builder.set_if("branch_name", payload.branch_name);
    builder.set_if("branch_location", payload.branch_location);
    builder.set_if("branch_type", payload.branch_type);
    builder.set_if("username", payload.username);
    if let Some(password) = &payload.password {
        builder.set("password_hash", hash_password(password).await?);
    }
    builder.set_if("is_active", payload.is_active);

    if builder.is_empty() {
        return Err(ApiError::validation_error("No fields to update", None));
    }
    builder.set_raw("updated_at = CURRENT_TIMESTAMP");

    let pool = DatabaseManager::pool().await?;
    let mut qb = builder.where_id(id, "*");
    let branch = qb.build_query_as::<Branch>().fetch_one(&pool).await?;

    Ok(Json(json!({ "success": true, "data": branch })))
}

/// DELETE /api/branches/:id - soft delete; employees and documents under the
/// branch become unreachable through scoped reads but are preserved
pub async fn delete(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    require_access(&principal, None, ResourceOp::BranchAdmin, "Only main manager can manage branches")?;

    db::find_branch_by_id(id).await?.ok_or_else(|| ApiError::not_found("Branch not found"))?;

    let pool = DatabaseManager::pool().await?;
    sqlx::query("UPDATE branches SET is_active = false, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "success": true, "message": "Branch deactivated" })))
}
