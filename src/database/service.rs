//! Shared lookups against the record store.
//!
//! Credential lookups power the session issuer: users are checked first, then
//! branches (a branch record doubling as a branch-manager login). Lookups by
//! username return deactivated rows too, so login can distinguish a disabled
//! account from bad credentials; lookups by id see only active rows.

use sqlx::QueryBuilder;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Branch, Employee, User};

const USER_COLUMNS: &str = "id, username, password_hash, role, branch_id, full_name, email, \
                            is_active, created_at, updated_at, created_by";

pub async fn find_user_by_username(username: &str) -> Result<Option<User>, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(&pool)
    .await?;

    Ok(user)
}

pub async fn find_user_by_id(id: i32) -> Result<Option<User>, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = true"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    Ok(user)
}

/// Existence check without the is_active filter. Used to decide whether an
/// audit reference (uploaded_by/verified_by) can point at this id; a missing
/// user downgrades the reference to null instead of failing the operation.
pub async fn user_id_exists(id: i32) -> Result<bool, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let row: Option<(i32,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    Ok(row.is_some())
}

pub async fn find_branch_by_username(username: &str) -> Result<Option<Branch>, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let branch = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE username = $1")
    .bind(username)
    .fetch_optional(&pool)
    .await?;

    Ok(branch)
}

pub async fn find_branch_by_id(id: i32) -> Result<Option<Branch>, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let branch =
        sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = $1 AND is_active = true")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

    Ok(branch)
}

pub async fn find_employee_by_id(id: i32) -> Result<Option<Employee>, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let employee =
        sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1 AND is_active = true")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

    Ok(employee)
}

#[derive(Debug, Default)]
pub struct UserFilters {
    pub role: Option<String>,
    pub branch_id: Option<i32>,
    pub is_active: Option<bool>,
}

pub async fn list_users(filters: &UserFilters) -> Result<Vec<User>, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let mut qb: QueryBuilder<sqlx::Postgres> =
        QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1=1"));
    if let Some(role) = &filters.role {
        qb.push(" AND role = ").push_bind(role.clone());
    }
    if let Some(branch_id) = filters.branch_id {
        qb.push(" AND branch_id = ").push_bind(branch_id);
    }
    if let Some(is_active) = filters.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    qb.push(" ORDER BY created_at DESC");

    Ok(qb.build_query_as::<User>().fetch_all(&pool).await?)
}

#[derive(Debug, Default)]
pub struct BranchFilters {
    pub branch_type: Option<String>,
    pub is_active: Option<bool>,
    /// Point filter; listing-time scoping sets this for branch managers
    pub id: Option<i32>,
}

pub async fn list_branches(filters: &BranchFilters) -> Result<Vec<Branch>, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let mut qb: QueryBuilder<sqlx::Postgres> =
        QueryBuilder::new("SELECT * FROM branches WHERE 1=1");
    if let Some(branch_type) = &filters.branch_type {
        qb.push(" AND branch_type = ").push_bind(branch_type.clone());
    }
    if let Some(is_active) = filters.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(id) = filters.id {
        qb.push(" AND id = ").push_bind(id);
    }
    qb.push(" ORDER BY created_at DESC");

    Ok(qb.build_query_as::<Branch>().fetch_all(&pool).await?)
}

#[derive(Debug, Default)]
pub struct EmployeeFilters {
    /// Effective branch scope; None means all branches (main manager)
    pub branch_id: Option<i32>,
    pub occupation: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_employees(filters: &EmployeeFilters) -> Result<Vec<Employee>, DatabaseError> {
    let pool = DatabaseManager::pool().await?;

    let mut qb: QueryBuilder<sqlx::Postgres> =
        QueryBuilder::new("SELECT * FROM employees WHERE 1=1");
    if let Some(branch_id) = filters.branch_id {
        qb.push(" AND branch_id = ").push_bind(branch_id);
    }
    if let Some(occupation) = &filters.occupation {
        qb.push(" AND occupation = ").push_bind(occupation.clone());
    }
    if let Some(is_active) = filters.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    qb.push(" ORDER BY created_at DESC");

    Ok(qb.build_query_as::<Employee>().fetch_all(&pool).await?)
}
