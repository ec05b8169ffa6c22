//! Employee endpoints. Listing and writes are branch-scoped; hard scope rules
//! are branch transfer and delete, which are main manager only.

use axum::{
    extract::{Path, Query},
    response::Json,
    Extension,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{can_access, Principal, ResourceOp};
use crate::database::manager::DatabaseManager;
use crate::database::models::Employee;
use crate::database::service::{self as db, EmployeeFilters};
use crate::database::update::UpdateBuilder;
use crate::error::ApiError;

use super::require_access;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub branch_id: Option<i32>,
    pub occupation: Option<String>,
    pub is_active: Option<bool>,
}

/// GET /api/employees
pub async fn list(
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    // Branch managers are pinned to their own branch regardless of the filter;
    // the main manager may filter by any branch or none
    let effective_branch = match principal.branch_id() {
        Some(own) => {
            if let Some(requested) = query.branch_id {
                if requested != own {
                    return Err(ApiError::forbidden(
                        "You can only view employees in your branch",
                    ));
                }
            }
            Some(own)
        }
        None => query.branch_id,
    };

    let filters = EmployeeFilters {
        branch_id: effective_branch,
        occupation: query.occupation,
        is_active: query.is_active,
    };
    let employees = db::list_employees(&filters).await?;

    Ok(Json(json!({ "success": true, "data": employees })))
}

/// GET /api/employees/:id
pub async fn get(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let employee =
        db::find_employee_by_id(id).await?.ok_or_else(|| ApiError::not_found("Employee not found"))?;

    if !can_access(&principal, Some(employee.branch_id), ResourceOp::EmployeeRead).is_allowed() {
        return Err(ApiError::forbidden("You can only view employees in your branch"));
    }

    Ok(Json(json!({ "success": true, "data": employee })))
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub employee_id_number: String,
    pub branch_id: i32,
    pub first_name: String,
    pub second_name: String,
    pub third_name: String,
    pub fourth_name: String,
    pub occupation: String,
    pub nationality: String,
    pub date_of_birth_hijri: Option<String>,
    pub date_of_birth_gregorian: NaiveDate,
    pub id_or_residency_number: String,
    pub id_type: String,
    pub gender: String,
    pub id_expiry_date_hijri: Option<String>,
    pub id_expiry_date_gregorian: Option<NaiveDate>,
    pub religion: Option<String>,
    pub marital_status: Option<String>,
    pub educational_qualification: Option<String>,
    pub specialization: Option<String>,
    pub bank_iban: Option<String>,
    pub bank_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub contract_type: Option<String>,
    pub salary: Option<Decimal>,
}

/// POST /api/employees
pub async fn create(
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateEmployeeRequest>,
) -> Result<Json<Value>, ApiError> {
    if payload.employee_id_number.trim().is_empty()
        || payload.first_name.trim().is_empty()
        || payload.occupation.trim().is_empty()
        || payload.id_or_residency_number.trim().is_empty()
    {
        return Err(ApiError::validation_error(
            "employee_id_number, names, occupation, and id_or_residency_number are required",
            None,
        ));
    }
    if !["citizen", "resident"].contains(&payload.id_type.as_str()) {
        return Err(ApiError::validation_error("id_type must be 'citizen' or 'resident'", None));
    }

    // The target branch must exist before the scope check so a bad id is a
    // validation failure rather than a misleading 403
    db::find_branch_by_id(payload.branch_id)
        .await?
        .ok_or_else(|| ApiError::validation_error("Branch not found", None))?;

    if !can_access(&principal, Some(payload.branch_id), ResourceOp::EmployeeWrite).is_allowed() {
        return Err(ApiError::forbidden("You can only add employees to your branch"));
    }

    // Audit columns record the owning branch, null for main-manager actions
    let created_by = principal.branch_id();

    let pool = DatabaseManager::pool().await?;
    let employee = sqlx::query_as::<_, Employee>(
        "INSERT INTO employees (employee_id_number, branch_id, first_name, second_name, \
         third_name, fourth_name, occupation, nationality, date_of_birth_hijri, \
         date_of_birth_gregorian, id_or_residency_number, id_type, gender, \
         id_expiry_date_hijri, id_expiry_date_gregorian, religion, marital_status, \
         educational_qualification, specialization, bank_iban, bank_name, email, phone_number, \
         contract_type, salary, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
         $18, $19, $20, $21, $22, $23, $24, $25, $26) RETURNING *",
    )
    .bind(payload.employee_id_number.trim())
    .bind(payload.branch_id)
    .bind(payload.first_name.trim())
    .bind(payload.second_name.trim())
    .bind(payload.third_name.trim())
    .bind(payload.fourth_name.trim())
    .bind(payload.occupation.trim())
    .bind(payload.nationality.trim())
    .bind(&payload.date_of_birth_hijri)
    .bind(payload.date_of_birth_gregorian)
    .bind(payload.id_or_residency_number.trim())
    .bind(&payload.id_type)
    .bind(&payload.gender)
    .bind(&payload.id_expiry_date_hijri)
    .bind(payload.id_expiry_date_gregorian)
    .bind(&payload.religion)
    .bind(&payload.marital_status)
    .bind(&payload.educational_qualification)
    .bind(&payload.specialization)
    .bind(&payload.bank_iban)
    .bind(&payload.bank_name)
    .bind(&payload.email)
    .bind(&payload.phone_number)
    .bind(&payload.contract_type)
    .bind(payload.salary)
    .bind(created_by)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({ "success": true, "data": employee })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub employee_id_number: Option<String>,
    pub branch_id: Option<i32>,
    pub first_name: Option<String>,
    pub second_name: Option<String>,
    pub third_name: Option<String>,
    pub fourth_name: Option<String>,
    pub occupation: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth_hijri: Option<String>,
    pub date_of_birth_gregorian: Option<NaiveDate>,
    pub id_or_residency_number: Option<String>,
    pub id_type: Option<String>,
    pub gender: Option<String>,
    pub id_expiry_date_hijri: Option<String>,
    pub id_expiry_date_gregorian: Option<NaiveDate>,
    pub religion: Option<String>,
    pub marital_status: Option<String>,
    pub educational_qualification: Option<String>,
    pub specialization: Option<String>,
    pub bank_iban: Option<String>,
    pub bank_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub contract_type: Option<String>,
    pub salary: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// PUT /api/employees/:id
pub async fn update(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> Result<Json<Value>, ApiError> {
    // Deactivation through update carries the same ceiling as delete; without
    // this a branch manager could retire their own employees via PUT
    if payload.is_active.is_some() {
        require_access(
            &principal,
            None,
            ResourceOp::EmployeeDelete,
            "Only main manager can change employee active status",
        )?;
    }

    let employee =
        db::find_employee_by_id(id).await?.ok_or_else(|| ApiError::not_found("Employee not found"))?;

    if !can_access(&principal, Some(employee.branch_id), ResourceOp::EmployeeWrite).is_allowed() {
        return Err(ApiError::forbidden("You can only update employees in your branch"));
    }

    // Branch transfer is main manager only
    if let Some(new_branch) = payload.branch_id {
        if new_branch != employee.branch_id {
            if !principal.is_main_manager() {
                return Err(ApiError::forbidden(
                    "Only main manager can move employees between branches",
                ));
            }
            db::find_branch_by_id(new_branch)
                .await?
                .ok_or_else(|| ApiError::validation_error("Branch not found", None))?;
        }
    }

    if let Some(id_type) = &payload.id_type {
        if !["citizen", "resident"].contains(&id_type.as_str()) {
            return Err(ApiError::validation_error("id_type must be 'citizen' or 'resident'", None));
        }
    }

    let mut builder = UpdateBuilder::new("employees");
    builder.set_if("employee_id_number", payload.employee_id_number);
    builder.set_if("branch_id", payload.branch_id);
    builder.set_if("first_name", payload.first_name);
    builder.set_if("second_name", payload.second_name);
    builder.set_if("third_name", payload.third_name);
    builder.set_if("fourth_name", payload.fourth_name);
    builder.set_if("occupation", payload.occupation);
    builder.set_if("nationality", payload.nationality);
    builder.set_if("date_of_birth_hijri", payload.date_of_birth_hijri);
    builder.set_if("date_of_birth_gregorian", payload.date_of_birth_gregorian);
    builder.set_if("id_or_residency_number", payload.id_or_residency_number);
    builder.set_if("id_type", payload.id_type);
    builder.set_if("gender", payload.gender);
    builder.set_if("id_expiry_date_hijri", payload.id_expiry_date_hijri);
    builder.set_if("id_expiry_date_gregorian", payload.id_expiry_date_gregorian);
    builder.set_if("religion", payload.religion);
    builder.set_if("marital_status", payload.marital_status);
    builder.set_if("educational_qualification", payload.educational_qualification);
    builder.set_if("specialization", payload.specialization);
    builder.set_if("bank_iban", payload.bank_iban);
    builder.set_if("bank_name", payload.bank_name);
    builder.set_if("email", payload.email);
    builder.set_if("phone_number", payload.phone_number);
    builder.set_if("contract_type", payload.contract_type);
    builder.set_if("salary", payload.salary);
    builder.set_if("is_active", payload.is_active);

    if builder.is_empty() {
        return Err(ApiError::validation_error("No fields to update", None));
    }
    builder.set("updated_by", principal.branch_id());
    builder.set_raw("updated_at = CURRENT_TIMESTAMP");

    let pool = DatabaseManager::pool().await?;
    let mut qb = builder.where_id(id, "*");
    let employee = qb.build_query_as::<Employee>().fetch_one(&pool).await?;

    Ok(Json(json!({ "success": true, "data": employee })))
}

/// DELETE /api/employees/:id - soft delete, main manager only
pub async fn delete(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let employee =
        db::find_employee_by_id(id).await?.ok_or_else(|| ApiError::not_found("Employee not found"))?;

    require_access(
        &principal,
        Some(employee.branch_id),
        ResourceOp::EmployeeDelete,
        "Only main manager can delete employees",
    )?;

    let pool = DatabaseManager::pool().await?;
    sqlx::query(
        "UPDATE employees SET is_active = false, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
    )
    .bind(id)
    .execute(&pool)
    .await?;

    Ok(Json(json!({ "success": true, "message": "Employee deactivated" })))
}
