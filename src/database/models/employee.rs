use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row in the `employees` table.
///
/// `created_by`/`updated_by` store the owning branch id at the time of the
/// action, not a user id. Main-manager actions leave them null.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: i32,
    pub employee_id_number: String,
    pub branch_id: i32,
    pub first_name: String,
    pub second_name: String,
    pub third_name: String,
    pub fourth_name: String,
    pub occupation: String,
    pub nationality: String,
    /// Hijri dates are stored verbatim as text; no calendar conversion happens here
    pub date_of_birth_hijri: Option<String>,
    pub date_of_birth_gregorian: NaiveDate,
    pub id_or_residency_number: String,
    /// "citizen" or "resident"
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
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<i32>,
    pub updated_by: Option<i32>,
}
