use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row in the `branches` table. A branch doubles as a login principal: its
/// `username`/`password_hash` authenticate a branch-manager session scoped to
/// the branch's own id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Branch {
    pub id: i32,
    pub branch_name: String,
    pub branch_location: String,
    /// "school" or "healthcare_center"
    pub branch_type: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
