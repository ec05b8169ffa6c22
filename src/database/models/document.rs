use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which table a document row lives in. Employee and branch documents are
/// structurally identical apart from the owner foreign key, so one model and
/// one lifecycle serve both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Employee,
    Branch,
}

impl OwnerKind {
    pub fn table(&self) -> &'static str {
        match self {
            OwnerKind::Employee => "employee_documents",
            OwnerKind::Branch => "branch_documents",
        }
    }

    pub fn owner_column(&self) -> &'static str {
        match self {
            OwnerKind::Employee => "employee_id",
            OwnerKind::Branch => "branch_id",
        }
    }

    /// Path segment under the documents directory
    pub fn path_segment(&self) -> &'static str {
        match self {
            OwnerKind::Employee => "employees",
            OwnerKind::Branch => "branches",
        }
    }
}

/// Row in `employee_documents` or `branch_documents`. Queries alias the owner
/// foreign key to `owner_id` so both tables map onto this struct.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: i32,
    pub owner_id: i32,
    pub document_type: String,
    /// Original client-supplied filename, used for Content-Disposition
    pub file_name: String,
    /// Canonical path relative to the storage root, fixed at upload time
    pub file_path: String,
    pub file_size: Option<i32>,
    pub mime_type: String,
    pub file_extension: Option<String>,
    pub description: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<i32>,
    pub is_active: bool,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

/// Column list for document selects, with the owner FK aliased to `owner_id`
pub fn document_columns(kind: OwnerKind) -> String {
    format!(
        "id, {} AS owner_id, document_type, file_name, file_path, file_size, mime_type, \
         file_extension, description, expiry_date, is_verified, verified_at, verified_by, \
         is_active, uploaded_at, uploaded_by, updated_at",
        kind.owner_column()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_kind_table_mapping() {
        assert_eq!(OwnerKind::Employee.table(), "employee_documents");
        assert_eq!(OwnerKind::Branch.table(), "branch_documents");
        assert_eq!(OwnerKind::Employee.owner_column(), "employee_id");
        assert_eq!(OwnerKind::Branch.owner_column(), "branch_id");
    }

    #[test]
    fn document_columns_alias_owner() {
        let cols = document_columns(OwnerKind::Branch);
        assert!(cols.contains("branch_id AS owner_id"));
    }
}
