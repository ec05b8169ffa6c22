//! Document lifecycle manager.
//!
//! Orchestrates upload validation, blob placement, replacement with
//! exclusive-type supersede, verification, soft deletion, and download for
//! both employee- and branch-owned documents. Every mutation consults the
//! access evaluator first; every error path that staged a blob cleans it up.

use chrono::NaiveDate;
use sqlx::QueryBuilder;
use tracing::warn;

use crate::auth::{can_access, Principal, ResourceOp};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::{document_columns, Document, OwnerKind};
use crate::database::service as db;
use crate::database::update::UpdateBuilder;
use crate::error::ApiError;
use crate::storage::{
    self, document_rel_path, extension_from_mime_type, generate_file_name, BlobStorage,
};

/// Document types accepted for employee documents. Branch document types are
/// free-form (the original system only ever used a handful, led by "license").
pub const EMPLOYEE_DOCUMENT_TYPES: [&str; 12] = [
    "id_or_residency",
    "employment_letter",
    "bank_iban",
    "primary_qualification",
    "employment_contract",
    "additional_courses",
    "passport",
    "professional_license",
    "experience_certificate",
    "classification",
    "speech_therapy_course",
    "physical_therapy_course",
];

pub fn is_valid_employee_document_type(document_type: &str) -> bool {
    EMPLOYEE_DOCUMENT_TYPES.contains(&document_type)
}

/// A file received from the client, buffered and bounded by the body limit
#[derive(Debug)]
pub struct IncomingFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    /// MIME and size validation shared by upload and replace. Runs before any
    /// blob is written, so failures here have nothing to clean up.
    fn validate(&self) -> Result<(), ApiError> {
        if !storage::is_allowed_mime_type(&self.mime_type) {
            return Err(ApiError::validation_error(
                "Invalid file type. Only PDF, JPEG, PNG, and GIF files are allowed.",
                None,
            ));
        }
        let max = config::config().storage.max_upload_bytes;
        if self.bytes.len() > max {
            return Err(ApiError::validation_error(
                format!("File size exceeds maximum limit of {}MB", max / (1024 * 1024)),
                None,
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct UploadRequest {
    pub owner_kind: OwnerKind,
    pub owner_id: i32,
    pub document_type: String,
    pub file: IncomingFile,
    pub description: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Metadata edits with per-field presence: `None` leaves the field untouched,
/// `Some(None)` clears it, `Some(Some(v))` sets it.
#[derive(Debug, Default)]
pub struct MetadataUpdate {
    pub description: Option<Option<String>>,
    pub expiry_date: Option<Option<NaiveDate>>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.expiry_date.is_none()
    }
}

#[derive(Debug, Default)]
pub struct DocumentFilters {
    pub owner_id: Option<i32>,
    pub document_type: Option<String>,
    pub mime_type: Option<String>,
    pub is_verified: Option<bool>,
    /// Filename substring search (ILIKE)
    pub search: Option<String>,
    /// Only documents expiring within this many days
    pub expiring_within_days: Option<i32>,
}

/// Resolve the branch that owns a document target; NotFound when the owner
/// row does not exist or is soft-deleted
async fn owner_branch_id(kind: OwnerKind, owner_id: i32) -> Result<i32, ApiError> {
    match kind {
        OwnerKind::Employee => {
            let employee = db::find_employee_by_id(owner_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Employee not found"))?;
            Ok(employee.branch_id)
        }
        OwnerKind::Branch => {
            let branch = db::find_branch_by_id(owner_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Branch not found"))?;
            Ok(branch.id)
        }
    }
}

/// Audit references may only point at users that still exist; otherwise the
/// reference is stored as null rather than failing the operation
async fn audit_user_id(principal: &Principal) -> Option<i32> {
    match db::user_id_exists(principal.id()).await {
        Ok(true) => Some(principal.id()),
        Ok(false) => {
            warn!(
                "Principal id {} not present in users table; storing null audit reference",
                principal.id()
            );
            None
        }
        Err(e) => {
            warn!("Failed to verify acting user: {}; storing null audit reference", e);
            None
        }
    }
}

pub async fn find_document(
    kind: OwnerKind,
    id: i32,
    include_inactive: bool,
) -> Result<Option<Document>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let mut sql = format!(
        "SELECT {} FROM {} WHERE id = $1",
        document_columns(kind),
        kind.table()
    );
    if !include_inactive {
        sql.push_str(" AND is_active = true");
    }

    let document = sqlx::query_as::<_, Document>(&sql).bind(id).fetch_optional(&pool).await?;
    Ok(document)
}

/// Fetch a document and authorize `op` against its owning branch
async fn fetch_authorized(
    kind: OwnerKind,
    id: i32,
    principal: &Principal,
    op: ResourceOp,
    include_inactive: bool,
) -> Result<Document, ApiError> {
    let document = find_document(kind, id, include_inactive)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    let branch_id = owner_branch_id(kind, document.owner_id).await?;
    if !can_access(principal, Some(branch_id), op).is_allowed() {
        return Err(ApiError::forbidden("Access denied"));
    }

    Ok(document)
}

pub async fn get_document(
    kind: OwnerKind,
    id: i32,
    include_inactive: bool,
    principal: &Principal,
) -> Result<Document, ApiError> {
    fetch_authorized(kind, id, principal, ResourceOp::DocumentRead, include_inactive).await
}

/// Scoped listing. A branch manager's result set is always restricted to
/// their own branch via a join on the owner table; this is the same scope the
/// point-access check enforces.
pub async fn list_documents(
    kind: OwnerKind,
    principal: &Principal,
    filters: &DocumentFilters,
) -> Result<Vec<Document>, ApiError> {
    // An explicit owner filter gets the owner's existence and scope checked up
    // front so a cross-branch probe distinguishes forbidden from empty
    if let Some(owner_id) = filters.owner_id {
        let branch_id = owner_branch_id(kind, owner_id).await?;
        if !can_access(principal, Some(branch_id), ResourceOp::DocumentRead).is_allowed() {
            return Err(ApiError::forbidden("Access denied"));
        }
    } else if kind == OwnerKind::Employee && principal.is_main_manager() {
        // Observed behavior: the unfiltered employee-document listing is
        // reserved for branch-scoped callers; a main manager gets an empty
        // set rather than the whole store
        return Ok(vec![]);
    }

    let pool = DatabaseManager::pool().await?;

    let (join, owner_alias) = match kind {
        OwnerKind::Employee => ("INNER JOIN employees o ON d.employee_id = o.id", "d.employee_id"),
        OwnerKind::Branch => ("INNER JOIN branches o ON d.branch_id = o.id", "d.branch_id"),
    };

    let columns = document_columns(kind)
        .split(", ")
        .map(|c| format!("d.{}", c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
        "SELECT {columns} FROM {} d {join} WHERE d.is_active = true AND o.is_active = true",
        kind.table()
    ));

    // Listing-time branch scoping; fails closed for branch managers
    match kind {
        OwnerKind::Employee => {
            if let Some(branch_id) = principal.branch_id() {
                qb.push(" AND o.branch_id = ").push_bind(branch_id);
            }
        }
        OwnerKind::Branch => {
            if let Some(branch_id) = principal.branch_id() {
                qb.push(" AND d.branch_id = ").push_bind(branch_id);
            }
        }
    }

    if let Some(owner_id) = filters.owner_id {
        qb.push(format!(" AND {owner_alias} = ")).push_bind(owner_id);
    }
    if let Some(document_type) = &filters.document_type {
        qb.push(" AND d.document_type = ").push_bind(document_type.clone());
    }
    if let Some(mime_type) = &filters.mime_type {
        qb.push(" AND d.mime_type = ").push_bind(mime_type.clone());
    }
    if let Some(is_verified) = filters.is_verified {
        qb.push(" AND d.is_verified = ").push_bind(is_verified);
    }
    if let Some(search) = &filters.search {
        qb.push(" AND d.file_name ILIKE ").push_bind(format!("%{}%", search));
    }
    if let Some(days) = filters.expiring_within_days {
        qb.push(" AND d.expiry_date IS NOT NULL AND d.expiry_date BETWEEN CURRENT_DATE AND CURRENT_DATE + ")
            .push_bind(days)
            .push(" * INTERVAL '1 day'");
    }

    qb.push(" ORDER BY d.uploaded_at DESC");

    Ok(qb.build_query_as::<Document>().fetch_all(&pool).await?)
}

/// Upload a new document: validate, place the blob at its canonical path,
/// insert the row. Validation happens before the blob is written; if the row
/// insert fails afterwards, the staged blob is removed.
pub async fn upload(principal: &Principal, request: UploadRequest) -> Result<Document, ApiError> {
    if request.document_type.is_empty() {
        return Err(ApiError::validation_error("document_type is required", None));
    }
    if request.owner_kind == OwnerKind::Employee
        && !is_valid_employee_document_type(&request.document_type)
    {
        return Err(ApiError::validation_error("Invalid document_type", None));
    }
    request.file.validate()?;

    // Owner existence (404) is checked before branch scope (403)
    let branch_id = owner_branch_id(request.owner_kind, request.owner_id).await?;
    if !can_access(principal, Some(branch_id), ResourceOp::DocumentWrite).is_allowed() {
        return Err(ApiError::forbidden(match request.owner_kind {
            OwnerKind::Employee => "You can only upload documents for employees in your branch",
            OwnerKind::Branch => "You can only upload documents for your branch",
        }));
    }

    let uploaded_by = audit_user_id(principal).await;

    let stored_name = generate_file_name(&request.file.original_name);
    let rel_path =
        document_rel_path(request.owner_kind, request.owner_id, &request.document_type, &stored_name);

    let blobs = BlobStorage::from_config();
    blobs.put(&rel_path, &request.file.bytes).await?;

    let insert = insert_document_row(&request, &rel_path, uploaded_by).await;
    match insert {
        Ok(document) => Ok(document),
        Err(e) => {
            // The blob was staged; remove it so no orphan survives the failure
            if let Err(cleanup_err) = blobs.delete(&rel_path).await {
                warn!("Failed to clean up staged blob {}: {}", rel_path, cleanup_err);
            }
            Err(e)
        }
    }
}

async fn insert_document_row(
    request: &UploadRequest,
    rel_path: &str,
    uploaded_by: Option<i32>,
) -> Result<Document, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let kind = request.owner_kind;

    let sql = format!(
        "INSERT INTO {} ({}, document_type, file_name, file_path, file_size, mime_type, \
         file_extension, description, expiry_date, uploaded_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
        kind.table(),
        kind.owner_column(),
        document_columns(kind)
    );

    let document = sqlx::query_as::<_, Document>(&sql)
        .bind(request.owner_id)
        .bind(&request.document_type)
        .bind(&request.file.original_name)
        .bind(rel_path)
        .bind(request.file.bytes.len() as i32)
        .bind(&request.file.mime_type)
        .bind(extension_from_mime_type(&request.file.mime_type))
        .bind(&request.description)
        .bind(request.expiry_date)
        .bind(uploaded_by)
        .fetch_one(&pool)
        .await?;

    Ok(document)
}

/// Replace a document's file and/or edit its metadata.
///
/// File replacement for exclusive document types deactivates every other
/// active sibling of the same (owner, type) inside the same transaction that
/// updates the row, so concurrent replacements cannot leave two active rows.
/// Ordering: new blob is written first, the transaction commits, and only
/// then is the old blob deleted.
pub async fn replace(
    kind: OwnerKind,
    id: i32,
    new_file: Option<IncomingFile>,
    metadata: MetadataUpdate,
    principal: &Principal,
) -> Result<Document, ApiError> {
    let document = fetch_authorized(kind, id, principal, ResourceOp::DocumentWrite, false).await?;

    let Some(file) = new_file else {
        if metadata.is_empty() {
            return Err(ApiError::validation_error("No fields to update", None));
        }
        return update_metadata_only(kind, &document, metadata).await;
    };

    file.validate()?;

    let stored_name = generate_file_name(&file.original_name);
    let new_rel_path =
        document_rel_path(kind, document.owner_id, &document.document_type, &stored_name);

    let blobs = BlobStorage::from_config();
    blobs.put(&new_rel_path, &file.bytes).await?;

    let result = commit_file_replacement(kind, &document, &file, &new_rel_path, &metadata).await;

    let updated = match result {
        Ok(updated) => updated,
        Err(e) => {
            if let Err(cleanup_err) = blobs.delete(&new_rel_path).await {
                warn!("Failed to clean up staged blob {}: {}", new_rel_path, cleanup_err);
            }
            return Err(e);
        }
    };

    // The row now points at the new blob; the old one is redundant. A failed
    // delete leaves an orphan blob for out-of-band cleanup, never a dangling row.
    if document.file_path != updated.file_path {
        if let Err(e) = blobs.delete(&document.file_path).await {
            warn!("Failed to delete replaced blob {}: {}", document.file_path, e);
        }
    }

    Ok(updated)
}

async fn commit_file_replacement(
    kind: OwnerKind,
    document: &Document,
    file: &IncomingFile,
    new_rel_path: &str,
    metadata: &MetadataUpdate,
) -> Result<Document, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await.map_err(ApiError::from_sqlx)?;

    if config::config().storage.is_exclusive_type(&document.document_type) {
        let sql = format!(
            "UPDATE {} SET is_active = false, updated_at = CURRENT_TIMESTAMP \
             WHERE {} = $1 AND document_type = $2 AND is_active = true AND id != $3",
            kind.table(),
            kind.owner_column()
        );
        sqlx::query(&sql)
            .bind(document.owner_id)
            .bind(&document.document_type)
            .bind(document.id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::from_sqlx)?;
    }

    let mut builder = UpdateBuilder::new(kind.table());
    builder
        .set("file_name", file.original_name.clone())
        .set("file_path", new_rel_path.to_string())
        .set("file_size", file.bytes.len() as i32)
        .set("mime_type", file.mime_type.clone())
        .set("file_extension", extension_from_mime_type(&file.mime_type).map(str::to_string));
    // Replacement does not re-verify; is_verified is left untouched and must
    // be re-asserted explicitly by a main manager
    if let Some(description) = metadata.description.clone() {
        builder.set("description", description);
    }
    if let Some(expiry_date) = metadata.expiry_date {
        builder.set("expiry_date", expiry_date);
    }
    builder.set_raw("updated_at = CURRENT_TIMESTAMP");

    // The active guard makes the row update a compare-and-swap: if another
    // replacement deactivated this row since it was fetched, zero rows match,
    // the transaction rolls back (restoring the siblings), and the staged
    // blob is cleaned up by the caller
    let mut qb = builder.where_active_id(document.id, &document_columns(kind));
    let updated = qb
        .build_query_as::<Document>()
        .fetch_optional(&mut *tx)
        .await
        .map_err(ApiError::from_sqlx)?
        .ok_or_else(|| ApiError::conflict("Document was replaced concurrently"))?;

    tx.commit().await.map_err(ApiError::from_sqlx)?;
    Ok(updated)
}

/// Metadata edits never touch the file or the verification state
async fn update_metadata_only(
    kind: OwnerKind,
    document: &Document,
    metadata: MetadataUpdate,
) -> Result<Document, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let mut builder = UpdateBuilder::new(kind.table());
    if let Some(description) = metadata.description {
        builder.set("description", description);
    }
    if let Some(expiry_date) = metadata.expiry_date {
        builder.set("expiry_date", expiry_date);
    }
    builder.set_raw("updated_at = CURRENT_TIMESTAMP");

    let mut qb = builder.where_id(document.id, &document_columns(kind));
    let updated = qb.build_query_as::<Document>().fetch_one(&pool).await?;
    Ok(updated)
}

/// Mark a document verified. Main manager only; idempotent - re-verifying
/// returns the row unchanged, preserving the original verified_by/verified_at.
pub async fn verify(kind: OwnerKind, id: i32, principal: &Principal) -> Result<Document, ApiError> {
    let document = find_document(kind, id, false)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    let branch_id = owner_branch_id(kind, document.owner_id).await?;
    if !can_access(principal, Some(branch_id), ResourceOp::DocumentVerify).is_allowed() {
        return Err(ApiError::forbidden("Only main manager can verify documents"));
    }

    if document.is_verified {
        return Ok(document);
    }

    let verified_by = audit_user_id(principal).await;

    let pool = DatabaseManager::pool().await?;
    let sql = format!(
        "UPDATE {} SET is_verified = true, verified_at = CURRENT_TIMESTAMP, verified_by = $1, \
         updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND is_verified = false RETURNING {}",
        kind.table(),
        document_columns(kind)
    );

    let updated = sqlx::query_as::<_, Document>(&sql)
        .bind(verified_by)
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    match updated {
        Some(document) => Ok(document),
        // A concurrent verify won the guarded update; return the settled row
        None => find_document(kind, id, false)
            .await?
            .ok_or_else(|| ApiError::not_found("Document not found")),
    }
}

/// Soft delete: the row survives with active=false for the audit trail. The
/// blob is purged only on explicit request.
pub async fn soft_delete(
    kind: OwnerKind,
    id: i32,
    purge_blob: bool,
    principal: &Principal,
) -> Result<Document, ApiError> {
    let document = fetch_authorized(kind, id, principal, ResourceOp::DocumentWrite, false).await?;

    let pool = DatabaseManager::pool().await?;
    let sql = format!(
        "UPDATE {} SET is_active = false, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING {}",
        kind.table(),
        document_columns(kind)
    );
    let deleted = sqlx::query_as::<_, Document>(&sql).bind(id).fetch_one(&pool).await?;

    if purge_blob {
        let blobs = BlobStorage::from_config();
        if let Err(e) = blobs.delete(&document.file_path).await {
            warn!("Failed to purge blob {} after soft delete: {}", document.file_path, e);
        }
    }

    Ok(deleted)
}

/// Resolve a document's blob for download. A missing blob behind an active
/// row is a consistency fault and surfaces as such.
pub async fn download(
    kind: OwnerKind,
    id: i32,
    principal: &Principal,
) -> Result<(Document, Vec<u8>), ApiError> {
    let document = fetch_authorized(kind, id, principal, ResourceOp::DocumentRead, false).await?;

    let blobs = BlobStorage::from_config();
    let bytes = blobs.read(&document.file_path).await?;

    Ok((document, bytes))
}
