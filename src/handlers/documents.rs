//! Employee document endpoints: upload, listing, download, replacement,
//! verification, and soft delete. The lifecycle itself lives in
//! [`crate::services::document_service`]; these handlers translate HTTP.

use axum::{
    extract::{Multipart, Path, Query},
    http::header,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Principal;
use crate::database::models::{Document, OwnerKind};
use crate::error::ApiError;
use crate::services::document_service::{
    self, DocumentFilters, MetadataUpdate, UploadRequest,
};

use super::multipart::parse_document_form;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub employee_id: Option<i32>,
    pub document_type: Option<String>,
    pub mime_type: Option<String>,
    pub is_verified: Option<bool>,
    pub search: Option<String>,
    pub expiring_within_days: Option<i32>,
}

/// GET /api/documents
pub async fn list(
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let filters = DocumentFilters {
        owner_id: query.employee_id,
        document_type: query.document_type,
        mime_type: query.mime_type,
        is_verified: query.is_verified,
        search: query.search,
        expiring_within_days: query.expiring_within_days,
    };
    let documents = document_service::list_documents(OwnerKind::Employee, &principal, &filters).await?;

    Ok(Json(json!({ "success": true, "data": documents })))
}

#[derive(Debug, Deserialize)]
pub struct GetQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/documents/:id
pub async fn get(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Query(query): Query<GetQuery>,
) -> Result<Json<Value>, ApiError> {
    let document =
        document_service::get_document(OwnerKind::Employee, id, query.include_inactive, &principal)
            .await?;

    Ok(Json(json!({ "success": true, "data": document })))
}

/// POST /api/documents - multipart upload
pub async fn upload(
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = parse_document_form(multipart).await?;

    let employee_id = form.require_i32("employee_id")?;
    let document_type = form.require_str("document_type")?.to_string();
    let description = form.description().flatten();
    let expiry_date = form.expiry_date()?.flatten();
    let file = form
        .file
        .ok_or_else(|| ApiError::validation_error("file is required", None))?;

    let document = document_service::upload(
        &principal,
        UploadRequest {
            owner_kind: OwnerKind::Employee,
            owner_id: employee_id,
            document_type,
            file,
            description,
            expiry_date,
        },
    )
    .await?;

    Ok(Json(json!({ "success": true, "data": document })))
}

/// PUT /api/documents/:id - replace the file and/or edit metadata
pub async fn update(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = parse_document_form(multipart).await?;
    let metadata = MetadataUpdate {
        description: form.description(),
        expiry_date: form.expiry_date()?,
    };

    let document =
        document_service::replace(OwnerKind::Employee, id, form.file, metadata, &principal).await?;

    Ok(Json(json!({ "success": true, "data": document })))
}

/// POST /api/documents/:id/verify
pub async fn verify(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let document = document_service::verify(OwnerKind::Employee, id, &principal).await?;
    Ok(Json(json!({ "success": true, "data": document })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Also remove the blob from storage; the row is kept either way
    #[serde(default)]
    pub delete_file: bool,
}

/// DELETE /api/documents/:id
pub async fn delete(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<Value>, ApiError> {
    let document =
        document_service::soft_delete(OwnerKind::Employee, id, query.delete_file, &principal).await?;

    Ok(Json(json!({ "success": true, "data": document })))
}

/// GET /api/documents/:id/download
pub async fn download(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let (document, bytes) = document_service::download(OwnerKind::Employee, id, &principal).await?;
    Ok(file_response(&document, bytes))
}

/// Build an attachment response carrying the original filename
pub(super) fn file_response(document: &Document, bytes: Vec<u8>) -> Response {
    let filename: String = document
        .file_name
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();

    (
        [
            (header::CONTENT_TYPE, document.mime_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}
