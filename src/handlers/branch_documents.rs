//! Branch document endpoints. Same lifecycle as employee documents with the
//! branch as owner; this is where exclusive types (licenses) matter most,
//! since a branch holds exactly one active license at a time.

use axum::{
    extract::{Multipart, Path, Query},
    response::{Json, Response},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Principal;
use crate::database::models::OwnerKind;
use crate::error::ApiError;
use crate::services::document_service::{
    self, DocumentFilters, MetadataUpdate, UploadRequest,
};

use super::documents::file_response;
use super::multipart::parse_document_form;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub branch_id: Option<i32>,
    pub document_type: Option<String>,
    pub mime_type: Option<String>,
    pub is_verified: Option<bool>,
    pub search: Option<String>,
    pub expiring_within_days: Option<i32>,
}

/// GET /api/branch-documents
pub async fn list(
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let filters = DocumentFilters {
        owner_id: query.branch_id,
        document_type: query.document_type,
        mime_type: query.mime_type,
        is_verified: query.is_verified,
        search: query.search,
        expiring_within_days: query.expiring_within_days,
    };
    let documents = document_service::list_documents(OwnerKind::Branch, &principal, &filters).await?;

    Ok(Json(json!({ "success": true, "data": documents })))
}

#[derive(Debug, Deserialize)]
pub struct GetQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/branch-documents/:id
pub async fn get(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Query(query): Query<GetQuery>,
) -> Result<Json<Value>, ApiError> {
    let document =
        document_service::get_document(OwnerKind::Branch, id, query.include_inactive, &principal)
            .await?;

    Ok(Json(json!({ "success": true, "data": document })))
}

/// POST /api/branch-documents - multipart upload
pub async fn upload(
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = parse_document_form(multipart).await?;

    let branch_id = form.require_i32("branch_id")?;
    let document_type = form.require_str("document_type")?.to_string();
    let description = form.description().flatten();
    let expiry_date = form.expiry_date()?.flatten();
    let file = form
        .file
        .ok_or_else(|| ApiError::validation_error("file is required", None))?;

    let document = document_service::upload(
        &principal,
        UploadRequest {
            owner_kind: OwnerKind::Branch,
            owner_id: branch_id,
            document_type,
            file,
            description,
            expiry_date,
        },
    )
    .await?;

    Ok(Json(json!({ "success": true, "data": document })))
}

/// PUT /api/branch-documents/:id - replacing an exclusive-type document (e.g.
/// a license) deactivates every other active document of that type for the
/// branch in the same transaction
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
        document_service::replace(OwnerKind::Branch, id, form.file, metadata, &principal).await?;

    Ok(Json(json!({ "success": true, "data": document })))
}

/// POST /api/branch-documents/:id/verify
pub async fn verify(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let document = document_service::verify(OwnerKind::Branch, id, &principal).await?;
    Ok(Json(json!({ "success": true, "data": document })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub delete_file: bool,
}

/// DELETE /api/branch-documents/:id
pub async fn delete(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<Value>, ApiError> {
    let document =
        document_service::soft_delete(OwnerKind::Branch, id, query.delete_file, &principal).await?;

    Ok(Json(json!({ "success": true, "data": document })))
}

/// GET /api/branch-documents/:id/download
pub async fn download(
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let (document, bytes) = document_service::download(OwnerKind::Branch, id, &principal).await?;
    Ok(file_response(&document, bytes))
}
