//! Blob storage for uploaded documents.
//!
//! Blobs are addressed by a canonical path relative to the storage root,
//! computed once at upload time and persisted on the document row. Reads
//! resolve exactly that stored path; nothing re-derives locations from
//! heuristics.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::config;
use crate::database::models::OwnerKind;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob missing: {0}")]
    BlobMissing(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// MIME types accepted for document uploads
pub const ALLOWED_MIME_TYPES: [&str; 5] =
    ["application/pdf", "image/jpeg", "image/jpg", "image/png", "image/gif"];

pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}

/// File extension recorded alongside the MIME type
pub fn extension_from_mime_type(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "application/pdf" => Some(".pdf"),
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        _ => None,
    }
}

/// Generate a unique stored filename from the client-supplied one.
/// Format: `{YYYYMMDD_HHMMSS}_{uuid8}_{sanitized_original}`. The random
/// component keeps concurrent uploads of the same name collision-free.
pub fn generate_file_name(original_name: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let token = Uuid::new_v4().simple().to_string()[..8].to_string();
    let sanitized: String = original_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{}_{}_{}", timestamp, token, sanitized)
}

/// Canonical blob path relative to the storage root, keyed by
/// (owner kind, owner id, document type, stored filename)
pub fn document_rel_path(
    kind: OwnerKind,
    owner_id: i32,
    document_type: &str,
    file_name: &str,
) -> String {
    format!(
        "uploads/documents/{}/{}/{}/{}",
        kind.path_segment(),
        owner_id,
        document_type,
        file_name
    )
}

/// Filesystem-backed blob store rooted at a configurable directory
#[derive(Debug, Clone)]
pub struct BlobStorage {
    root: PathBuf,
}

impl BlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config() -> Self {
        Self::new(&config::config().storage.root_dir)
    }

    /// Resolve a stored relative path against the root, rejecting traversal
    fn resolve(&self, rel_path: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(rel_path);
        if rel.is_absolute()
            || rel.components().any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(StorageError::InvalidPath(rel_path.to_string()));
        }
        Ok(self.root.join(rel))
    }

    /// Write a blob. The bytes land in a temp file next to the target and are
    /// renamed into place, so a crash mid-write never leaves a torn blob at
    /// the final path.
    pub async fn put(&self, rel_path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(rel_path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = target.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
        fs::write(&tmp, bytes).await?;
        match fs::rename(&tmp, &target).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Don't leave the temp file behind on a failed rename
                let _ = fs::remove_file(&tmp).await;
                Err(e.into())
            }
        }
    }

    pub async fn exists(&self, rel_path: &str) -> Result<bool, StorageError> {
        let target = self.resolve(rel_path)?;
        Ok(fs::try_exists(&target).await?)
    }

    /// Read a blob's bytes; a missing file is a [`StorageError::BlobMissing`]
    pub async fn read(&self, rel_path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(rel_path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::BlobMissing(rel_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob. Returns false when it was already gone.
    pub async fn delete(&self, rel_path: &str) -> Result<bool, StorageError> {
        let target = self.resolve(rel_path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
