//! Multipart form parsing for document upload and replacement.

use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::NaiveDate;

use crate::error::ApiError;
use crate::services::document_service::IncomingFile;

/// A parsed document form: at most one file part plus text fields
pub struct DocumentForm {
    pub file: Option<IncomingFile>,
    pub fields: HashMap<String, String>,
}

impl DocumentForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn require_i32(&self, name: &str) -> Result<i32, ApiError> {
        self.field(name)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ApiError::validation_error(format!("{} is required", name), None))
    }

    pub fn require_str(&self, name: &str) -> Result<&str, ApiError> {
        match self.field(name) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ApiError::validation_error(format!("{} is required", name), None)),
        }
    }

    /// Presence-tracked expiry date: absent means untouched, an empty string
    /// clears the date, a value must parse as YYYY-MM-DD
    pub fn expiry_date(&self) -> Result<Option<Option<NaiveDate>>, ApiError> {
        match self.field("expiry_date") {
            None => Ok(None),
            Some("") => Ok(Some(None)),
            Some(raw) => {
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    let mut fields = HashMap::new();
                    fields.insert(
                        "expiry_date".to_string(),
                        "Expected YYYY-MM-DD".to_string(),
                    );
                    ApiError::validation_error("Invalid expiry_date", Some(fields))
                })?;
                Ok(Some(Some(date)))
            }
        }
    }

    /// Presence-tracked description: absent means untouched, empty clears
    pub fn description(&self) -> Option<Option<String>> {
        match self.field("description") {
            None => None,
            Some("") => Some(None),
            Some(v) => Some(Some(v.to_string())),
        }
    }
}

/// Drain a multipart body into a [`DocumentForm`]. The file part is buffered
/// in full; the router's body limit bounds how much that can be.
pub async fn parse_document_form(mut multipart: Multipart) -> Result<DocumentForm, ApiError> {
    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let mime_type =
                field.content_type().unwrap_or("application/octet-stream").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file part: {}", e)))?
                .to_vec();
            file = Some(IncomingFile { original_name, mime_type, bytes });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read field {}: {}", name, e)))?;
            fields.insert(name, value);
        }
    }

    Ok(DocumentForm { file, fields })
}
