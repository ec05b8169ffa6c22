use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::auth::{validate_jwt, Principal};
use crate::error::ApiError;

/// JWT authentication middleware: validates the bearer token, normalizes the
/// claims into a [`Principal`], and injects it into request extensions.
/// Handlers receive it via `Extension<Principal>`.
pub async fn jwt_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_jwt_from_headers(&headers).map_err(unauthorized)?;

    let claims = validate_jwt(&token).map_err(unauthorized)?;

    // Reject tokens whose role/branch combination violates the principal
    // invariants before any business logic runs
    let principal = Principal::from_claims(&claims).map_err(unauthorized)?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

fn unauthorized(msg: String) -> Response {
    let api_error = ApiError::unauthorized(msg);
    (
        StatusCode::from_u16(api_error.status_code()).unwrap_or(StatusCode::UNAUTHORIZED),
        Json(api_error.to_json()),
    )
        .into_response()
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| "Authentication required. Please provide a Bearer token.".to_string())?;

    let auth_str =
        auth_header.to_str().map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
