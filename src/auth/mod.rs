use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;

pub mod access;
pub mod principal;

pub use access::{can_access, BranchScope, Decision, ResourceOp};
pub use principal::Principal;

/// JWT claims carried by a session token: {principal id, username, role,
/// branch scope}. The wire format keeps the role as a string so tokens stay
/// readable; normalization into [`Principal`] happens on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub username: String,
    pub role: String,
    pub branch_id: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: i32, username: String, role: String, branch_id: Option<i32>) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self { sub, username, role, branch_id, exp, iat: now.timestamp() }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate a JWT token and extract claims. Expiry is enforced by the default
/// validation.
pub fn validate_jwt(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid JWT token: {}", e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_claims() {
        let claims = Claims::new(7, "north-school".into(), "branch_manager".into(), Some(7));
        let token = generate_jwt(&claims).expect("generate");
        let decoded = validate_jwt(&token).expect("validate");
        assert_eq!(decoded.sub, 7);
        assert_eq!(decoded.role, "branch_manager");
        assert_eq!(decoded.branch_id, Some(7));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let claims = Claims::new(1, "admin".into(), "main_manager".into(), None);
        let mut token = generate_jwt(&claims).expect("generate");
        token.push('x');
        assert!(validate_jwt(&token).is_err());
    }
}
