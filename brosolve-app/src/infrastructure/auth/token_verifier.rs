//! Bearer credential verification.
//!
//! Tokens are issued elsewhere (the identity provider); this side only checks
//! the HS256 signature, expiry and optional issuer/audience, and hands back
//! the subject as the voter id.

use brosolve_errors::AppError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id of the caller
    pub sub: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &[u8], issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Resolves a bearer token to the voter id it was issued for.
    pub fn verify(&self, token: &str) -> Result<String, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthenticated("missing token".to_string()));
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired".to_string(),
                ErrorKind::InvalidSignature => "bad signature".to_string(),
                _ => format!("invalid token: {}", e),
            };
            tracing::debug!("Rejected bearer token: {}", reason);
            AppError::Unauthenticated(reason)
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AppError::Unauthenticated("token has no subject".to_string()));
        }
        Ok(data.claims.sub)
    }

    /// A missing credential is `Unauthenticated`, same as a bad one.
    pub fn require(&self, token: Option<&str>) -> Result<String, AppError> {
        match token {
            Some(token) => self.verify(token),
            None => Err(AppError::Unauthenticated("missing token".to_string())),
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
