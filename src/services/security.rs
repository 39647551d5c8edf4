use std::str::FromStr;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::user::UserRole;

/// Claims carried by identity provider session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Username of the session owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Older tokens put the username here instead of `sub`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub exp: i64,
    /// "access" for API tokens; anything else is refused
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Project role as of token issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, alias = "isAdmin", skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl SessionClaims {
    /// Username the token was issued for, if any
    pub fn subject(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .or(self.username.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Role the token itself vouches for; the admin flag outranks `role`
    pub fn claimed_role(&self) -> Option<UserRole> {
        if self.is_admin == Some(true) {
            return Some(UserRole::Admin);
        }
        self.role
            .as_deref()
            .and_then(|role| UserRole::from_str(role).ok())
    }

    pub fn is_access_token(&self) -> bool {
        match self.token_type.as_deref() {
            None => true,
            Some(t) => t == "access",
        }
    }
}

/// Verify an HS256 session token issued by the identity provider
pub fn decode_session_token(token: &str, secret: &str) -> Result<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    // Audience is chosen by the identity provider and not checked here
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation.required_spec_claims.insert("exp".to_string());

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    if !data.claims.is_access_token() {
        return Err(AppError::Unauthorized(
            "Invalid token type. Access token required.".to_string(),
        ));
    }

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn exp() -> i64 {
        Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_decodes_subject() {
        let t = token(serde_json::json!({"sub": "ali", "exp": exp(), "type": "access"}));
        let claims = decode_session_token(&t, SECRET).unwrap();
        assert_eq!(claims.subject(), Some("ali"));
    }

    #[test]
    fn test_falls_back_to_username_claim() {
        let t = token(serde_json::json!({"username": "vusal", "exp": exp()}));
        let claims = decode_session_token(&t, SECRET).unwrap();
        assert_eq!(claims.subject(), Some("vusal"));
    }

    #[test]
    fn test_rejects_refresh_token() {
        let t = token(serde_json::json!({"sub": "ali", "exp": exp(), "type": "refresh"}));
        let err = decode_session_token(&t, SECRET).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let t = token(serde_json::json!({"sub": "ali", "exp": exp()}));
        let err = decode_session_token(&t, "other-secret").unwrap_err();
        assert!(matches!(err, AppError::Jwt(_)));
    }

    #[test]
    fn test_rejects_expired_token() {
        let t = token(serde_json::json!({"sub": "ali", "exp": Utc::now().timestamp() - 3600}));
        assert!(decode_session_token(&t, SECRET).is_err());
    }

    #[test]
    fn test_claimed_role() {
        let t = token(serde_json::json!({"sub": "ali", "exp": exp(), "role": "MANAGER"}));
        let claims = decode_session_token(&t, SECRET).unwrap();
        assert_eq!(claims.claimed_role(), Some(UserRole::Manager));

        let t = token(serde_json::json!({"sub": "ali", "exp": exp(), "role": "MANAGER", "is_admin": true}));
        let claims = decode_session_token(&t, SECRET).unwrap();
        assert_eq!(claims.claimed_role(), Some(UserRole::Admin));

        let t = token(serde_json::json!({"sub": "ali", "exp": exp(), "role": "JANITOR"}));
        let claims = decode_session_token(&t, SECRET).unwrap();
        assert_eq!(claims.claimed_role(), None);
    }

    #[test]
    fn test_missing_subject_is_none() {
        let t = token(serde_json::json!({"exp": exp()}));
        let claims = decode_session_token(&t, SECRET).unwrap();
        assert_eq!(claims.subject(), None);
    }
}
