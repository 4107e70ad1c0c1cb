//! services/api/src/web/token.rs
//!
//! HS256 bearer tokens. Staff tokens carry the user id and role; client
//! tokens carry the job they are scoped to.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use job_ledger_core::domain::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MAX_TOKEN_TTL_HOURS;
use crate::error::{ApiError, ApiResult};
use crate::web::middleware::Principal;

/// Issuer written into and required of every token.
pub const TOKEN_ISSUER: &str = "job-ledger";

const CLIENT_ROLE: &str = "client";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id, or job id for clients)
    pub sub: String,
    /// "admin", "developer" or "client"
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    pub iss: String,
}

impl Claims {
    fn for_principal(principal: &Principal, ttl_hours: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(ttl_hours);
        let (sub, role, job_id) = match principal {
            Principal::Staff { user_id, role } => {
                (user_id.to_string(), role.as_str().to_string(), None)
            }
            Principal::Client { job_id } => {
                (job_id.to_string(), CLIENT_ROLE.to_string(), Some(*job_id))
            }
        };
        Self {
            sub,
            role,
            job_id,
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
            iss: TOKEN_ISSUER.to_string(),
        }
    }

    fn into_principal(self) -> ApiResult<Principal> {
        let invalid = || ApiError::Unauthorized("Invalid token".to_string());
        if self.role == CLIENT_ROLE {
            let job_id = self.job_id.ok_or_else(invalid)?;
            return Ok(Principal::Client { job_id });
        }
        let user_id = Uuid::parse_str(&self.sub).map_err(|_| invalid())?;
        let role = self.role.parse::<Role>().map_err(|_| invalid())?;
        Ok(Principal::Staff { user_id, role })
    }
}

/// Signs a token for the principal. Returns the token and its lifetime in seconds.
pub fn issue(principal: &Principal, secret: &str, ttl_hours: i64) -> ApiResult<(String, i64)> {
    let ttl_hours = ttl_hours.clamp(-MAX_TOKEN_TTL_HOURS, MAX_TOKEN_TTL_HOURS);
    let claims = Claims::for_principal(principal, ttl_hours);
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("JWT encoding error: {}", e)))?;
    Ok((token, Duration::hours(ttl_hours).num_seconds()))
}

/// Checks signature, issuer and expiry, and returns the principal the token names.
pub fn verify(token: &str, secret: &str) -> ApiResult<Principal> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token has expired".to_string()),
        _ => ApiError::Unauthorized("Invalid token".to_string()),
    })?;
    data.claims.into_principal()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "an-adequately-long-test-secret-value!";

    #[test]
    fn staff_token_round_trips() {
        let principal = Principal::Staff {
            user_id: Uuid::new_v4(),
            role: Role::Developer,
        };
        let (token, expires_in) = issue(&principal, SECRET, 2).unwrap();
        assert_eq!(expires_in, 7200);
        assert_eq!(verify(&token, SECRET).unwrap(), principal);
    }

    #[test]
    fn client_token_keeps_job_scope() {
        let principal = Principal::Client {
            job_id: Uuid::new_v4(),
        };
        let (token, _) = issue(&principal, SECRET, 1).unwrap();
        assert_eq!(verify(&token, SECRET).unwrap(), principal);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let principal = Principal::Client {
            job_id: Uuid::new_v4(),
        };
        let (token, _) = issue(&principal, SECRET, 1).unwrap();
        assert!(matches!(
            verify(&token, "another-secret-of-sufficient-length!!"),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let principal = Principal::Staff {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        // Past the default 60s leeway.
        let (token, _) = issue(&principal, SECRET, -1).unwrap();
        match verify(&token, SECRET) {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, "Token has expired"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn oversized_lifetime_is_capped() {
        let principal = Principal::Staff {
            user_id: Uuid::new_v4(),
            role: Role::Developer,
        };
        let (token, expires_in) = issue(&principal, SECRET, i64::MAX).unwrap();
        assert_eq!(expires_in, MAX_TOKEN_TTL_HOURS * 3600);
        assert_eq!(verify(&token, SECRET).unwrap(), principal);
    }
}
