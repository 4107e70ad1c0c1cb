//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes, and the `Principal` it
//! hands to handlers.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use job_ledger_core::domain::Role;
use job_ledger_core::ports::PortError;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::state::AppState;
use crate::web::token;

/// Who is calling. Staff sign in with a user account; a client signs in with
/// the credentials stored on their job and only ever sees that job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Staff { user_id: Uuid, role: Role },
    Client { job_id: Uuid },
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Staff { role: Role::Admin, .. })
    }

    /// The staff user id, or 403 for a client.
    pub fn require_staff(&self) -> ApiResult<Uuid> {
        match self {
            Principal::Staff { user_id, .. } => Ok(*user_id),
            Principal::Client { .. } => Err(ApiError::forbidden("Staff access required")),
        }
    }

    /// The administrator's user id, or 403.
    pub fn require_admin(&self) -> ApiResult<Uuid> {
        match self {
            Principal::Staff {
                user_id,
                role: Role::Admin,
            } => Ok(*user_id),
            _ => Err(ApiError::forbidden("Administrator access required")),
        }
    }

    /// The job a client token is scoped to, or 403 for staff.
    pub fn require_client(&self) -> ApiResult<Uuid> {
        match self {
            Principal::Client { job_id } => Ok(*job_id),
            Principal::Staff { .. } => Err(ApiError::forbidden("Client access required")),
        }
    }

    /// Administrators may act on anyone; developers only on themselves.
    pub fn require_self_or_admin(&self, user_id: Uuid) -> ApiResult<()> {
        match self {
            Principal::Staff { role: Role::Admin, .. } => Ok(()),
            Principal::Staff { user_id: own, .. } if *own == user_id => Ok(()),
            _ => Err(ApiError::forbidden(
                "You can only access your own records",
            )),
        }
    }
}

/// Middleware that validates the bearer token and resolves the caller.
///
/// The token's subject must still exist: a deleted user or job makes the
/// token useless even before it expires. On success the `Principal` is
/// inserted into the request extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    // 2. Verify signature, issuer and expiry
    let claimed = token::verify(token, &state.config.jwt_secret)?;

    // 3. Resolve the subject against the store
    let principal = match claimed {
        Principal::Staff { user_id, .. } => {
            let user = state.db.get_user(user_id).await.map_err(|e| match e {
                PortError::NotFound(_) => {
                    warn!("Token presented for unknown user {}", user_id);
                    ApiError::Unauthorized("Unknown user".to_string())
                }
                other => ApiError::Port(other),
            })?;
            Principal::Staff {
                user_id: user.id,
                role: user.role,
            }
        }
        Principal::Client { job_id } => {
            state.db.get_job(job_id).await.map_err(|e| match e {
                PortError::NotFound(_) => ApiError::Unauthorized("Unknown job".to_string()),
                other => ApiError::Port(other),
            })?;
            Principal::Client { job_id }
        }
    };

    // 4. Hand the caller to the handler
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_checks() {
        let admin = Principal::Staff {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        let dev_id = Uuid::new_v4();
        let dev = Principal::Staff {
            user_id: dev_id,
            role: Role::Developer,
        };
        let client = Principal::Client {
            job_id: Uuid::new_v4(),
        };

        assert!(admin.require_admin().is_ok());
        assert!(dev.require_admin().is_err());
        assert!(client.require_staff().is_err());
        assert!(client.require_client().is_ok());
        assert!(dev.require_self_or_admin(dev_id).is_ok());
        assert!(dev.require_self_or_admin(Uuid::new_v4()).is_err());
        assert!(admin.require_self_or_admin(dev_id).is_ok());
    }
}
