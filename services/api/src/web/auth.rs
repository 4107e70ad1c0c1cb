//! services/api/src/web/auth.rs
//!
//! Password hashing and the token endpoints: staff sign in by username or
//! email, clients by the credentials stored on their job.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use job_ledger_core::domain::{NewUser, Role, UserCredentials};
use job_ledger_core::ports::{DatabaseService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AdminBootstrap;
use crate::error::{ApiError, ApiResult};
use crate::web::middleware::Principal;
use crate::web::rest::{ok, ApiJson, ApiResponse};
use crate::web::schema::UserResponse;
use crate::web::state::AppState;
use crate::web::token;

const MIN_PASSWORD_LEN: usize = 8;

/// Verified against when an account is not found, so unknown and known
/// accounts cost the same argon2 work. Uses the default argon2 parameters.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$KirUUeFdDz5ACHuePlFUfA$l5Fsp+ubDzZcYSRfaIH9s9EGXF352WhB2iFZO8Q5pfs";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct UsernameLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct EmailLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    /// Set for staff tokens.
    pub user: Option<UserResponse>,
    /// Set for client tokens.
    pub job_id: Option<Uuid>,
}

//=========================================================================================
// Password Hashing
//=========================================================================================

pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

/// False on a wrong password and on an unparsable stored hash.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Failed to parse password hash: {:?}", e);
            false
        }
    }
}

pub fn validate_new_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Unknown accounts and wrong passwords look the same to the caller.
fn check_staff_login(
    found: PortResult<UserCredentials>,
    password: &str,
) -> ApiResult<UserCredentials> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let creds = match found {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => {
            verify_password(password, DUMMY_HASH);
            return Err(invalid());
        }
        Err(e) => return Err(e.into()),
    };
    if !verify_password(password, &creds.hashed_password) {
        return Err(invalid());
    }
    Ok(creds)
}

fn staff_token(state: &AppState, creds: UserCredentials) -> ApiResult<TokenResponse> {
    let principal = Principal::Staff {
        user_id: creds.user.id,
        role: creds.user.role,
    };
    let (access_token, expires_in) = token::issue(
        &principal,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;
    info!("Issued {} token for user {}", creds.user.role, creds.user.id);
    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in,
        user: Some(creds.user.into()),
        job_id: None,
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/token - Staff sign-in by username
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = UsernameLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn token_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<UsernameLoginRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let found = state.db.get_credentials_by_username(req.username.trim()).await;
    let creds = check_staff_login(found, &req.password)?;
    Ok(ok("Signed in", staff_token(&state, creds)?))
}

/// POST /auth/token/email - Staff sign-in by email
#[utoipa::path(
    post,
    path = "/auth/token/email",
    request_body = EmailLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn email_token_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EmailLoginRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let found = state.db.get_credentials_by_email(req.email.trim()).await;
    let creds = check_staff_login(found, &req.password)?;
    Ok(ok("Signed in", staff_token(&state, creds)?))
}

/// POST /auth/client - Client sign-in with the job's client credentials
#[utoipa::path(
    post,
    path = "/auth/client",
    request_body = EmailLoginRequest,
    responses(
        (status = 200, description = "Token scoped to the client's job", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn client_token_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EmailLoginRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let creds = match state.db.get_client_credentials(req.email.trim()).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => {
            verify_password(&req.password, DUMMY_HASH);
            return Err(invalid());
        }
        Err(e) => return Err(e.into()),
    };
    if !verify_password(&req.password, &creds.hashed_password) {
        return Err(invalid());
    }

    let principal = Principal::Client {
        job_id: creds.job_id,
    };
    let (access_token, expires_in) = token::issue(
        &principal,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;
    info!("Issued client token for job {}", creds.job_id);
    Ok(ok(
        "Signed in",
        TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: None,
            job_id: Some(creds.job_id),
        },
    ))
}

//=========================================================================================
// Startup
//=========================================================================================

/// Creates the configured administrator unless an account with that email exists.
pub async fn bootstrap_admin(db: &dyn DatabaseService, admin: &AdminBootstrap) -> ApiResult<()> {
    match db.get_credentials_by_email(&admin.email).await {
        Ok(existing) => {
            if existing.user.role != Role::Admin {
                warn!(
                    "Bootstrap email {} belongs to a non-admin account; leaving it unchanged",
                    admin.email
                );
            }
            return Ok(());
        }
        Err(PortError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    validate_new_password(&admin.password)?;
    let user = db
        .create_user(NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Admin,
            hashed_password: hash_password(&admin.password)?,
        })
        .await?;
    info!("Created administrator account {} ({})", user.username, user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_new_password("short").is_err());
        assert!(validate_new_password("long enough").is_ok());
    }

    #[test]
    fn unknown_account_still_runs_argon2() {
        assert!(PasswordHash::new(DUMMY_HASH).is_ok());
        assert!(!verify_password("password123", DUMMY_HASH));
        let outcome = check_staff_login(
            Err(PortError::NotFound("User nobody not found".to_string())),
            "password123",
        );
        assert!(matches!(outcome, Err(ApiError::Unauthorized(_))));
    }
}
