//! services/api/src/web/users.rs
//!
//! The caller's own identity and administrator-managed staff accounts.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use job_ledger_core::domain::{NewUser, Role};
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::web::auth::{hash_password, validate_new_password};
use crate::web::middleware::Principal;
use crate::web::rest::{created, ok, ApiJson, ApiResponse};
use crate::web::schema::{CreateUserRequest, MeResponse, UserResponse};
use crate::web::state::AppState;

/// GET /me - Who the bearer token belongs to
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The caller", body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<MeResponse>>> {
    let me = match principal {
        Principal::Staff { user_id, role } => MeResponse {
            role: role.to_string(),
            user: Some(state.db.get_user(user_id).await?.into()),
            job: None,
        },
        Principal::Client { job_id } => MeResponse {
            role: "client".to_string(),
            user: None,
            job: Some(state.db.get_job(job_id).await?.into()),
        },
    };
    Ok(ok("OK", me))
}

/// GET /users - All staff accounts
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Staff accounts", body = [UserResponse]),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer" = []))
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<Vec<UserResponse>>>> {
    principal.require_admin()?;
    let users = state.db.list_users().await?;
    Ok(ok(
        "OK",
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

/// POST /users - Create a developer or administrator account
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator access required"),
        (status = 409, description = "Username or email already taken")
    ),
    security(("bearer" = []))
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let admin_id = principal.require_admin()?;

    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::Validation("Username must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("Email is not valid".to_string()));
    }
    validate_new_password(&req.password)?;
    let role = match req.role.as_deref() {
        None => Role::Developer,
        Some(raw) => raw.parse::<Role>()?,
    };

    let user = state
        .db
        .create_user(NewUser {
            username,
            email,
            first_name: req.first_name,
            last_name: req.last_name,
            role,
            hashed_password: hash_password(&req.password)?,
        })
        .await?;
    info!("Administrator {} created {} account {}", admin_id, user.role, user.id);
    Ok(created("User created", UserResponse::from(user)))
}
