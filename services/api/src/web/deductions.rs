//! services/api/src/web/deductions.rs
//!
//! Developer balances and the administrator-initiated deductions against them.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use job_ledger_core::domain::{DeductionFilter, DeductionLog, TaskFilter};
use job_ledger_core::payment::developer_balance;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::Principal;
use crate::web::rest::{created, ok, today, ApiJson, ApiResponse};
use crate::web::schema::{BalanceResponse, DeductionListQuery, DeductionRequest, DeductionResponse};
use crate::web::state::AppState;

/// Parses a `YYYY-MM` month filter.
fn parse_month(raw: &str) -> ApiResult<(i32, u32)> {
    let invalid = || ApiError::Validation(format!("Invalid month '{}'; expected YYYY-MM", raw));
    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

fn to_responses(logs: Vec<DeductionLog>) -> Vec<DeductionResponse> {
    logs.into_iter().map(DeductionResponse::from).collect()
}

/// POST /developers/{id}/deductions - Deduct from a developer's balance
#[utoipa::path(
    post,
    path = "/developers/{id}/deductions",
    params(("id" = Uuid, Path, description = "Developer id")),
    request_body = DeductionRequest,
    responses(
        (status = 201, description = "Deduction recorded", body = DeductionResponse),
        (status = 400, description = "Amount not positive or above the balance"),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "Developer not found")
    ),
    security(("bearer" = []))
)]
pub async fn deduct_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(developer_id): Path<Uuid>,
    ApiJson(req): ApiJson<DeductionRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<DeductionResponse>>)> {
    let admin_id = principal.require_admin()?;
    state.db.get_user(developer_id).await?;
    let log = state
        .db
        .deduct_balance(developer_id, admin_id, req.amount, Utc::now())
        .await?;
    info!(
        "Administrator {} deducted {} from developer {}",
        admin_id, log.amount, developer_id
    );
    Ok(created("Deduction recorded", DeductionResponse::from(log)))
}

/// GET /developers/{id}/deductions - Deductions made against one developer
#[utoipa::path(
    get,
    path = "/developers/{id}/deductions",
    params(("id" = Uuid, Path, description = "Developer id")),
    responses(
        (status = 200, description = "Deductions, newest first", body = [DeductionResponse]),
        (status = 403, description = "Not your own record"),
        (status = 404, description = "Developer not found")
    ),
    security(("bearer" = []))
)]
pub async fn developer_deductions_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(developer_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<DeductionResponse>>>> {
    principal.require_self_or_admin(developer_id)?;
    state.db.get_user(developer_id).await?;
    let filter = DeductionFilter {
        developer_id: Some(developer_id),
        month: None,
    };
    let logs = state.db.list_deductions(&filter).await?;
    Ok(ok("OK", to_responses(logs)))
}

/// GET /developers/{id}/balance - Money earned from paid tasks
#[utoipa::path(
    get,
    path = "/developers/{id}/balance",
    params(("id" = Uuid, Path, description = "Developer id")),
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse),
        (status = 403, description = "Not your own record"),
        (status = 404, description = "Developer not found")
    ),
    security(("bearer" = []))
)]
pub async fn balance_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(developer_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<BalanceResponse>>> {
    principal.require_self_or_admin(developer_id)?;
    state.db.get_user(developer_id).await?;
    let tasks = state
        .db
        .list_tasks(&TaskFilter::for_assignee(developer_id, today()))
        .await?;
    Ok(ok(
        "OK",
        BalanceResponse {
            developer_id,
            balance: developer_balance(&tasks, developer_id),
        },
    ))
}

/// GET /deductions - Deduction history across developers
#[utoipa::path(
    get,
    path = "/deductions",
    params(DeductionListQuery),
    responses(
        (status = 200, description = "Deductions, newest first", body = [DeductionResponse]),
        (status = 400, description = "Malformed month"),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer" = []))
)]
pub async fn list_deductions_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<DeductionListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<DeductionResponse>>>> {
    principal.require_admin()?;
    let month = query
        .month
        .as_deref()
        .filter(|m| !m.is_empty())
        .map(parse_month)
        .transpose()?;
    let filter = DeductionFilter {
        developer_id: query.developer,
        month,
    };
    let logs = state.db.list_deductions(&filter).await?;
    Ok(ok("OK", to_responses(logs)))
}
