//! services/api/src/web/confirmations.rs
//!
//! Administrator sign-off on completed tasks. Confirming a completed task is
//! what makes it paid; withdrawing the confirmation reverses `paid`.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use job_ledger_core::domain::TaskFilter;
use job_ledger_core::reports::{completed_with_confirmation, ConfirmationQueue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::Principal;
use crate::web::rest::{ok, today, ApiJson, ApiResponse};
use crate::web::schema::{
    BulkConfirmRequest, ConfirmationAction, ConfirmationListQuery, ConfirmationQueueResponse,
    ConfirmationRequest, TaskResponse,
};
use crate::web::state::AppState;

/// GET /confirmations - Completed tasks awaiting (or past) confirmation
#[utoipa::path(
    get,
    path = "/confirmations",
    params(ConfirmationListQuery),
    responses(
        (status = 200, description = "Confirmation queue", body = ConfirmationQueueResponse),
        (status = 400, description = "Unknown filter"),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer" = []))
)]
pub async fn list_confirmations_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ConfirmationListQuery>,
) -> ApiResult<Json<ApiResponse<ConfirmationQueueResponse>>> {
    principal.require_admin()?;
    let confirmed = match query.filter.as_deref() {
        None | Some("") | Some("pending") => false,
        Some("confirmed") => true,
        Some(other) => {
            return Err(ApiError::Validation(format!(
                "Unknown filter '{}'; expected pending or confirmed",
                other
            )))
        }
    };

    let today = today();
    let tasks = state.db.list_tasks(&TaskFilter::all(today)).await?;
    let titles: HashMap<Uuid, String> = state
        .db
        .list_jobs()
        .await?
        .into_iter()
        .map(|j| (j.id, j.title))
        .collect();

    let queue = ConfirmationQueue::build(&tasks, &titles);
    let selected = completed_with_confirmation(&tasks, confirmed);
    Ok(ok(
        "OK",
        ConfirmationQueueResponse::new(queue, TaskResponse::many(selected, today)),
    ))
}

/// POST /tasks/{id}/confirmation - Confirm or unconfirm one task
#[utoipa::path(
    post,
    path = "/tasks/{id}/confirmation",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = ConfirmationRequest,
    responses(
        (status = 200, description = "Confirmation updated", body = TaskResponse),
        (status = 400, description = "Task is not completed"),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer" = []))
)]
pub async fn confirmation_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    ApiJson(req): ApiJson<ConfirmationRequest>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    let admin_id = principal.require_admin()?;
    let (task, message) = match req.action {
        ConfirmationAction::Confirm => {
            let task = state.db.confirm_task(task_id, admin_id, Utc::now()).await?;
            info!("Administrator {} confirmed task {} (paid: {})", admin_id, task_id, task.paid);
            (task, "Task confirmed")
        }
        ConfirmationAction::Unconfirm => {
            let task = state.db.unconfirm_task(task_id).await?;
            info!("Administrator {} withdrew confirmation of task {}", admin_id, task_id);
            (task, "Task confirmation withdrawn")
        }
    };
    Ok(ok(message, TaskResponse::from_task(task, today())))
}

/// POST /confirmations/bulk - Confirm many completed tasks at once
///
/// Tasks that are unknown, incomplete or already confirmed are skipped.
#[utoipa::path(
    post,
    path = "/confirmations/bulk",
    request_body = BulkConfirmRequest,
    responses(
        (status = 200, description = "The tasks that were confirmed", body = [TaskResponse]),
        (status = 400, description = "No task ids given"),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer" = []))
)]
pub async fn bulk_confirm_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<BulkConfirmRequest>,
) -> ApiResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let admin_id = principal.require_admin()?;
    if req.task_ids.is_empty() {
        return Err(ApiError::Validation("No tasks selected".to_string()));
    }
    let confirmed = state
        .db
        .confirm_tasks(&req.task_ids, admin_id, Utc::now())
        .await?;
    info!(
        "Administrator {} confirmed {} of {} selected task(s)",
        admin_id,
        confirmed.len(),
        req.task_ids.len()
    );
    Ok(ok(
        format!("{} task(s) confirmed", confirmed.len()),
        TaskResponse::many(confirmed, today()),
    ))
}
