//! services/api/src/web/client.rs
//!
//! The client's view of their job: overall progress and the second-stage
//! review of tasks an administrator has confirmed.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use job_ledger_core::domain::{ClientDecision, TaskFilter};
use job_ledger_core::reports::{ClientOverview, ClientTaskView, JobSummary};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::Principal;
use crate::web::rest::{ok, today, ApiJson, ApiResponse};
use crate::web::schema::{
    ClientAction, ClientBulkReviewRequest, ClientProgressResponse, ClientReviewRequest,
    ClientTaskQuery, TaskResponse,
};
use crate::web::state::AppState;

/// GET /client/progress - Summary of the client's job
#[utoipa::path(
    get,
    path = "/client/progress",
    responses(
        (status = 200, description = "Job progress", body = ClientProgressResponse),
        (status = 403, description = "Client access required")
    ),
    security(("bearer" = []))
)]
pub async fn client_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<ClientProgressResponse>>> {
    let job_id = principal.require_client()?;
    let today = today();
    let job = state.db.get_job(job_id).await?;
    let tasks = state
        .db
        .list_tasks(&TaskFilter::for_job(job_id, today))
        .await?;

    let overview = ClientOverview::build(&tasks).into();
    let summary = JobSummary::build(job, &tasks, today).into();
    Ok(ok(
        "OK",
        ClientProgressResponse {
            summary,
            overview,
            tasks: TaskResponse::many(tasks, today),
        },
    ))
}

/// GET /client/tasks - Tasks of the client's job by review state
#[utoipa::path(
    get,
    path = "/client/tasks",
    params(ClientTaskQuery),
    responses(
        (status = 200, description = "Tasks", body = [TaskResponse]),
        (status = 400, description = "Unknown filter"),
        (status = 403, description = "Client access required")
    ),
    security(("bearer" = []))
)]
pub async fn client_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ClientTaskQuery>,
) -> ApiResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let job_id = principal.require_client()?;
    let view = match query.filter.as_deref() {
        None | Some("") | Some("pending") => ClientTaskView::Pending,
        Some("confirmed") => ClientTaskView::Confirmed,
        Some("all") => ClientTaskView::All,
        Some(other) => {
            return Err(ApiError::Validation(format!(
                "Unknown filter '{}'; expected pending, confirmed or all",
                other
            )))
        }
    };
    let today = today();
    let tasks: Vec<_> = state
        .db
        .list_tasks(&TaskFilter::for_job(job_id, today))
        .await?
        .into_iter()
        .filter(|t| view.matches(t))
        .collect();
    Ok(ok("OK", TaskResponse::many(tasks, today)))
}

/// POST /client/tasks/{id}/review - Confirm or reject one task
#[utoipa::path(
    post,
    path = "/client/tasks/{id}/review",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = ClientReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = TaskResponse),
        (status = 400, description = "Task not confirmed by an administrator yet"),
        (status = 403, description = "Client access required"),
        (status = 404, description = "Task not found in this job")
    ),
    security(("bearer" = []))
)]
pub async fn client_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    ApiJson(req): ApiJson<ClientReviewRequest>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    let job_id = principal.require_client()?;
    let decision = match req.action {
        ClientAction::Confirm => ClientDecision::Confirm,
        ClientAction::Reject => ClientDecision::Reject,
    };
    let comment = req.comment.filter(|c| !c.trim().is_empty());
    let task = state
        .db
        .client_review_task(job_id, task_id, decision, comment, Utc::now())
        .await?;
    info!("Client of job {} reviewed task {}: {:?}", job_id, task_id, decision);
    let message = match decision {
        ClientDecision::Confirm => "Task confirmed",
        ClientDecision::Reject => "Task rejected",
    };
    Ok(ok(message, TaskResponse::from_task(task, today())))
}

/// POST /client/tasks/review/bulk - Confirm many tasks at once
///
/// Tasks outside the job, not yet confirmed by an administrator, or already
/// confirmed by the client are skipped.
#[utoipa::path(
    post,
    path = "/client/tasks/review/bulk",
    request_body = ClientBulkReviewRequest,
    responses(
        (status = 200, description = "The tasks that were confirmed", body = [TaskResponse]),
        (status = 400, description = "No task ids given"),
        (status = 403, description = "Client access required")
    ),
    security(("bearer" = []))
)]
pub async fn client_bulk_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<ClientBulkReviewRequest>,
) -> ApiResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let job_id = principal.require_client()?;
    if req.task_ids.is_empty() {
        return Err(ApiError::Validation("No tasks selected".to_string()));
    }
    let comment = req.comment.filter(|c| !c.trim().is_empty());
    let confirmed = state
        .db
        .client_confirm_tasks(job_id, &req.task_ids, comment, Utc::now())
        .await?;
    info!("Client of job {} confirmed {} task(s)", job_id, confirmed.len());
    Ok(ok(
        format!("{} task(s) confirmed", confirmed.len()),
        TaskResponse::many(confirmed, today()),
    ))
}
