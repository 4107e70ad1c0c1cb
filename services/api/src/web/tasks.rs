//! services/api/src/web/tasks.rs
//!
//! Task endpoints: the tasks of one job, cross-job listings, and the
//! progress/feedback updates developers make on their own tasks.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use job_ledger_core::domain::{NewTask, ProgressStatus, Task, TaskFilter, TaskUpdate};
use job_ledger_core::ports::PortError;
use job_ledger_core::reports::{overdue, DeveloperOverview};
use job_ledger_core::schedule::expand_recurring;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::jobs::accessible_job;
use crate::web::middleware::Principal;
use crate::web::rest::{created, ok, today, ApiJson, ApiResponse};
use crate::web::schema::{
    CreateTasksRequest, DeveloperTasksResponse, FeedbackRequest, ProgressRequest, TaskListQuery,
    TaskResponse, UpdateTaskRequest,
};
use crate::web::state::AppState;

//=========================================================================================
// Shared Helpers
//=========================================================================================

fn task_not_found(task_id: Uuid) -> ApiError {
    ApiError::Port(PortError::NotFound(format!("Task {} not found", task_id)))
}

async fn task_in_job(state: &AppState, job_id: Uuid, task_id: Uuid) -> ApiResult<Task> {
    let task = state.db.get_task(task_id).await?;
    if task.job_id != job_id {
        return Err(task_not_found(task_id));
    }
    Ok(task)
}

/// Applies an update on behalf of staff.
///
/// Administrators may change anything. A developer may only report progress
/// and feedback, and only on tasks assigned to them.
async fn update_as_staff(
    state: &AppState,
    principal: &Principal,
    current: &Task,
    update: TaskUpdate,
) -> ApiResult<Task> {
    let user_id = principal.require_staff()?;
    if !principal.is_admin() {
        if !current.is_assigned_to(user_id) {
            return Err(ApiError::forbidden("This task is not assigned to you"));
        }
        if !update.is_developer_scoped() {
            return Err(ApiError::forbidden(
                "Developers may only update progress and feedback",
            ));
        }
    }

    let updated = state.db.update_task(current.id, update).await?;
    if !current.paid && updated.paid {
        info!(
            "Task {} is now paid ({} to {} assignee(s))",
            updated.id,
            updated.money_for_task,
            updated.assignee_ids.len()
        );
    }
    Ok(updated)
}

fn parse_status(raw: Option<&str>) -> ApiResult<Option<ProgressStatus>> {
    Ok(raw
        .filter(|s| !s.is_empty())
        .map(str::parse::<ProgressStatus>)
        .transpose()?)
}

//=========================================================================================
// Tasks of One Job
//=========================================================================================

/// GET /jobs/{id}/tasks - Tasks of a job, soonest deadline first
#[utoipa::path(
    get,
    path = "/jobs/{id}/tasks",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Tasks of the job", body = [TaskResponse]),
        (status = 403, description = "Not allowed to see this job"),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
pub async fn list_job_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let (_, tasks) = accessible_job(&state, &principal, job_id).await?;
    Ok(ok("OK", TaskResponse::many(tasks, today())))
}

/// POST /jobs/{id}/tasks - Add tasks to a job
///
/// Recurring tasks are materialized as one task per month for a year. The
/// percentages of every task in the job are recomputed.
#[utoipa::path(
    post,
    path = "/jobs/{id}/tasks",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = CreateTasksRequest,
    responses(
        (status = 201, description = "Tasks created", body = [TaskResponse]),
        (status = 400, description = "Invalid task or unknown assignee"),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
pub async fn create_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(job_id): Path<Uuid>,
    ApiJson(req): ApiJson<CreateTasksRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Vec<TaskResponse>>>)> {
    principal.require_admin()?;
    if req.tasks.is_empty() {
        return Err(ApiError::Validation(
            "At least one task is required".to_string(),
        ));
    }
    let today = today();
    let mut new_tasks: Vec<NewTask> = Vec::new();
    for payload in req.tasks {
        new_tasks.extend(expand_recurring(payload.into_new_task()?, today));
    }

    let tasks = state.db.create_tasks(job_id, new_tasks).await?;
    info!("Added {} task(s) to job {}", tasks.len(), job_id);
    Ok(created("Tasks created", TaskResponse::many(tasks, today)))
}

/// GET /jobs/{id}/tasks/{task_id} - One task of a job
#[utoipa::path(
    get,
    path = "/jobs/{id}/tasks/{task_id}",
    params(
        ("id" = Uuid, Path, description = "Job id"),
        ("task_id" = Uuid, Path, description = "Task id")
    ),
    responses(
        (status = 200, description = "The task", body = TaskResponse),
        (status = 403, description = "Not allowed to see this job"),
        (status = 404, description = "Job or task not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_job_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((job_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    let (_, tasks) = accessible_job(&state, &principal, job_id).await?;
    let task = tasks
        .into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| task_not_found(task_id))?;
    Ok(ok("OK", TaskResponse::from_task(task, today())))
}

/// PATCH /jobs/{id}/tasks/{task_id} - Update a task
///
/// Changing hours recomputes the job's percentages; reaching 100% on a
/// confirmed task marks it paid.
#[utoipa::path(
    patch,
    path = "/jobs/{id}/tasks/{task_id}",
    params(
        ("id" = Uuid, Path, description = "Job id"),
        ("task_id" = Uuid, Path, description = "Task id")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Invalid update"),
        (status = 403, description = "Not allowed to change this task"),
        (status = 404, description = "Job or task not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_job_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((job_id, task_id)): Path<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    principal.require_staff()?;
    let update = req.into_update()?;
    let current = task_in_job(&state, job_id, task_id).await?;
    let task = update_as_staff(&state, &principal, &current, update).await?;
    Ok(ok("Task updated", TaskResponse::from_task(task, today())))
}

/// DELETE /jobs/{id}/tasks/{task_id} - Delete a task
#[utoipa::path(
    delete,
    path = "/jobs/{id}/tasks/{task_id}",
    params(
        ("id" = Uuid, Path, description = "Job id"),
        ("task_id" = Uuid, Path, description = "Task id")
    ),
    responses(
        (status = 200, description = "Task deleted", body = TaskResponse),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "Job or task not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_job_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((job_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    principal.require_admin()?;
    task_in_job(&state, job_id, task_id).await?;
    let removed = state.db.delete_task(task_id).await?;
    info!("Deleted task {} from job {}", task_id, job_id);
    Ok(ok("Task deleted", TaskResponse::from_task(removed, today())))
}

//=========================================================================================
// Cross-job Listings
//=========================================================================================

/// GET /tasks - Filter tasks across jobs
///
/// Developers only ever see their own tasks.
#[utoipa::path(
    get,
    path = "/tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Matching tasks", body = [TaskResponse]),
        (status = 400, description = "Unknown status filter"),
        (status = 403, description = "Staff access required")
    ),
    security(("bearer" = []))
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let user_id = principal.require_staff()?;
    let assignee_id = if principal.is_admin() {
        query.user
    } else {
        if matches!(query.user, Some(other) if other != user_id) {
            return Err(ApiError::forbidden("You can only list your own tasks"));
        }
        Some(user_id)
    };
    let today = today();
    let filter = TaskFilter {
        job_id: query.job,
        assignee_id,
        status: parse_status(query.status.as_deref())?,
        deadline_from: query.date_from,
        deadline_to: query.date_to,
        today,
    };
    let tasks = state.db.list_tasks(&filter).await?;
    Ok(ok("OK", TaskResponse::many(tasks, today)))
}

/// GET /tasks/mine - The caller's tasks and balance
#[utoipa::path(
    get,
    path = "/tasks/mine",
    responses(
        (status = 200, description = "Overview and tasks", body = DeveloperTasksResponse),
        (status = 403, description = "Staff access required")
    ),
    security(("bearer" = []))
)]
pub async fn my_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<DeveloperTasksResponse>>> {
    let user_id = principal.require_staff()?;
    let today = today();
    let tasks = state
        .db
        .list_tasks(&TaskFilter::for_assignee(user_id, today))
        .await?;
    let overview = DeveloperOverview::build(user_id, &tasks, today).into();
    Ok(ok(
        "OK",
        DeveloperTasksResponse {
            overview,
            tasks: TaskResponse::many(tasks, today),
        },
    ))
}

/// GET /tasks/overdue - Unfinished tasks past their deadline
#[utoipa::path(
    get,
    path = "/tasks/overdue",
    responses(
        (status = 200, description = "Overdue tasks", body = [TaskResponse]),
        (status = 403, description = "Staff access required")
    ),
    security(("bearer" = []))
)]
pub async fn overdue_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let user_id = principal.require_staff()?;
    let today = today();
    let filter = if principal.is_admin() {
        TaskFilter::all(today)
    } else {
        TaskFilter::for_assignee(user_id, today)
    };
    let tasks = state.db.list_tasks(&filter).await?;
    Ok(ok("OK", TaskResponse::many(overdue(&tasks, today), today)))
}

//=========================================================================================
// Developer Updates
//=========================================================================================

/// POST /tasks/{id}/progress - Report progress on a task
#[utoipa::path(
    post,
    path = "/tasks/{id}/progress",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Progress recorded", body = TaskResponse),
        (status = 400, description = "Progress out of range"),
        (status = 403, description = "Not assigned to this task"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer" = []))
)]
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    ApiJson(req): ApiJson<ProgressRequest>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    principal.require_staff()?;
    let current = state.db.get_task(task_id).await?;
    let update = TaskUpdate {
        progress: Some(req.progress),
        ..TaskUpdate::default()
    };
    let task = update_as_staff(&state, &principal, &current, update).await?;
    Ok(ok("Progress updated", TaskResponse::from_task(task, today())))
}

/// POST /tasks/{id}/feedback - Leave feedback on a task
#[utoipa::path(
    post,
    path = "/tasks/{id}/feedback",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback recorded", body = TaskResponse),
        (status = 403, description = "Not assigned to this task"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer" = []))
)]
pub async fn feedback_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    ApiJson(req): ApiJson<FeedbackRequest>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    principal.require_staff()?;
    let current = state.db.get_task(task_id).await?;
    let update = TaskUpdate {
        feedback: Some(req.feedback),
        ..TaskUpdate::default()
    };
    let task = update_as_staff(&state, &principal, &current, update).await?;
    Ok(ok("Feedback saved", TaskResponse::from_task(task, today())))
}

/// POST /tasks/{id}/toggle-type - Switch a task between simple and monthly
#[utoipa::path(
    post,
    path = "/tasks/{id}/toggle-type",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Type switched", body = TaskResponse),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer" = []))
)]
pub async fn toggle_type_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<TaskResponse>>> {
    principal.require_admin()?;
    let current = state.db.get_task(task_id).await?;
    let next = current.task_type.toggled();
    let update = TaskUpdate {
        task_type: Some(next),
        ..TaskUpdate::default()
    };
    let task = state.db.update_task(task_id, update).await?;
    info!("Task {} switched from {} to {}", task_id, current.task_type, next);
    Ok(ok(
        format!("Task type changed to {}", next),
        TaskResponse::from_task(task, today()),
    ))
}
