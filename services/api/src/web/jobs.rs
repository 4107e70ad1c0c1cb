//! services/api/src/web/jobs.rs
//!
//! Job CRUD, job detail and per-job statistics.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use job_ledger_core::domain::{Job, JobUpdate, NewJob, ProgressStatus, Task, TaskFilter};
use job_ledger_core::reports::{filter_jobs_by_status, summarize_jobs, JobStatistics, JobSummary};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::auth::{hash_password, validate_new_password};
use crate::web::middleware::Principal;
use crate::web::rest::{created, ok, today, ApiJson, ApiResponse};
use crate::web::schema::{
    CreateJobRequest, JobDetailResponse, JobListQuery, JobResponse, JobStatisticsResponse,
    JobSummaryResponse, TaskResponse, UpdateJobRequest,
};
use crate::web::state::AppState;

/// Loads a job and its tasks if the caller may see them.
///
/// Administrators see every job, a client only their own, and a developer
/// the jobs where at least one task is assigned to them.
pub(crate) async fn accessible_job(
    state: &AppState,
    principal: &Principal,
    job_id: Uuid,
) -> ApiResult<(Job, Vec<Task>)> {
    if let Principal::Client { job_id: own } = principal {
        if *own != job_id {
            return Err(ApiError::forbidden("You can only access your own job"));
        }
    }
    let job = state.db.get_job(job_id).await?;
    let tasks = state
        .db
        .list_tasks(&TaskFilter::for_job(job_id, today()))
        .await?;
    if let Principal::Staff { user_id, .. } = principal {
        if !principal.is_admin() && !tasks.iter().any(|t| t.is_assigned_to(*user_id)) {
            return Err(ApiError::forbidden("You are not assigned to this job"));
        }
    }
    Ok((job, tasks))
}

/// GET /jobs - Jobs with progress figures, newest first
#[utoipa::path(
    get,
    path = "/jobs",
    params(JobListQuery),
    responses(
        (status = 200, description = "Job summaries", body = [JobSummaryResponse]),
        (status = 400, description = "Unknown status filter"),
        (status = 403, description = "Staff access required")
    ),
    security(("bearer" = []))
)]
pub async fn list_jobs_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<JobListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<JobSummaryResponse>>>> {
    let user_id = principal.require_staff()?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<ProgressStatus>)
        .transpose()?;
    let today = today();

    let mut jobs = state.db.list_jobs().await?;
    let tasks = state.db.list_tasks(&TaskFilter::all(today)).await?;
    if !principal.is_admin() {
        jobs.retain(|job| {
            tasks
                .iter()
                .any(|t| t.job_id == job.id && t.is_assigned_to(user_id))
        });
    }
    if let Some(status) = status {
        jobs = filter_jobs_by_status(jobs, &tasks, status, today);
    }

    let summaries = summarize_jobs(jobs, &tasks, today)
        .into_iter()
        .map(JobSummaryResponse::from)
        .collect::<Vec<_>>();
    Ok(ok("OK", summaries))
}

/// POST /jobs - Create a job with its client credentials
#[utoipa::path(
    post,
    path = "/jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created", body = JobResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator access required"),
        (status = 409, description = "Client email already in use")
    ),
    security(("bearer" = []))
)]
pub async fn create_job_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<JobResponse>>)> {
    principal.require_admin()?;
    validate_new_password(&req.client_password)?;
    let new_job = NewJob {
        title: req.title.trim().to_string(),
        client_email: req.client_email.trim().to_string(),
        client_password_hash: String::new(),
        over_all_income: req.over_all_income,
        contact: req.contact.into(),
    };
    new_job.validate()?;
    let new_job = NewJob {
        client_password_hash: hash_password(&req.client_password)?,
        ..new_job
    };

    let job = state.db.create_job(new_job).await?;
    info!("Created job {} ({})", job.id, job.title);
    Ok(created("Job created", JobResponse::from(job)))
}

/// GET /jobs/{id} - A job with its summary and tasks
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job detail", body = JobDetailResponse),
        (status = 403, description = "Not allowed to see this job"),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_job_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<JobDetailResponse>>> {
    let (job, tasks) = accessible_job(&state, &principal, job_id).await?;
    let today = today();
    let summary = JobSummary::build(job, &tasks, today).into();
    Ok(ok(
        "OK",
        JobDetailResponse {
            summary,
            tasks: TaskResponse::many(tasks, today),
        },
    ))
}

/// PATCH /jobs/{id} - Update job fields
#[utoipa::path(
    patch,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = UpdateJobRequest,
    responses(
        (status = 200, description = "Job updated", body = JobResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Client email already in use")
    ),
    security(("bearer" = []))
)]
pub async fn update_job_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(job_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateJobRequest>,
) -> ApiResult<Json<ApiResponse<JobResponse>>> {
    principal.require_admin()?;
    let client_password_hash = match req.client_password.as_deref() {
        Some(password) => {
            validate_new_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };
    let update = JobUpdate {
        title: req.title.map(|t| t.trim().to_string()),
        client_email: req.client_email.map(|e| e.trim().to_string()),
        client_password_hash,
        over_all_income: req.over_all_income,
        contact: req.contact.map(Into::into),
    };
    update.validate()?;

    let job = state.db.update_job(job_id, update).await?;
    info!("Updated job {}", job.id);
    Ok(ok("Job updated", JobResponse::from(job)))
}

/// DELETE /jobs/{id} - Delete a job together with its tasks
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job deleted"),
        (status = 403, description = "Administrator access required"),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_job_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    principal.require_admin()?;
    state.db.delete_job(job_id).await?;
    info!("Deleted job {} and its tasks", job_id);
    Ok(ok("Job deleted", ()))
}

/// GET /jobs/{id}/statistics - Counts, confirmations and money for one job
#[utoipa::path(
    get,
    path = "/jobs/{id}/statistics",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job statistics", body = JobStatisticsResponse),
        (status = 403, description = "Not allowed to see this job"),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
pub async fn job_statistics_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<JobStatisticsResponse>>> {
    let (job, tasks) = accessible_job(&state, &principal, job_id).await?;
    Ok(ok(
        "OK",
        JobStatisticsResponse::from(JobStatistics::build(&job, &tasks)),
    ))
}
