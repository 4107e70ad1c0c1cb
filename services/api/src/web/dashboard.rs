//! services/api/src/web/dashboard.rs
//!
//! Read-only reporting endpoints. Financial figures are for administrators;
//! deadline views are open to developers, scoped to their own tasks.

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use chrono::Datelike;
use job_ledger_core::domain::{Task, TaskFilter};
use job_ledger_core::reports::{
    calendar, monthly_revenue, project_distribution, summarize_jobs, upcoming_deadlines,
    DashboardStats, IncomeBalance,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::Principal;
use crate::web::rest::{ok, today, ApiResponse};
use crate::web::schema::{
    CalendarDay, CalendarEntry, CalendarQuery, DashboardStatsResponse, IncomeBalanceResponse,
    JobSummaryResponse, MonthRevenueDto, StatusShareDto, TaskResponse, YearQuery,
};
use crate::web::state::AppState;

const RECENT_PROJECTS: usize = 5;
const UPCOMING_DEADLINES: usize = 10;

/// Tasks the caller may see on deadline views: all for administrators, the
/// assigned ones for developers.
async fn visible_tasks(state: &AppState, principal: &Principal) -> ApiResult<Vec<Task>> {
    let user_id = principal.require_staff()?;
    let filter = if principal.is_admin() {
        TaskFilter::all(today())
    } else {
        TaskFilter::for_assignee(user_id, today())
    };
    Ok(state.db.list_tasks(&filter).await?)
}

async fn job_titles(state: &AppState) -> ApiResult<HashMap<Uuid, String>> {
    Ok(state
        .db
        .list_jobs()
        .await?
        .into_iter()
        .map(|j| (j.id, j.title))
        .collect())
}

/// GET /dashboard/stats - Headline figures
#[utoipa::path(
    get,
    path = "/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStatsResponse),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer" = []))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<DashboardStatsResponse>>> {
    principal.require_admin()?;
    let today = today();
    let jobs = state.db.list_jobs().await?;
    let tasks = state.db.list_tasks(&TaskFilter::all(today)).await?;
    let total_users = state.db.list_users().await?.len();
    let stats = DashboardStats::build(&jobs, &tasks, total_users, today);
    Ok(ok("OK", DashboardStatsResponse::from(stats)))
}

/// GET /dashboard/income-balance - Contracted income against task money
#[utoipa::path(
    get,
    path = "/dashboard/income-balance",
    responses(
        (status = 200, description = "Income balance", body = IncomeBalanceResponse),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer" = []))
)]
pub async fn income_balance_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<IncomeBalanceResponse>>> {
    principal.require_admin()?;
    let jobs = state.db.list_jobs().await?;
    let tasks = state.db.list_tasks(&TaskFilter::all(today())).await?;
    Ok(ok(
        "OK",
        IncomeBalanceResponse::from(IncomeBalance::build(&jobs, &tasks)),
    ))
}

/// GET /dashboard/monthly-revenue - Income, expenses and profit per month
#[utoipa::path(
    get,
    path = "/dashboard/monthly-revenue",
    params(YearQuery),
    responses(
        (status = 200, description = "Twelve months, January first", body = [MonthRevenueDto]),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer" = []))
)]
pub async fn monthly_revenue_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<ApiResponse<Vec<MonthRevenueDto>>>> {
    principal.require_admin()?;
    let today = today();
    let year = query.year.unwrap_or_else(|| today.year());
    let jobs = state.db.list_jobs().await?;
    let tasks = state.db.list_tasks(&TaskFilter::all(today)).await?;
    let months = monthly_revenue(&jobs, &tasks, year)
        .into_iter()
        .map(MonthRevenueDto::from)
        .collect::<Vec<_>>();
    Ok(ok("OK", months))
}

/// GET /dashboard/project-distribution - Share of projects per status
#[utoipa::path(
    get,
    path = "/dashboard/project-distribution",
    responses(
        (status = 200, description = "Project counts by status", body = [StatusShareDto]),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer" = []))
)]
pub async fn project_distribution_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<Vec<StatusShareDto>>>> {
    principal.require_admin()?;
    let today = today();
    let jobs = state.db.list_jobs().await?;
    let tasks = state.db.list_tasks(&TaskFilter::all(today)).await?;
    let shares = project_distribution(&jobs, &tasks, today)
        .into_iter()
        .map(StatusShareDto::from)
        .collect::<Vec<_>>();
    Ok(ok("OK", shares))
}

/// GET /dashboard/recent-projects - The newest jobs with their progress
#[utoipa::path(
    get,
    path = "/dashboard/recent-projects",
    responses(
        (status = 200, description = "Newest job summaries", body = [JobSummaryResponse]),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer" = []))
)]
pub async fn recent_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<Vec<JobSummaryResponse>>>> {
    principal.require_admin()?;
    let today = today();
    let mut jobs = state.db.list_jobs().await?;
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    jobs.truncate(RECENT_PROJECTS);
    let tasks = state.db.list_tasks(&TaskFilter::all(today)).await?;
    let summaries = summarize_jobs(jobs, &tasks, today)
        .into_iter()
        .map(JobSummaryResponse::from)
        .collect::<Vec<_>>();
    Ok(ok("OK", summaries))
}

/// GET /dashboard/upcoming-deadlines - Unfinished tasks due soonest
#[utoipa::path(
    get,
    path = "/dashboard/upcoming-deadlines",
    responses(
        (status = 200, description = "Upcoming tasks", body = [TaskResponse]),
        (status = 403, description = "Staff access required")
    ),
    security(("bearer" = []))
)]
pub async fn upcoming_deadlines_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<Vec<TaskResponse>>>> {
    let tasks = visible_tasks(&state, &principal).await?;
    let today = today();
    let upcoming = upcoming_deadlines(&tasks, today, UPCOMING_DEADLINES);
    Ok(ok("OK", TaskResponse::many(upcoming, today)))
}

/// GET /calendar/tasks - Tasks due in a month, grouped by day
#[utoipa::path(
    get,
    path = "/calendar/tasks",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Days with tasks due", body = [CalendarDay]),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Staff access required")
    ),
    security(("bearer" = []))
)]
pub async fn calendar_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<ApiResponse<Vec<CalendarDay>>>> {
    let today = today();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());
    if !(1..=12).contains(&month) {
        return Err(ApiError::Validation(
            "Month must be between 1 and 12".to_string(),
        ));
    }

    let tasks = visible_tasks(&state, &principal).await?;
    let titles = job_titles(&state).await?;
    let days = calendar(&tasks, year, month)
        .into_iter()
        .map(|(date, tasks)| CalendarDay {
            date,
            tasks: tasks
                .into_iter()
                .map(|task| CalendarEntry {
                    job_title: titles.get(&task.job_id).cloned().unwrap_or_default(),
                    task: TaskResponse::from_task(task, today),
                })
                .collect(),
        })
        .collect::<Vec<_>>();
    Ok(ok("OK", days))
}
