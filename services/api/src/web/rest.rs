//! services/api/src/web/rest.rs
//!
//! The response envelope shared by every endpoint, the JSON body extractor,
//! the health check, and the master definition for the OpenAPI specification.

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::error::ApiError;
use crate::web::{auth, client, confirmations, dashboard, deductions, jobs, schema, tasks, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::token_handler,
        auth::email_token_handler,
        auth::client_token_handler,
        users::me_handler,
        users::list_users_handler,
        users::create_user_handler,
        jobs::list_jobs_handler,
        jobs::create_job_handler,
        jobs::get_job_handler,
        jobs::update_job_handler,
        jobs::delete_job_handler,
        jobs::job_statistics_handler,
        tasks::list_job_tasks_handler,
        tasks::create_tasks_handler,
        tasks::get_job_task_handler,
        tasks::update_job_task_handler,
        tasks::delete_job_task_handler,
        tasks::list_tasks_handler,
        tasks::my_tasks_handler,
        tasks::overdue_tasks_handler,
        tasks::progress_handler,
        tasks::feedback_handler,
        tasks::toggle_type_handler,
        confirmations::list_confirmations_handler,
        confirmations::confirmation_handler,
        confirmations::bulk_confirm_handler,
        client::client_progress_handler,
        client::client_tasks_handler,
        client::client_review_handler,
        client::client_bulk_review_handler,
        deductions::deduct_handler,
        deductions::developer_deductions_handler,
        deductions::balance_handler,
        deductions::list_deductions_handler,
        dashboard::stats_handler,
        dashboard::income_balance_handler,
        dashboard::monthly_revenue_handler,
        dashboard::project_distribution_handler,
        dashboard::recent_projects_handler,
        dashboard::upcoming_deadlines_handler,
        dashboard::calendar_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::UsernameLoginRequest,
            auth::EmailLoginRequest,
            auth::TokenResponse,
            schema::UserResponse,
            schema::MeResponse,
            schema::CreateUserRequest,
            schema::ContactDto,
            schema::JobResponse,
            schema::JobSummaryResponse,
            schema::JobDetailResponse,
            schema::CreateJobRequest,
            schema::UpdateJobRequest,
            schema::JobStatisticsResponse,
            schema::TypeCountsDto,
            schema::ProgressCountsDto,
            schema::ConfirmationCountsDto,
            schema::FinancialSummaryDto,
            schema::TaskResponse,
            schema::TaskPayload,
            schema::CreateTasksRequest,
            schema::UpdateTaskRequest,
            schema::ProgressRequest,
            schema::FeedbackRequest,
            schema::DeveloperOverviewDto,
            schema::DeveloperTasksResponse,
            schema::ConfirmationAction,
            schema::ConfirmationRequest,
            schema::BulkConfirmRequest,
            schema::JobConfirmationRowDto,
            schema::ConfirmationQueueResponse,
            schema::ClientAction,
            schema::ClientReviewRequest,
            schema::ClientBulkReviewRequest,
            schema::ClientOverviewDto,
            schema::ClientProgressResponse,
            schema::DeductionRequest,
            schema::DeductionResponse,
            schema::BalanceResponse,
            schema::DashboardStatsResponse,
            schema::IncomeBalanceResponse,
            schema::MonthRevenueDto,
            schema::StatusShareDto,
            schema::CalendarEntry,
            schema::CalendarDay,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Job Ledger API", description = "Jobs, tasks, payments and dashboards for a small development business.")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme the protected endpoints use.
struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

//=========================================================================================
// Response Envelope
//=========================================================================================

/// Every response body: `{ success, message, data, error }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    /// Machine-readable error code on failure.
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: String, code: &str) -> Self {
        Self {
            success: false,
            message,
            data: None,
            error: Some(code.to_string()),
        }
    }
}

/// 200 with the data wrapped in the envelope.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(message, data))
}

/// 201 with the data wrapped in the envelope.
pub fn created<T: Serialize>(
    message: impl Into<String>,
    data: T,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::ok(message, data)))
}

/// The reference date for deadline arithmetic.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

//=========================================================================================
// JSON Body Extractor
//=========================================================================================

/// Like `axum::Json`, but malformed bodies become a 400 in the envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<ApiResponse<HealthResponse>> {
    ok(
        "OK",
        HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )
}
