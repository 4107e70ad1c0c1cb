//! services/api/src/web/router.rs
//!
//! Assembles the HTTP application: public auth routes, the bearer-protected
//! API, CORS, and the Swagger UI.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::error::ApiResult;
use crate::web::{
    auth, client, confirmations, dashboard, deductions, jobs,
    middleware::require_auth,
    rest::{health_handler, ApiDoc},
    state::AppState,
    tasks, users,
};

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the complete router for the given state.
pub fn build_router(state: Arc<AppState>) -> ApiResult<Router> {
    let origin = state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/token", post(auth::token_handler))
        .route("/auth/token/email", post(auth::email_token_handler))
        .route("/auth/client", post(auth::client_token_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(users::me_handler))
        .route(
            "/users",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(
            "/jobs",
            get(jobs::list_jobs_handler).post(jobs::create_job_handler),
        )
        .route(
            "/jobs/{id}",
            get(jobs::get_job_handler)
                .patch(jobs::update_job_handler)
                .delete(jobs::delete_job_handler),
        )
        .route("/jobs/{id}/statistics", get(jobs::job_statistics_handler))
        .route(
            "/jobs/{id}/tasks",
            get(tasks::list_job_tasks_handler).post(tasks::create_tasks_handler),
        )
        .route(
            "/jobs/{id}/tasks/{task_id}",
            get(tasks::get_job_task_handler)
                .patch(tasks::update_job_task_handler)
                .delete(tasks::delete_job_task_handler),
        )
        .route("/tasks", get(tasks::list_tasks_handler))
        .route("/tasks/mine", get(tasks::my_tasks_handler))
        .route("/tasks/overdue", get(tasks::overdue_tasks_handler))
        .route("/tasks/{id}/progress", post(tasks::progress_handler))
        .route("/tasks/{id}/feedback", post(tasks::feedback_handler))
        .route("/tasks/{id}/toggle-type", post(tasks::toggle_type_handler))
        .route(
            "/tasks/{id}/confirmation",
            post(confirmations::confirmation_handler),
        )
        .route(
            "/confirmations",
            get(confirmations::list_confirmations_handler),
        )
        .route(
            "/confirmations/bulk",
            post(confirmations::bulk_confirm_handler),
        )
        .route("/client/progress", get(client::client_progress_handler))
        .route("/client/tasks", get(client::client_tasks_handler))
        .route(
            "/client/tasks/{id}/review",
            post(client::client_review_handler),
        )
        .route(
            "/client/tasks/review/bulk",
            post(client::client_bulk_review_handler),
        )
        .route(
            "/developers/{id}/deductions",
            get(deductions::developer_deductions_handler).post(deductions::deduct_handler),
        )
        .route("/developers/{id}/balance", get(deductions::balance_handler))
        .route("/deductions", get(deductions::list_deductions_handler))
        .route("/dashboard/stats", get(dashboard::stats_handler))
        .route(
            "/dashboard/income-balance",
            get(dashboard::income_balance_handler),
        )
        .route(
            "/dashboard/monthly-revenue",
            get(dashboard::monthly_revenue_handler),
        )
        .route(
            "/dashboard/project-distribution",
            get(dashboard::project_distribution_handler),
        )
        .route(
            "/dashboard/recent-projects",
            get(dashboard::recent_projects_handler),
        )
        .route(
            "/dashboard/upcoming-deadlines",
            get(dashboard::upcoming_deadlines_handler),
        )
        .route("/calendar/tasks", get(dashboard::calendar_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
