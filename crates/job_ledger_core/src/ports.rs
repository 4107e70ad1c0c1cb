//! crates/job_ledger_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete storage behind it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ClientCredentials, ClientDecision, DeductionFilter, DeductionLog, Job, JobUpdate, NewJob,
    NewTask, NewUser, Task, TaskFilter, TaskUpdate, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port
//=========================================================================================

/// Persistence for users, jobs, tasks and deduction logs.
///
/// Every method is one all-or-nothing unit: implementations must apply the
/// writes of a call atomically, and any call that creates, deletes or changes
/// the hours of a task must renormalize the percentages of the whole job in
/// that same unit (see [`crate::allocation::renormalize`]).
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Jobs ---
    async fn create_job(&self, new_job: NewJob) -> PortResult<Job>;

    async fn get_job(&self, job_id: Uuid) -> PortResult<Job>;

    /// All jobs, newest first.
    async fn list_jobs(&self) -> PortResult<Vec<Job>>;

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> PortResult<Job>;

    /// Deletes the job and, by cascade, all of its tasks.
    async fn delete_job(&self, job_id: Uuid) -> PortResult<()>;

    async fn get_client_credentials(&self, client_email: &str) -> PortResult<ClientCredentials>;

    // --- Tasks ---
    /// Inserts the tasks under one job and renormalizes the job.
    async fn create_tasks(&self, job_id: Uuid, tasks: Vec<NewTask>) -> PortResult<Vec<Task>>;

    async fn get_task(&self, task_id: Uuid) -> PortResult<Task>;

    /// Tasks matching the filter, ordered by deadline (undated last).
    async fn list_tasks(&self, filter: &TaskFilter) -> PortResult<Vec<Task>>;

    /// Applies the update, renormalizes the job if hours changed and runs the payment check.
    async fn update_task(&self, task_id: Uuid, update: TaskUpdate) -> PortResult<Task>;

    /// Deletes the task and renormalizes the surviving siblings. Returns the deleted task.
    async fn delete_task(&self, task_id: Uuid) -> PortResult<Task>;

    /// Administrator confirmation of one task; fails if the task is not complete.
    async fn confirm_task(
        &self,
        task_id: Uuid,
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<Task>;

    /// Confirms every listed task that is complete and not yet confirmed.
    /// Returns the tasks that were confirmed.
    async fn confirm_tasks(
        &self,
        task_ids: &[Uuid],
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<Vec<Task>>;

    async fn unconfirm_task(&self, task_id: Uuid) -> PortResult<Task>;

    /// Client verdict on one task of the client's job.
    async fn client_review_task(
        &self,
        job_id: Uuid,
        task_id: Uuid,
        decision: ClientDecision,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> PortResult<Task>;

    /// Client confirmation of every listed task of the job that awaits it.
    async fn client_confirm_tasks(
        &self,
        job_id: Uuid,
        task_ids: &[Uuid],
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> PortResult<Vec<Task>>;

    // --- Deductions ---
    /// Reduces the developer's paid-task earnings by `amount` and records the log.
    async fn deduct_balance(
        &self,
        developer_id: Uuid,
        admin_id: Uuid,
        amount: i64,
        at: DateTime<Utc>,
    ) -> PortResult<DeductionLog>;

    /// Deduction logs matching the filter, newest first.
    async fn list_deductions(&self, filter: &DeductionFilter) -> PortResult<Vec<DeductionLog>>;
}
