//! services/api/src/web/schema.rs
//!
//! Request and response payloads. Domain records never go over the wire
//! directly; every response is built from them here.

use chrono::{DateTime, NaiveDate, Utc};
use job_ledger_core::domain::{
    ClientContact, DeductionLog, Job, NewTask, Task, TaskType, TaskUpdate, User,
};
use job_ledger_core::ports::PortResult;
use job_ledger_core::reports::{
    ClientOverview, ConfirmationQueue, DashboardStats, DeveloperOverview, IncomeBalance,
    JobConfirmationRow, JobStatistics, JobSummary, MonthRevenue, StatusShare,
};
use job_ledger_core::schedule::{days_until, DeadlineStatus};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Distinguishes an absent field from an explicit `null`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn parse_task_type(raw: Option<&str>) -> PortResult<Option<TaskType>> {
    raw.map(str::parse::<TaskType>).transpose()
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role.to_string(),
            created_at: user.created_at,
        }
    }
}

/// The caller: a staff user, or the job a client token is scoped to.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub role: String,
    pub user: Option<UserResponse>,
    pub job: Option<JobResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// "admin" or "developer" (default).
    pub role: Option<String>,
}

//=========================================================================================
// Jobs
//=========================================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ContactDto {
    pub full_name: String,
    pub phone_number: String,
    pub position: String,
    pub company_name: String,
    pub company_phone: String,
    pub company_address: String,
    pub website: String,
}

impl From<ClientContact> for ContactDto {
    fn from(c: ClientContact) -> Self {
        Self {
            full_name: c.full_name,
            phone_number: c.phone_number,
            position: c.position,
            company_name: c.company_name,
            company_phone: c.company_phone,
            company_address: c.company_address,
            website: c.website,
        }
    }
}

impl From<ContactDto> for ClientContact {
    fn from(c: ContactDto) -> Self {
        Self {
            full_name: c.full_name,
            phone_number: c.phone_number,
            position: c.position,
            company_name: c.company_name,
            company_phone: c.company_phone,
            company_address: c.company_address,
            website: c.website,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub client_email: String,
    pub over_all_income: i64,
    pub contact: ContactDto,
    pub created_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            title: job.title,
            client_email: job.client_email,
            over_all_income: job.over_all_income,
            contact: job.contact.into(),
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobSummaryResponse {
    pub job: JobResponse,
    pub overall_progress: u8,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
    pub remaining_income: i64,
}

impl From<JobSummary> for JobSummaryResponse {
    fn from(s: JobSummary) -> Self {
        Self {
            job: s.job.into(),
            overall_progress: s.overall_progress,
            total_tasks: s.total_tasks,
            completed_tasks: s.completed_tasks,
            overdue_tasks: s.overdue_tasks,
            remaining_income: s.remaining_income,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobDetailResponse {
    pub summary: JobSummaryResponse,
    pub tasks: Vec<TaskResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateJobRequest {
    pub title: String,
    pub client_email: String,
    /// Password the client signs in with.
    pub client_password: String,
    #[serde(default)]
    pub over_all_income: i64,
    #[serde(default)]
    pub contact: ContactDto,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub client_email: Option<String>,
    pub client_password: Option<String>,
    pub over_all_income: Option<i64>,
    pub contact: Option<ContactDto>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobListQuery {
    /// completed | in_progress | pending | overdue
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TypeCountsDto {
    pub simple: usize,
    pub recurring: usize,
    pub monthly: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressCountsDto {
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmationCountsDto {
    pub confirmed: usize,
    pub paid: usize,
    pub unconfirmed: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FinancialSummaryDto {
    pub total_task_money: i64,
    pub paid_money: i64,
    pub unpaid_money: i64,
    pub remaining_job_budget: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatisticsResponse {
    pub job_id: Uuid,
    pub title: String,
    pub overall_progress: u8,
    pub total_income: i64,
    pub total_tasks: usize,
    pub total_hours: i64,
    pub by_type: TypeCountsDto,
    pub progress: ProgressCountsDto,
    pub confirmation: ConfirmationCountsDto,
    pub finances: FinancialSummaryDto,
}

impl From<JobStatistics> for JobStatisticsResponse {
    fn from(s: JobStatistics) -> Self {
        Self {
            job_id: s.job_id,
            title: s.title,
            overall_progress: s.overall_progress,
            total_income: s.total_income,
            total_tasks: s.total_tasks,
            total_hours: s.total_hours,
            by_type: TypeCountsDto {
                simple: s.by_type.simple,
                recurring: s.by_type.recurring,
                monthly: s.by_type.monthly,
            },
            progress: ProgressCountsDto {
                completed: s.progress.completed,
                in_progress: s.progress.in_progress,
                pending: s.progress.pending,
            },
            confirmation: ConfirmationCountsDto {
                confirmed: s.confirmation.confirmed,
                paid: s.confirmation.paid,
                unconfirmed: s.confirmation.unconfirmed,
            },
            finances: FinancialSummaryDto {
                total_task_money: s.finances.total_task_money,
                paid_money: s.finances.paid_money,
                unpaid_money: s.finances.unpaid_money,
                remaining_job_budget: s.finances.remaining_job_budget,
            },
        }
    }
}

//=========================================================================================
// Tasks
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub title: String,
    pub description: String,
    pub hours: i32,
    /// Share of the job's hours, 0..=100.
    pub task_percentage: f64,
    pub progress: u8,
    pub money_for_task: i64,
    pub paid: bool,
    pub task_type: String,
    pub start_date: NaiveDate,
    pub deadline: Option<NaiveDate>,
    pub feedback: Option<String>,
    pub confirmed: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    pub client_confirmed: bool,
    pub client_confirmed_at: Option<DateTime<Utc>>,
    pub client_comment: Option<String>,
    pub assignee_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub days_until_deadline: Option<i64>,
    /// Urgency bucket, e.g. "task_red" or "overdue".
    pub status_color: String,
}

impl TaskResponse {
    pub fn from_task(task: Task, today: NaiveDate) -> Self {
        let status_color = DeadlineStatus::of(&task, today).as_str().to_string();
        Self {
            days_until_deadline: days_until(task.deadline, today),
            status_color,
            id: task.id,
            job_id: task.job_id,
            title: task.title,
            description: task.description,
            hours: task.hours,
            task_percentage: task.task_percentage,
            progress: task.progress,
            money_for_task: task.money_for_task,
            paid: task.paid,
            task_type: task.task_type.to_string(),
            start_date: task.start_date,
            deadline: task.deadline,
            feedback: task.feedback,
            confirmed: task.confirmed,
            confirmed_at: task.confirmed_at,
            confirmed_by: task.confirmed_by,
            client_confirmed: task.client_confirmed,
            client_confirmed_at: task.client_confirmed_at,
            client_comment: task.client_comment,
            assignee_ids: task.assignee_ids,
            created_at: task.created_at,
        }
    }

    pub fn many(tasks: Vec<Task>, today: NaiveDate) -> Vec<Self> {
        tasks
            .into_iter()
            .map(|t| Self::from_task(t, today))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub hours: i32,
    #[serde(default)]
    pub money_for_task: i64,
    #[serde(default)]
    pub progress: u8,
    /// simple (default) | recurring | monthly
    pub task_type: Option<String>,
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub assignee_ids: Vec<Uuid>,
}

impl TaskPayload {
    pub fn into_new_task(self) -> PortResult<NewTask> {
        Ok(NewTask {
            task_type: parse_task_type(self.task_type.as_deref())?.unwrap_or(TaskType::Simple),
            title: self.title,
            description: self.description,
            hours: self.hours,
            money_for_task: self.money_for_task,
            progress: self.progress,
            deadline: self.deadline,
            assignee_ids: self.assignee_ids,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTasksRequest {
    pub tasks: Vec<TaskPayload>,
}

/// Every field is optional; `deadline: null` clears the deadline.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub hours: Option<i32>,
    pub money_for_task: Option<i64>,
    pub progress: Option<u8>,
    pub task_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<NaiveDate>)]
    pub deadline: Option<Option<NaiveDate>>,
    pub feedback: Option<String>,
    pub assignee_ids: Option<Vec<Uuid>>,
}

impl UpdateTaskRequest {
    pub fn into_update(self) -> PortResult<TaskUpdate> {
        Ok(TaskUpdate {
            task_type: parse_task_type(self.task_type.as_deref())?,
            title: self.title,
            description: self.description,
            hours: self.hours,
            money_for_task: self.money_for_task,
            progress: self.progress,
            deadline: self.deadline,
            feedback: self.feedback,
            assignee_ids: self.assignee_ids,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgressRequest {
    pub progress: u8,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub feedback: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    pub job: Option<Uuid>,
    pub user: Option<Uuid>,
    /// completed | in_progress | pending | overdue
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeveloperOverviewDto {
    pub developer_id: Uuid,
    pub balance: i64,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub pending_tasks: usize,
    pub overdue_tasks: usize,
}

impl From<DeveloperOverview> for DeveloperOverviewDto {
    fn from(o: DeveloperOverview) -> Self {
        Self {
            developer_id: o.developer_id,
            balance: o.balance,
            total_tasks: o.total_tasks,
            completed_tasks: o.completed_tasks,
            in_progress_tasks: o.in_progress_tasks,
            pending_tasks: o.pending_tasks,
            overdue_tasks: o.overdue_tasks,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeveloperTasksResponse {
    pub overview: DeveloperOverviewDto,
    pub tasks: Vec<TaskResponse>,
}

//=========================================================================================
// Confirmations
//=========================================================================================

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationAction {
    Confirm,
    Unconfirm,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmationRequest {
    pub action: ConfirmationAction,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkConfirmRequest {
    pub task_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConfirmationListQuery {
    /// pending (default) | confirmed
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobConfirmationRowDto {
    pub job_id: Uuid,
    pub job_title: String,
    pub pending: usize,
    pub confirmed: usize,
    pub payment_total: i64,
}

impl From<JobConfirmationRow> for JobConfirmationRowDto {
    fn from(r: JobConfirmationRow) -> Self {
        Self {
            job_id: r.job_id,
            job_title: r.job_title,
            pending: r.pending,
            confirmed: r.confirmed,
            payment_total: r.payment_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmationQueueResponse {
    pub pending_count: usize,
    pub confirmed_count: usize,
    pub payment_total: i64,
    pub by_job: Vec<JobConfirmationRowDto>,
    pub tasks: Vec<TaskResponse>,
}

impl ConfirmationQueueResponse {
    pub fn new(queue: ConfirmationQueue, tasks: Vec<TaskResponse>) -> Self {
        Self {
            pending_count: queue.pending_count,
            confirmed_count: queue.confirmed_count,
            payment_total: queue.payment_total,
            by_job: queue.by_job.into_iter().map(Into::into).collect(),
            tasks,
        }
    }
}

//=========================================================================================
// Client
//=========================================================================================

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    Confirm,
    Reject,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClientReviewRequest {
    pub action: ClientAction,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClientBulkReviewRequest {
    pub task_ids: Vec<Uuid>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClientTaskQuery {
    /// pending (default) | confirmed | all
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientOverviewDto {
    pub pending_count: usize,
    pub confirmed_count: usize,
    pub completed_count: usize,
}

impl From<ClientOverview> for ClientOverviewDto {
    fn from(o: ClientOverview) -> Self {
        Self {
            pending_count: o.pending_count,
            confirmed_count: o.confirmed_count,
            completed_count: o.completed_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientProgressResponse {
    pub summary: JobSummaryResponse,
    pub overview: ClientOverviewDto,
    pub tasks: Vec<TaskResponse>,
}

//=========================================================================================
// Deductions
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeductionRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeductionResponse {
    pub id: Uuid,
    pub developer_id: Uuid,
    pub deducted_by: Uuid,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<DeductionLog> for DeductionResponse {
    fn from(log: DeductionLog) -> Self {
        Self {
            id: log.id,
            developer_id: log.developer_id,
            deducted_by: log.deducted_by,
            amount: log.amount,
            created_at: log.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub developer_id: Uuid,
    pub balance: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeductionListQuery {
    pub developer: Option<Uuid>,
    /// YYYY-MM
    pub month: Option<String>,
}

//=========================================================================================
// Dashboard
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStatsResponse {
    pub total_projects: usize,
    pub in_progress_projects: usize,
    pub completed_projects: usize,
    pub overdue_projects: usize,
    pub total_revenue: i64,
    pub total_users: usize,
    pub paid_tasks: usize,
    pub total_tasks: usize,
    pub monthly_income: i64,
    pub income_balance: i64,
}

impl From<DashboardStats> for DashboardStatsResponse {
    fn from(s: DashboardStats) -> Self {
        Self {
            total_projects: s.total_projects,
            in_progress_projects: s.in_progress_projects,
            completed_projects: s.completed_projects,
            overdue_projects: s.overdue_projects,
            total_revenue: s.total_revenue,
            total_users: s.total_users,
            paid_tasks: s.paid_tasks,
            total_tasks: s.total_tasks,
            monthly_income: s.monthly_income,
            income_balance: s.income_balance,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IncomeBalanceResponse {
    pub total_task_money: i64,
    pub total_job_income: i64,
    pub income_balance: i64,
}

impl From<IncomeBalance> for IncomeBalanceResponse {
    fn from(b: IncomeBalance) -> Self {
        Self {
            total_task_money: b.total_task_money,
            total_job_income: b.total_job_income,
            income_balance: b.income_balance,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthRevenueDto {
    pub month: String,
    pub income: i64,
    pub expenses: i64,
    pub profit: i64,
}

impl From<MonthRevenue> for MonthRevenueDto {
    fn from(r: MonthRevenue) -> Self {
        Self {
            month: r.month.to_string(),
            income: r.income,
            expenses: r.expenses,
            profit: r.profit,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusShareDto {
    pub status: String,
    pub count: usize,
    pub percentage: f64,
}

impl From<StatusShare> for StatusShareDto {
    fn from(s: StatusShare) -> Self {
        Self {
            status: s.status.as_str().to_string(),
            count: s.count,
            percentage: s.percentage,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct YearQuery {
    /// Defaults to the current year.
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalendarEntry {
    pub job_title: String,
    pub task: TaskResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub tasks: Vec<CalendarEntry>,
}
