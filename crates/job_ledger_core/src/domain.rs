//! crates/job_ledger_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::{PortError, PortResult};

//=========================================================================================
// Users and Roles
//=========================================================================================

/// The capability a staff account carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "developer" => Ok(Role::Developer),
            other => Err(PortError::Invalid(format!("Unknown role '{}'", other))),
        }
    }
}

/// A staff account (administrator or developer).
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub hashed_password: String,
}

//=========================================================================================
// Jobs
//=========================================================================================

/// Contact details of the client behind a job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientContact {
    pub full_name: String,
    pub phone_number: String,
    pub position: String,
    pub company_name: String,
    pub company_phone: String,
    pub company_address: String,
    pub website: String,
}

/// Upper bound for any single money amount: job income, task money or a
/// deduction. The migration carries the same CHECK.
pub const MAX_MONEY: i64 = 1_000_000_000_000;

/// Adds money amounts in `i128` and clamps the result to the `i64` range.
pub fn money_total<I: IntoIterator<Item = i64>>(values: I) -> i64 {
    clamp_money(values.into_iter().map(i128::from).sum())
}

/// `a - b` without overflow, clamped to the `i64` range.
pub fn money_diff(a: i64, b: i64) -> i64 {
    clamp_money(i128::from(a) - i128::from(b))
}

fn clamp_money(value: i128) -> i64 {
    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// A client engagement with a total contracted income.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub client_email: String,
    pub over_all_income: i64,
    pub contact: ClientContact,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub client_email: String,
    pub client_password_hash: String,
    pub over_all_income: i64,
    pub contact: ClientContact,
}

impl NewJob {
    pub fn validate(&self) -> PortResult<()> {
        if self.title.trim().is_empty() {
            return Err(PortError::Invalid("Title must not be empty".to_string()));
        }
        if !self.client_email.contains('@') {
            return Err(PortError::Invalid("Client email is not valid".to_string()));
        }
        validate_income(self.over_all_income)
    }
}

/// A partial update of a job. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub client_email: Option<String>,
    pub client_password_hash: Option<String>,
    pub over_all_income: Option<i64>,
    pub contact: Option<ClientContact>,
}

impl JobUpdate {
    pub fn validate(&self) -> PortResult<()> {
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err(PortError::Invalid("Title must not be empty".to_string()));
        }
        if matches!(&self.client_email, Some(e) if !e.contains('@')) {
            return Err(PortError::Invalid("Client email is not valid".to_string()));
        }
        match self.over_all_income {
            Some(income) => validate_income(income),
            None => Ok(()),
        }
    }

    pub fn apply_to(&self, job: &mut Job) {
        if let Some(title) = &self.title {
            job.title = title.clone();
        }
        if let Some(email) = &self.client_email {
            job.client_email = email.clone();
        }
        if let Some(income) = self.over_all_income {
            job.over_all_income = income;
        }
        if let Some(contact) = &self.contact {
            job.contact = contact.clone();
        }
    }
}

/// Credentials a client uses to sign in to the progress view of their job.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub job_id: Uuid,
    pub client_email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Tasks
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// One-off piece of work.
    Simple,
    /// Materialized as one instance per month for a year.
    Recurring,
    /// Generic monthly work without materialized instances.
    Monthly,
}

impl TaskType {
    pub const ALL: [TaskType; 3] = [TaskType::Simple, TaskType::Recurring, TaskType::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Simple => "simple",
            TaskType::Recurring => "recurring",
            TaskType::Monthly => "monthly",
        }
    }

    /// The type an administrator's toggle switches to. Recurring falls back to simple.
    pub fn toggled(&self) -> TaskType {
        match self {
            TaskType::Simple => TaskType::Monthly,
            TaskType::Monthly | TaskType::Recurring => TaskType::Simple,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(TaskType::Simple),
            "recurring" => Ok(TaskType::Recurring),
            "monthly" => Ok(TaskType::Monthly),
            _ => Err(PortError::Invalid(
                "Task type must be one of: simple, recurring, monthly".to_string(),
            )),
        }
    }
}

/// A unit of work under a job.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub job_id: Uuid,
    pub title: String,
    pub description: String,
    pub hours: i32,
    /// Share of the job's total hours, renormalized on every hours change.
    pub task_percentage: f64,
    pub progress: u8,
    pub money_for_task: i64,
    pub paid: bool,
    pub task_type: TaskType,
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
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub hours: i32,
    pub money_for_task: i64,
    pub progress: u8,
    pub task_type: TaskType,
    pub deadline: Option<NaiveDate>,
    pub assignee_ids: Vec<Uuid>,
}

impl NewTask {
    pub fn validate(&self) -> PortResult<()> {
        if self.title.trim().is_empty() {
            return Err(PortError::Invalid("Title must not be empty".to_string()));
        }
        validate_hours(self.hours)?;
        validate_money(self.money_for_task)?;
        validate_progress(self.progress)
    }
}

/// A partial update of a task. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub hours: Option<i32>,
    pub money_for_task: Option<i64>,
    pub progress: Option<u8>,
    pub task_type: Option<TaskType>,
    /// `Some(None)` clears the deadline.
    pub deadline: Option<Option<NaiveDate>>,
    pub feedback: Option<String>,
    /// Replaces the assignee set when present.
    pub assignee_ids: Option<Vec<Uuid>>,
}

impl TaskUpdate {
    pub fn validate(&self) -> PortResult<()> {
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err(PortError::Invalid("Title must not be empty".to_string()));
        }
        if let Some(hours) = self.hours {
            validate_hours(hours)?;
        }
        if let Some(money) = self.money_for_task {
            validate_money(money)?;
        }
        if let Some(progress) = self.progress {
            validate_progress(progress)?;
        }
        Ok(())
    }

    /// True when the update only touches fields a developer may change.
    pub fn is_developer_scoped(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.hours.is_none()
            && self.money_for_task.is_none()
            && self.task_type.is_none()
            && self.deadline.is_none()
            && self.assignee_ids.is_none()
    }
}

/// What an applied update changed, so callers know which follow-ups to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskChange {
    pub hours_changed: bool,
    pub paid_now: bool,
}

fn validate_hours(hours: i32) -> PortResult<()> {
    if hours <= 0 {
        return Err(PortError::Invalid("Hours must be greater than 0".to_string()));
    }
    Ok(())
}

fn validate_income(income: i64) -> PortResult<()> {
    if !(0..=MAX_MONEY).contains(&income) {
        return Err(PortError::Invalid(format!(
            "Overall income must be between 0 and {}",
            MAX_MONEY
        )));
    }
    Ok(())
}

fn validate_money(money: i64) -> PortResult<()> {
    if !(0..=MAX_MONEY).contains(&money) {
        return Err(PortError::Invalid(format!(
            "Money for task must be between 0 and {}",
            MAX_MONEY
        )));
    }
    Ok(())
}

fn validate_progress(progress: u8) -> PortResult<()> {
    if progress > 100 {
        return Err(PortError::Invalid(
            "Progress must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

/// A client's verdict on an admin-confirmed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDecision {
    Confirm,
    Reject,
}

impl Task {
    /// Builds a fresh task. `task_percentage` stays 0 until the job is renormalized.
    pub fn from_new(job_id: Uuid, new: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            title: new.title,
            description: new.description,
            hours: new.hours,
            task_percentage: 0.0,
            progress: new.progress,
            money_for_task: new.money_for_task,
            paid: false,
            task_type: new.task_type,
            start_date: now.date_naive(),
            deadline: new.deadline,
            feedback: None,
            confirmed: false,
            confirmed_at: None,
            confirmed_by: None,
            client_confirmed: false,
            client_confirmed_at: None,
            client_comment: None,
            assignee_ids: dedup_ids(new.assignee_ids),
            created_at: now,
        }
    }

    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.assignee_ids.contains(&user_id)
    }

    pub fn is_complete(&self) -> bool {
        self.progress == 100
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_complete() && matches!(self.deadline, Some(d) if d < today)
    }

    /// Applies a validated update and re-runs the payment check.
    ///
    /// A confirmed task cannot drop below 100% progress; the confirmation has
    /// to be withdrawn first so `paid` never outlives completed work.
    pub fn apply(&mut self, update: &TaskUpdate) -> PortResult<TaskChange> {
        if self.confirmed && matches!(update.progress, Some(p) if p < 100) {
            return Err(PortError::Invalid(
                "Confirmed tasks cannot be reopened; unconfirm the task first".to_string(),
            ));
        }
        let mut change = TaskChange::default();
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(hours) = update.hours {
            change.hours_changed = hours != self.hours;
            self.hours = hours;
        }
        if let Some(money) = update.money_for_task {
            self.money_for_task = money;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(task_type) = update.task_type {
            self.task_type = task_type;
        }
        if let Some(deadline) = update.deadline {
            self.deadline = deadline;
        }
        if let Some(feedback) = &update.feedback {
            self.feedback = Some(feedback.clone());
        }
        if let Some(ids) = &update.assignee_ids {
            self.assignee_ids = dedup_ids(ids.clone());
        }
        change.paid_now = self.settle_payment();
        Ok(change)
    }

    /// Payment is due once the work is complete and an administrator confirmed it.
    pub fn is_payable(&self) -> bool {
        self.is_complete() && self.confirmed && !self.paid
    }

    /// Marks the task paid when it is payable. Returns whether the flag flipped.
    pub fn settle_payment(&mut self) -> bool {
        if self.is_payable() {
            self.paid = true;
            true
        } else {
            false
        }
    }

    /// Administrator sign-off. Returns whether the task became paid.
    pub fn confirm(&mut self, admin_id: Uuid, at: DateTime<Utc>) -> PortResult<bool> {
        if !self.is_complete() {
            return Err(PortError::Invalid(
                "Only completed tasks can be confirmed".to_string(),
            ));
        }
        if !self.confirmed {
            self.confirmed = true;
            self.confirmed_at = Some(at);
            self.confirmed_by = Some(admin_id);
        }
        Ok(self.settle_payment())
    }

    /// Withdraws the administrator sign-off and reverses `paid`.
    /// Returns false when the task was not confirmed.
    pub fn unconfirm(&mut self) -> bool {
        if !self.confirmed {
            return false;
        }
        self.confirmed = false;
        self.confirmed_at = None;
        self.confirmed_by = None;
        self.paid = false;
        true
    }

    /// Second-stage sign-off by the client. Requires the administrator's confirmation.
    pub fn client_review(
        &mut self,
        decision: ClientDecision,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> PortResult<()> {
        if !self.confirmed {
            return Err(PortError::Invalid(
                "This task has not been confirmed by an administrator yet".to_string(),
            ));
        }
        match decision {
            ClientDecision::Confirm => {
                self.client_confirmed = true;
                self.client_confirmed_at = Some(at);
            }
            ClientDecision::Reject => {
                self.client_confirmed = false;
                self.client_confirmed_at = None;
            }
        }
        self.client_comment = comment;
        self.settle_payment();
        Ok(())
    }
}

fn dedup_ids(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    ids
}

//=========================================================================================
// Queries
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Completed,
    InProgress,
    Pending,
    Overdue,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::Completed => "completed",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Pending => "pending",
            ProgressStatus::Overdue => "overdue",
        }
    }
}

impl FromStr for ProgressStatus {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ProgressStatus::Completed),
            "in_progress" => Ok(ProgressStatus::InProgress),
            "pending" => Ok(ProgressStatus::Pending),
            "overdue" => Ok(ProgressStatus::Overdue),
            other => Err(PortError::Invalid(format!("Unknown status '{}'", other))),
        }
    }
}

/// Criteria for listing tasks across jobs.
#[derive(Debug, Clone)]
pub struct TaskFilter {
    pub job_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub status: Option<ProgressStatus>,
    pub deadline_from: Option<NaiveDate>,
    pub deadline_to: Option<NaiveDate>,
    pub today: NaiveDate,
}

impl TaskFilter {
    pub fn all(today: NaiveDate) -> Self {
        Self {
            job_id: None,
            assignee_id: None,
            status: None,
            deadline_from: None,
            deadline_to: None,
            today,
        }
    }

    pub fn for_job(job_id: Uuid, today: NaiveDate) -> Self {
        Self {
            job_id: Some(job_id),
            ..Self::all(today)
        }
    }

    pub fn for_assignee(user_id: Uuid, today: NaiveDate) -> Self {
        Self {
            assignee_id: Some(user_id),
            ..Self::all(today)
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if matches!(self.job_id, Some(id) if id != task.job_id) {
            return false;
        }
        if matches!(self.assignee_id, Some(id) if !task.is_assigned_to(id)) {
            return false;
        }
        let status_ok = match self.status {
            None => true,
            Some(ProgressStatus::Completed) => task.progress == 100,
            Some(ProgressStatus::InProgress) => task.progress > 0 && task.progress < 100,
            Some(ProgressStatus::Pending) => task.progress == 0,
            Some(ProgressStatus::Overdue) => task.is_overdue(self.today),
        };
        if !status_ok {
            return false;
        }
        if let Some(from) = self.deadline_from {
            if !matches!(task.deadline, Some(d) if d >= from) {
                return false;
            }
        }
        if let Some(to) = self.deadline_to {
            if !matches!(task.deadline, Some(d) if d <= to) {
                return false;
            }
        }
        true
    }
}

/// Orders tasks by deadline (undated last), then by creation time.
pub fn sort_by_deadline(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| match (a.deadline, b.deadline) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.created_at.cmp(&b.created_at)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.created_at.cmp(&b.created_at),
    });
}

//=========================================================================================
// Deductions
//=========================================================================================

/// Immutable audit record of an admin-initiated balance deduction.
#[derive(Debug, Clone, PartialEq)]
pub struct DeductionLog {
    pub id: Uuid,
    pub developer_id: Uuid,
    pub deducted_by: Uuid,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct DeductionFilter {
    pub developer_id: Option<Uuid>,
    /// (year, month)
    pub month: Option<(i32, u32)>,
}

impl DeductionFilter {
    pub fn matches(&self, log: &DeductionLog) -> bool {
        use chrono::Datelike;
        if matches!(self.developer_id, Some(id) if id != log.developer_id) {
            return false;
        }
        if let Some((year, month)) = self.month {
            let date = log.created_at.date_naive();
            if date.year() != year || date.month() != month {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn task(progress: u8) -> Task {
        Task::from_new(
            Uuid::new_v4(),
            NewTask {
                title: "Landing page".into(),
                description: "Build it".into(),
                hours: 10,
                money_for_task: 500,
                progress,
                task_type: TaskType::Simple,
                deadline: None,
                assignee_ids: vec![],
            },
            now(),
        )
    }

    #[test]
    fn completed_but_unconfirmed_task_is_not_paid() {
        let mut t = task(100);
        assert!(!t.settle_payment());
        assert!(!t.paid);

        let admin = Uuid::new_v4();
        assert!(t.confirm(admin, now()).unwrap());
        assert!(t.paid);
        assert_eq!(t.confirmed_by, Some(admin));
    }

    #[test]
    fn confirming_incomplete_task_is_rejected() {
        let mut t = task(90);
        let err = t.confirm(Uuid::new_v4(), now()).unwrap_err();
        assert!(matches!(err, PortError::Invalid(_)));
        assert!(!t.confirmed);
    }

    #[test]
    fn payment_check_is_idempotent() {
        let mut t = task(100);
        t.confirm(Uuid::new_v4(), now()).unwrap();
        assert!(!t.settle_payment());
        assert!(!t.confirm(Uuid::new_v4(), now()).unwrap());
        assert!(t.paid);
    }

    #[test]
    fn progress_update_on_confirmed_task_runs_payment_check() {
        let mut t = task(100);
        t.confirm(Uuid::new_v4(), now()).unwrap();
        t.paid = false;

        let change = t
            .apply(&TaskUpdate {
                progress: Some(100),
                ..Default::default()
            })
            .unwrap();
        assert!(change.paid_now);
        assert!(!change.hours_changed);
    }

    #[test]
    fn confirmed_task_cannot_be_reopened() {
        let mut t = task(100);
        t.confirm(Uuid::new_v4(), now()).unwrap();
        let err = t
            .apply(&TaskUpdate {
                progress: Some(60),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PortError::Invalid(_)));
        assert_eq!(t.progress, 100);
        assert!(t.paid);
    }

    #[test]
    fn unconfirm_reverses_paid() {
        let mut t = task(100);
        t.confirm(Uuid::new_v4(), now()).unwrap();
        assert!(t.unconfirm());
        assert!(!t.paid);
        assert!(!t.confirmed);
        assert!(t.confirmed_by.is_none());
        assert!(!t.unconfirm());
    }

    #[test]
    fn client_review_requires_admin_confirmation() {
        let mut t = task(100);
        assert!(t
            .client_review(ClientDecision::Confirm, None, now())
            .is_err());

        t.confirm(Uuid::new_v4(), now()).unwrap();
        t.client_review(ClientDecision::Confirm, Some("great".into()), now())
            .unwrap();
        assert!(t.client_confirmed);

        t.client_review(ClientDecision::Reject, Some("redo footer".into()), now())
            .unwrap();
        assert!(!t.client_confirmed);
        assert_eq!(t.client_comment.as_deref(), Some("redo footer"));
    }

    #[test]
    fn update_reports_hours_change_only_when_different() {
        let mut t = task(0);
        let same = t
            .apply(&TaskUpdate {
                hours: Some(10),
                ..Default::default()
            })
            .unwrap();
        assert!(!same.hours_changed);
        let changed = t
            .apply(&TaskUpdate {
                hours: Some(12),
                ..Default::default()
            })
            .unwrap();
        assert!(changed.hours_changed);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad = TaskUpdate {
            hours: Some(0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = TaskUpdate {
            progress: Some(101),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = TaskUpdate {
            money_for_task: Some(-1),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn task_type_parses_case_insensitively() {
        assert_eq!("MONTHLY".parse::<TaskType>().unwrap(), TaskType::Monthly);
        assert!("weekly".parse::<TaskType>().is_err());
    }

    #[test]
    fn toggle_switches_between_simple_and_monthly() {
        assert_eq!(TaskType::Simple.toggled(), TaskType::Monthly);
        assert_eq!(TaskType::Monthly.toggled(), TaskType::Simple);
        assert_eq!(TaskType::Recurring.toggled(), TaskType::Simple);
    }

    #[test]
    fn filter_by_status_and_window() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut t = task(40);
        t.deadline = NaiveDate::from_ymd_opt(2025, 3, 1);

        let mut filter = TaskFilter::all(today);
        filter.status = Some(ProgressStatus::Overdue);
        assert!(filter.matches(&t));

        filter.status = Some(ProgressStatus::InProgress);
        filter.deadline_from = NaiveDate::from_ymd_opt(2025, 3, 5);
        assert!(!filter.matches(&t));
    }

    #[test]
    fn money_above_the_ceiling_is_rejected() {
        let too_much = TaskUpdate {
            money_for_task: Some(MAX_MONEY + 1),
            ..Default::default()
        };
        assert!(matches!(too_much.validate(), Err(PortError::Invalid(_))));
        let at_ceiling = TaskUpdate {
            money_for_task: Some(MAX_MONEY),
            ..Default::default()
        };
        assert!(at_ceiling.validate().is_ok());

        let income = JobUpdate {
            over_all_income: Some(i64::MAX),
            ..Default::default()
        };
        assert!(matches!(income.validate(), Err(PortError::Invalid(_))));
        let new_job = NewJob {
            title: "Website".into(),
            client_email: "client@example.com".into(),
            client_password_hash: String::new(),
            over_all_income: MAX_MONEY + 1,
            contact: ClientContact::default(),
        };
        assert!(new_job.validate().is_err());
    }

    #[test]
    fn money_helpers_clamp_to_i64() {
        assert_eq!(money_total([i64::MAX, 1]), i64::MAX);
        assert_eq!(money_total([3, 4]), 7);
        assert_eq!(money_diff(i64::MIN, 1), i64::MIN);
        assert_eq!(money_diff(10, 4), 6);
    }
}
