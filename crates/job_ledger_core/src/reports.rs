//! crates/job_ledger_core/src/reports.rs
//!
//! Read-only projections computed from loaded jobs and tasks: job summaries,
//! per-job statistics, dashboard figures, charts, the calendar and the
//! confirmation queues. Nothing here writes.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::domain::{money_diff, money_total, sort_by_deadline, Job, ProgressStatus, Task, TaskType};
use crate::payment::developer_balance;

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Progress of a job as the percentage-weighted mean of its tasks' progress.
pub fn overall_progress(tasks: &[Task]) -> u8 {
    let weight: f64 = tasks.iter().map(|t| t.task_percentage).sum();
    if weight <= 0.0 {
        return 0;
    }
    let weighted: f64 = tasks
        .iter()
        .map(|t| f64::from(t.progress) * t.task_percentage)
        .sum();
    (weighted / weight).round().clamp(0.0, 100.0) as u8
}

fn in_month(at: DateTime<Utc>, year: i32, month: u32) -> bool {
    at.year() == year && at.month() == month
}

fn tasks_by_job(tasks: &[Task]) -> HashMap<Uuid, Vec<&Task>> {
    let mut grouped: HashMap<Uuid, Vec<&Task>> = HashMap::new();
    for task in tasks {
        grouped.entry(task.job_id).or_default().push(task);
    }
    grouped
}

//=========================================================================================
// Job projections
//=========================================================================================

/// A job together with figures derived from its tasks.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub job: Job,
    pub overall_progress: u8,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
    /// Contracted income minus the money allocated to tasks.
    pub remaining_income: i64,
}

impl JobSummary {
    /// `tasks` must be the tasks of `job`.
    pub fn build(job: Job, tasks: &[Task], today: NaiveDate) -> Self {
        let allocated = money_total(tasks.iter().map(|t| t.money_for_task));
        Self {
            overall_progress: overall_progress(tasks),
            total_tasks: tasks.len(),
            completed_tasks: tasks.iter().filter(|t| t.is_complete()).count(),
            overdue_tasks: tasks.iter().filter(|t| t.is_overdue(today)).count(),
            remaining_income: money_diff(job.over_all_income, allocated),
            job,
        }
    }
}

/// Summaries for many jobs, keeping the order of `jobs`.
pub fn summarize_jobs(jobs: Vec<Job>, tasks: &[Task], today: NaiveDate) -> Vec<JobSummary> {
    let grouped = tasks_by_job(tasks);
    jobs.into_iter()
        .map(|job| {
            let own: Vec<Task> = grouped
                .get(&job.id)
                .map(|ts| ts.iter().map(|t| (*t).clone()).collect())
                .unwrap_or_default();
            JobSummary::build(job, &own, today)
        })
        .collect()
}

/// Whether a job falls in the given project status.
///
/// A job is completed when it has tasks and all of them are at 100%, in
/// progress when any task is partially done, overdue when any unfinished task
/// is past its deadline, and pending when no task has started.
pub fn job_has_status(tasks: &[&Task], status: ProgressStatus, today: NaiveDate) -> bool {
    match status {
        ProgressStatus::Completed => !tasks.is_empty() && tasks.iter().all(|t| t.is_complete()),
        ProgressStatus::InProgress => tasks.iter().any(|t| t.progress > 0 && t.progress < 100),
        ProgressStatus::Overdue => tasks.iter().any(|t| t.is_overdue(today)),
        ProgressStatus::Pending => tasks.iter().all(|t| t.progress == 0),
    }
}

/// Keeps the jobs whose tasks put them in `status`.
pub fn filter_jobs_by_status(
    jobs: Vec<Job>,
    tasks: &[Task],
    status: ProgressStatus,
    today: NaiveDate,
) -> Vec<Job> {
    let grouped = tasks_by_job(tasks);
    jobs.into_iter()
        .filter(|job| {
            let own = grouped.get(&job.id).map(Vec::as_slice).unwrap_or(&[]);
            job_has_status(own, status, today)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeCounts {
    pub simple: usize,
    pub recurring: usize,
    pub monthly: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationCounts {
    pub confirmed: usize,
    pub paid: usize,
    pub unconfirmed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinancialSummary {
    pub total_task_money: i64,
    pub paid_money: i64,
    pub unpaid_money: i64,
    pub remaining_job_budget: i64,
}

/// Per-job breakdown of task counts, confirmations and money.
#[derive(Debug, Clone)]
pub struct JobStatistics {
    pub job_id: Uuid,
    pub title: String,
    pub overall_progress: u8,
    pub total_income: i64,
    pub total_tasks: usize,
    pub by_type: TypeCounts,
    pub progress: ProgressCounts,
    pub confirmation: ConfirmationCounts,
    pub finances: FinancialSummary,
    pub total_hours: i64,
}

impl JobStatistics {
    pub fn build(job: &Job, tasks: &[Task]) -> Self {
        let mut by_type = TypeCounts::default();
        let mut progress = ProgressCounts::default();
        let mut confirmation = ConfirmationCounts::default();
        let mut finances = FinancialSummary::default();
        let mut total_hours = 0i64;

        for task in tasks {
            match task.task_type {
                TaskType::Simple => by_type.simple += 1,
                TaskType::Recurring => by_type.recurring += 1,
                TaskType::Monthly => by_type.monthly += 1,
            }
            match task.progress {
                100 => progress.completed += 1,
                0 => progress.pending += 1,
                _ => progress.in_progress += 1,
            }
            if task.confirmed {
                confirmation.confirmed += 1;
            } else {
                confirmation.unconfirmed += 1;
            }
            finances.total_task_money =
                money_total([finances.total_task_money, task.money_for_task]);
            if task.paid {
                confirmation.paid += 1;
                finances.paid_money = money_total([finances.paid_money, task.money_for_task]);
            }
            total_hours += i64::from(task.hours);
        }
        finances.unpaid_money = money_diff(finances.total_task_money, finances.paid_money);
        finances.remaining_job_budget = money_diff(job.over_all_income, finances.total_task_money);

        Self {
            job_id: job.id,
            title: job.title.clone(),
            overall_progress: overall_progress(tasks),
            total_income: job.over_all_income,
            total_tasks: tasks.len(),
            by_type,
            progress,
            confirmation,
            finances,
            total_hours,
        }
    }
}

//=========================================================================================
// Dashboard
//=========================================================================================

/// Company-wide income against money allocated to tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomeBalance {
    pub total_task_money: i64,
    pub total_job_income: i64,
    pub income_balance: i64,
}

impl IncomeBalance {
    pub fn build(jobs: &[Job], tasks: &[Task]) -> Self {
        let total_task_money = money_total(tasks.iter().map(|t| t.money_for_task));
        let total_job_income = money_total(jobs.iter().map(|j| j.over_all_income));
        Self {
            total_task_money,
            total_job_income,
            income_balance: money_diff(total_job_income, total_task_money),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_projects: usize,
    pub in_progress_projects: usize,
    pub completed_projects: usize,
    pub overdue_projects: usize,
    pub total_revenue: i64,
    pub total_users: usize,
    pub paid_tasks: usize,
    pub total_tasks: usize,
    /// Income of jobs created in the current month.
    pub monthly_income: i64,
    pub income_balance: i64,
}

impl DashboardStats {
    pub fn build(jobs: &[Job], tasks: &[Task], total_users: usize, today: NaiveDate) -> Self {
        let grouped = tasks_by_job(tasks);
        let count_with = |status| {
            jobs.iter()
                .filter(|job| {
                    let own = grouped.get(&job.id).map(Vec::as_slice).unwrap_or(&[]);
                    job_has_status(own, status, today)
                })
                .count()
        };
        let monthly_income = money_total(
            jobs.iter()
                .filter(|j| in_month(j.created_at, today.year(), today.month()))
                .map(|j| j.over_all_income),
        );

        Self {
            total_projects: jobs.len(),
            in_progress_projects: count_with(ProgressStatus::InProgress),
            completed_projects: count_with(ProgressStatus::Completed),
            overdue_projects: count_with(ProgressStatus::Overdue),
            total_revenue: money_total(jobs.iter().map(|j| j.over_all_income)),
            total_users,
            paid_tasks: tasks.iter().filter(|t| t.paid).count(),
            total_tasks: tasks.len(),
            monthly_income,
            income_balance: IncomeBalance::build(jobs, tasks).income_balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRevenue {
    pub month: &'static str,
    pub income: i64,
    pub expenses: i64,
    pub profit: i64,
}

/// Income of jobs created in each month of `year`, against the money already
/// paid out on those jobs' tasks.
pub fn monthly_revenue(jobs: &[Job], tasks: &[Task], year: i32) -> Vec<MonthRevenue> {
    let grouped = tasks_by_job(tasks);
    (1..=12u32)
        .map(|month| {
            let month_jobs: Vec<&Job> = jobs
                .iter()
                .filter(|j| in_month(j.created_at, year, month))
                .collect();
            let income = money_total(month_jobs.iter().map(|j| j.over_all_income));
            let expenses = money_total(
                month_jobs
                    .iter()
                    .filter_map(|j| grouped.get(&j.id))
                    .flatten()
                    .filter(|t| t.paid)
                    .map(|t| t.money_for_task),
            );
            MonthRevenue {
                month: MONTH_ABBR[(month - 1) as usize],
                income,
                expenses,
                profit: money_diff(income, expenses),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusShare {
    pub status: ProgressStatus,
    pub count: usize,
    /// Share of all projects, rounded to two decimals.
    pub percentage: f64,
}

pub fn project_distribution(jobs: &[Job], tasks: &[Task], today: NaiveDate) -> Vec<StatusShare> {
    let stats = DashboardStats::build(jobs, tasks, 0, today);
    let share = |count: usize| {
        if stats.total_projects == 0 {
            0.0
        } else {
            (count as f64 * 10_000.0 / stats.total_projects as f64).round() / 100.0
        }
    };
    [
        (ProgressStatus::InProgress, stats.in_progress_projects),
        (ProgressStatus::Completed, stats.completed_projects),
        (ProgressStatus::Overdue, stats.overdue_projects),
    ]
    .into_iter()
    .map(|(status, count)| StatusShare {
        status,
        count,
        percentage: share(count),
    })
    .collect()
}

/// Unfinished tasks due today or later, soonest first.
pub fn upcoming_deadlines(tasks: &[Task], today: NaiveDate, limit: usize) -> Vec<Task> {
    let mut upcoming: Vec<Task> = tasks
        .iter()
        .filter(|t| !t.is_complete() && matches!(t.deadline, Some(d) if d >= today))
        .cloned()
        .collect();
    sort_by_deadline(&mut upcoming);
    upcoming.truncate(limit);
    upcoming
}

/// Unfinished tasks past their deadline, longest overdue first.
pub fn overdue(tasks: &[Task], today: NaiveDate) -> Vec<Task> {
    let mut late: Vec<Task> = tasks
        .iter()
        .filter(|t| t.is_overdue(today))
        .cloned()
        .collect();
    sort_by_deadline(&mut late);
    late
}

/// Tasks due in the given month, grouped by deadline date.
pub fn calendar(tasks: &[Task], year: i32, month: u32) -> BTreeMap<NaiveDate, Vec<Task>> {
    let mut days: BTreeMap<NaiveDate, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        if let Some(deadline) = task.deadline {
            if deadline.year() == year && deadline.month() == month {
                days.entry(deadline).or_default().push(task.clone());
            }
        }
    }
    days
}

//=========================================================================================
// Developer and confirmation views
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeveloperOverview {
    pub developer_id: Uuid,
    pub balance: i64,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub pending_tasks: usize,
    pub overdue_tasks: usize,
}

impl DeveloperOverview {
    /// `tasks` are the tasks assigned to the developer.
    pub fn build(developer_id: Uuid, tasks: &[Task], today: NaiveDate) -> Self {
        Self {
            developer_id,
            balance: developer_balance(tasks, developer_id),
            total_tasks: tasks.len(),
            completed_tasks: tasks.iter().filter(|t| t.progress == 100).count(),
            in_progress_tasks: tasks
                .iter()
                .filter(|t| t.progress > 0 && t.progress < 100)
                .count(),
            pending_tasks: tasks.iter().filter(|t| t.progress == 0).count(),
            overdue_tasks: tasks.iter().filter(|t| t.is_overdue(today)).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfirmationRow {
    pub job_id: Uuid,
    pub job_title: String,
    pub pending: usize,
    pub confirmed: usize,
    pub payment_total: i64,
}

/// Completed tasks split by administrator confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationQueue {
    pub pending_count: usize,
    pub confirmed_count: usize,
    pub payment_total: i64,
    /// Jobs with the most pending confirmations first.
    pub by_job: Vec<JobConfirmationRow>,
}

impl ConfirmationQueue {
    pub fn build(tasks: &[Task], job_titles: &HashMap<Uuid, String>) -> Self {
        let completed: Vec<&Task> = tasks.iter().filter(|t| t.is_complete()).collect();
        let mut rows: BTreeMap<Uuid, JobConfirmationRow> = BTreeMap::new();
        for task in &completed {
            let row = rows.entry(task.job_id).or_insert_with(|| JobConfirmationRow {
                job_id: task.job_id,
                job_title: job_titles.get(&task.job_id).cloned().unwrap_or_default(),
                pending: 0,
                confirmed: 0,
                payment_total: 0,
            });
            if task.confirmed {
                row.confirmed += 1;
            } else {
                row.pending += 1;
            }
            row.payment_total = money_total([row.payment_total, task.money_for_task]);
        }
        let mut by_job: Vec<JobConfirmationRow> = rows.into_values().collect();
        by_job.sort_by(|a, b| b.pending.cmp(&a.pending));

        Self {
            pending_count: completed.iter().filter(|t| !t.confirmed).count(),
            confirmed_count: completed.iter().filter(|t| t.confirmed).count(),
            payment_total: money_total(completed.iter().map(|t| t.money_for_task)),
            by_job,
        }
    }
}

/// Completed tasks with the given confirmation state, latest deadline first.
pub fn completed_with_confirmation(tasks: &[Task], confirmed: bool) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks
        .iter()
        .filter(|t| t.is_complete() && t.confirmed == confirmed)
        .cloned()
        .collect();
    sort_by_deadline(&mut selected);
    selected.reverse();
    selected
}

/// Which of a job's tasks a client sees on the confirmation page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientTaskView {
    /// Confirmed by an administrator, awaiting the client.
    Pending,
    /// Confirmed by both.
    Confirmed,
    /// Every completed task.
    All,
}

impl ClientTaskView {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            ClientTaskView::Pending => task.confirmed && !task.client_confirmed,
            ClientTaskView::Confirmed => task.confirmed && task.client_confirmed,
            ClientTaskView::All => task.is_complete(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOverview {
    pub pending_count: usize,
    pub confirmed_count: usize,
    pub completed_count: usize,
}

impl ClientOverview {
    pub fn build(tasks: &[Task]) -> Self {
        Self {
            pending_count: tasks.iter().filter(|t| ClientTaskView::Pending.matches(t)).count(),
            confirmed_count: tasks.iter().filter(|t| t.client_confirmed).count(),
            completed_count: tasks.iter().filter(|t| t.is_complete()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::renormalize;
    use crate::domain::{ClientContact, NewTask};
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn job(income: i64, created: DateTime<Utc>) -> Job {
        Job {
            id: Uuid::new_v4(),
            title: "Website".into(),
            client_email: format!("{}@client.test", Uuid::new_v4()),
            over_all_income: income,
            contact: ClientContact::default(),
            created_at: created,
        }
    }

    fn task(job: &Job, hours: i32, progress: u8, money: i64, deadline: Option<NaiveDate>) -> Task {
        Task::from_new(
            job.id,
            NewTask {
                title: "t".into(),
                description: String::new(),
                hours,
                money_for_task: money,
                progress,
                task_type: TaskType::Simple,
                deadline,
                assignee_ids: vec![],
            },
            job.created_at,
        )
    }

    #[test]
    fn overall_progress_is_weighted_by_hours() {
        let j = job(1000, Utc::now());
        let mut tasks = vec![task(&j, 30, 100, 0, None), task(&j, 70, 0, 0, None)];
        renormalize(&mut tasks);
        assert_eq!(overall_progress(&tasks), 30);
        assert_eq!(overall_progress(&[]), 0);
    }

    #[test]
    fn summary_counts_and_remaining_income() {
        let today = date(2025, 6, 15);
        let j = job(1000, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        let tasks = vec![
            task(&j, 10, 100, 300, None),
            task(&j, 10, 20, 200, Some(date(2025, 6, 1))),
        ];
        let summary = JobSummary::build(j, &tasks, today);
        assert_eq!(summary.total_tasks, 2);
        assert_eq!(summary.completed_tasks, 1);
        assert_eq!(summary.overdue_tasks, 1);
        assert_eq!(summary.remaining_income, 500);
    }

    #[test]
    fn job_statistics_split_money_by_payment() {
        let j = job(2000, Utc::now());
        let mut paid = task(&j, 5, 100, 400, None);
        paid.confirmed = true;
        paid.paid = true;
        let open = task(&j, 5, 50, 100, None);
        let stats = JobStatistics::build(&j, &[paid, open]);
        assert_eq!(stats.finances.total_task_money, 500);
        assert_eq!(stats.finances.paid_money, 400);
        assert_eq!(stats.finances.unpaid_money, 100);
        assert_eq!(stats.finances.remaining_job_budget, 1500);
        assert_eq!(stats.confirmation.paid, 1);
        assert_eq!(stats.progress.in_progress, 1);
        assert_eq!(stats.total_hours, 10);
    }

    #[test]
    fn dashboard_classifies_projects() {
        let today = date(2025, 6, 15);
        let created = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let done = job(100, created);
        let late = job(200, Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap());
        let tasks = vec![
            task(&done, 1, 100, 10, None),
            task(&late, 1, 50, 20, Some(date(2025, 6, 1))),
        ];
        let stats = DashboardStats::build(&[done, late], &tasks, 3, today);
        assert_eq!(stats.total_projects, 2);
        assert_eq!(stats.completed_projects, 1);
        assert_eq!(stats.in_progress_projects, 1);
        assert_eq!(stats.overdue_projects, 1);
        assert_eq!(stats.total_revenue, 300);
        assert_eq!(stats.monthly_income, 100);
        assert_eq!(stats.income_balance, 270);
    }

    #[test]
    fn revenue_chart_charges_paid_tasks_to_job_month() {
        let j = job(1000, Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap());
        let mut t = task(&j, 1, 100, 250, None);
        t.paid = true;
        let rows = monthly_revenue(&[j], &[t], 2025);
        assert_eq!(rows.len(), 12);
        assert_eq!(
            rows[2],
            MonthRevenue {
                month: "Mar",
                income: 1000,
                expenses: 250,
                profit: 750
            }
        );
        assert_eq!(rows[0].income, 0);
    }

    #[test]
    fn calendar_groups_by_deadline_within_month() {
        let j = job(0, Utc::now());
        let tasks = vec![
            task(&j, 1, 0, 0, Some(date(2025, 7, 3))),
            task(&j, 1, 0, 0, Some(date(2025, 7, 3))),
            task(&j, 1, 0, 0, Some(date(2025, 8, 1))),
            task(&j, 1, 0, 0, None),
        ];
        let days = calendar(&tasks, 2025, 7);
        assert_eq!(days.len(), 1);
        assert_eq!(days[&date(2025, 7, 3)].len(), 2);
    }

    #[test]
    fn upcoming_and_overdue_split_on_today() {
        let today = date(2025, 6, 15);
        let j = job(0, Utc::now());
        let tasks = vec![
            task(&j, 1, 0, 0, Some(date(2025, 6, 20))),
            task(&j, 1, 0, 0, Some(date(2025, 6, 15))),
            task(&j, 1, 40, 0, Some(date(2025, 6, 1))),
            task(&j, 1, 100, 0, Some(date(2025, 6, 2))),
        ];
        let upcoming = upcoming_deadlines(&tasks, today, 5);
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].deadline, Some(today));
        let late = overdue(&tasks, today);
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].progress, 40);
    }

    #[test]
    fn confirmation_queue_counts_completed_only() {
        let j = job(0, Utc::now());
        let mut confirmed = task(&j, 1, 100, 40, None);
        confirmed.confirmed = true;
        let tasks = vec![confirmed, task(&j, 1, 100, 60, None), task(&j, 1, 10, 99, None)];
        let titles = HashMap::from([(j.id, j.title.clone())]);
        let queue = ConfirmationQueue::build(&tasks, &titles);
        assert_eq!(queue.pending_count, 1);
        assert_eq!(queue.confirmed_count, 1);
        assert_eq!(queue.payment_total, 100);
        assert_eq!(queue.by_job[0].job_title, "Website");
    }

    #[test]
    fn money_totals_clamp_instead_of_overflowing() {
        let now = Utc::now();
        let jobs = [job(i64::MAX, now), job(1, now)];
        let balance = IncomeBalance::build(&jobs, &[]);
        assert_eq!(balance.total_job_income, i64::MAX);
        assert_eq!(balance.income_balance, i64::MAX);

        let stats = DashboardStats::build(&jobs, &[], 0, now.date_naive());
        assert_eq!(stats.total_revenue, i64::MAX);
        assert_eq!(stats.monthly_income, i64::MAX);

        let j = job(0, now);
        let tasks = [task(&j, 1, 0, i64::MAX, None), task(&j, 1, 0, i64::MAX, None)];
        let summary = JobSummary::build(j.clone(), &tasks, now.date_naive());
        assert_eq!(summary.remaining_income, -i64::MAX);
        let stats = JobStatistics::build(&j, &tasks);
        assert_eq!(stats.finances.total_task_money, i64::MAX);
        assert_eq!(stats.finances.remaining_job_budget, -i64::MAX);
    }
}
